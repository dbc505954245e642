//! Reads the category × fuel data table out of a rendered page.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::html::{element_text, id_selector, selector};
use crate::types::{CategoryCount, ScrapeError, ScrapeResult};

/// Where the data lives in the rendered table.
///
/// The dashboard renders a `tbody` with one row per vehicle category: a
/// serial number, the category name, then one column per fuel type. The
/// electric (BOV) column sits at index 9, with further fuels and a total
/// after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    /// `id` of the `tbody` holding the data rows.
    pub table_body_id: String,
    /// Exact number of cells every data row must have. When unset, the
    /// width is read from the table's header cells.
    pub column_count: Option<usize>,
    /// Index of the vehicle category cell.
    pub category_column: usize,
    /// Index of the electric vehicle count cell.
    pub count_column: usize,
    /// Text of the single cell rendered when there is no data.
    pub empty_sentinel: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table_body_id: "groupingTable_data".to_string(),
            column_count: None,
            category_column: 1,
            count_column: 9,
            empty_sentinel: "No records found.".to_string(),
        }
    }
}

impl TableLayout {
    pub fn validate(&self) -> ScrapeResult<()> {
        if self.table_body_id.trim().is_empty() {
            return Err(ScrapeError::Config("layout.table_body_id is empty".into()));
        }
        let Some(count) = self.column_count else {
            return Ok(());
        };
        if count == 0 {
            return Err(ScrapeError::Config("layout.column_count must be positive".into()));
        }
        for (name, ix) in [
            ("category_column", self.category_column),
            ("count_column", self.count_column),
        ] {
            if ix >= count {
                return Err(ScrapeError::Config(format!(
                    "layout.{name} = {ix} is outside {count} columns"
                )));
            }
        }
        Ok(())
    }

    /// Fewest cells a row can have and still reach both data columns.
    fn min_width(&self) -> usize {
        self.category_column.max(self.count_column) + 1
    }

    fn is_sentinel(&self, text: &str) -> bool {
        fn norm(s: &str) -> String {
            s.trim().trim_end_matches('.').trim().to_lowercase()
        }
        norm(text) == norm(&self.empty_sentinel)
    }
}

/// How wide a data row must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowWidth {
    Exact(usize),
    AtLeast(usize),
}

impl RowWidth {
    fn accepts(self, cells: usize) -> bool {
        match self {
            RowWidth::Exact(n) => cells == n,
            RowWidth::AtLeast(n) => cells >= n,
        }
    }
}

impl std::fmt::Display for RowWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowWidth::Exact(n) => write!(f, "{n}"),
            RowWidth::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Column count declared by the header of the table around `body`.
///
/// Grouped headers span several rows, so this is the widest header row,
/// counting `colspan`.
fn header_width(body: &ElementRef<'_>) -> ScrapeResult<Option<usize>> {
    let Some(table) = body
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
    else {
        return Ok(None);
    };

    let row_sel = selector("thead tr")?;
    let th_sel = selector("th")?;
    let width = table
        .select(&row_sel)
        .map(|row| {
            row.select(&th_sel)
                .map(|th| {
                    th.value()
                        .attr("colspan")
                        .and_then(|c| c.trim().parse::<usize>().ok())
                        .unwrap_or(1)
                })
                .sum::<usize>()
        })
        .max()
        .filter(|w| *w > 0);
    Ok(width)
}

/// Extract the category counts from a page holding a rendered data table.
///
/// A table whose only row is the "no records" sentinel is a valid empty
/// result. Any other row must match the expected width: `layout.column_count`
/// if set, else the width the table header declares, else just wide enough
/// to hold the category and count cells. The whole table is rejected on the
/// first bad row, so a malformed response never contributes partial output.
pub fn extract_counts(html: &str, layout: &TableLayout) -> ScrapeResult<Vec<CategoryCount>> {
    layout.validate()?;

    let document = Html::parse_document(html);
    let body_sel = id_selector("tbody", &layout.table_body_id)?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let body = document.select(&body_sel).next().ok_or_else(|| {
        ScrapeError::TableFormat(format!("no table body with id {}", layout.table_body_id))
    })?;

    let rows: Vec<Vec<String>> = body
        .select(&row_sel)
        .map(|row| row.select(&cell_sel).map(|c| element_text(&c)).collect())
        .collect();

    if let [only] = rows.as_slice() {
        if only.len() == 1 {
            return if layout.is_sentinel(&only[0]) {
                Ok(Vec::new())
            } else {
                Err(ScrapeError::TableFormat(format!(
                    "single-cell row is not the empty sentinel: {:?}",
                    only[0]
                )))
            };
        }
    }

    let width = match layout.column_count {
        Some(n) => RowWidth::Exact(n),
        None => match header_width(&body)? {
            Some(n) if n >= layout.min_width() => RowWidth::Exact(n),
            Some(n) => {
                return Err(ScrapeError::TableFormat(format!(
                    "header declares {n} columns, too few for count column {}",
                    layout.count_column
                )))
            }
            None => RowWidth::AtLeast(layout.min_width()),
        },
    };

    rows.iter()
        .enumerate()
        .map(|(ix, cells)| parse_row(ix, cells, width, layout))
        .collect()
}

fn parse_row(
    ix: usize,
    cells: &[String],
    width: RowWidth,
    layout: &TableLayout,
) -> ScrapeResult<CategoryCount> {
    if !width.accepts(cells.len()) {
        return Err(ScrapeError::TableFormat(format!(
            "row {ix} has {} cells, expected {width}",
            cells.len()
        )));
    }

    let cell = |col: usize| {
        cells.get(col).ok_or_else(|| {
            ScrapeError::TableFormat(format!("row {ix} has no cell {col}"))
        })
    };

    let category = cell(layout.category_column)?.clone();
    if category.is_empty() {
        return Err(ScrapeError::TableFormat(format!("row {ix} has an empty category")));
    }

    let raw = cell(layout.count_column)?;
    let electric_vehicle_count = parse_count(raw).ok_or_else(|| {
        ScrapeError::TableFormat(format!("row {ix} count {raw:?} is not a number"))
    })?;

    Ok(CategoryCount {
        category,
        electric_vehicle_count,
    })
}

/// Parse `1,234`-style counts.
fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
