//! The region / sub-region catalog: label parsing, CSV I/O, and the crawl
//! that enumerates it from the dashboard's dropdowns.
//!
//! Sub-region dropdown labels look like `"North RTO - DL05(Delhi North)"`:
//! a name, then a two-letter state code glued to the sub-region code, then
//! free text in parentheses. Names may themselves contain `" - "`, so only
//! the last segment is treated as the code block.

use std::io::{Read, Write};
use std::path::Path;

use scraper::Html;

use crate::csv::{parse_rows, write_row};
use crate::html::{element_text, id_selector, selector};
use crate::payload::{PayloadKind, Selection};
use crate::sequencer::SessionState;
use crate::transport::Transport;
use crate::types::{RegionEntry, ScrapeError, ScrapeResult};

/// Catalog CSV column names, in order.
pub const CATALOG_HEADER: [&str; 4] = ["region", "sub_region", "region_code", "sub_region_code"];

/// Header written by the browser-driven catalog builder; also accepted on read.
pub const STATE_RTO_HEADER: [&str; 4] = ["State", "RTO", "State Code", "RTO Code"];

/// `id` of the region dropdown's backing `select`.
pub const REGION_SELECT_ID: &str = "j_idt33_input";
/// `id` of the sub-region dropdown's backing `select`.
pub const SUB_REGION_SELECT_ID: &str = "selectedRto_input";

const LABEL_DELIMITER: &str = " - ";

/// A parsed sub-region dropdown label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRegionLabel {
    pub name: String,
    pub state_code: String,
    pub sub_region_code: String,
}

/// Parse `"<name> - <state-code><sub-region-code>(<free text>)"`.
pub fn parse_sub_region_label(label: &str) -> ScrapeResult<SubRegionLabel> {
    let (name, code_block) = label
        .rsplit_once(LABEL_DELIMITER)
        .ok_or_else(|| ScrapeError::CatalogFormat(format!("no \" - \" in label {label:?}")))?;

    let paren = code_block
        .find('(')
        .ok_or_else(|| ScrapeError::CatalogFormat(format!("no '(' after codes in label {label:?}")))?;
    let codes = code_block[..paren].trim();

    if codes.len() < 3 || !codes.is_char_boundary(2) {
        return Err(ScrapeError::CatalogFormat(format!(
            "code block {codes:?} is too short in label {label:?}"
        )));
    }
    let (state_code, sub_region_code) = codes.split_at(2);

    let name = name.trim();
    if name.is_empty() {
        return Err(ScrapeError::CatalogFormat(format!("empty name in label {label:?}")));
    }

    Ok(SubRegionLabel {
        name: name.to_string(),
        state_code: state_code.to_string(),
        sub_region_code: sub_region_code.trim().to_string(),
    })
}

/// Region name from a region dropdown label such as `"Delhi(16)"`.
pub fn parse_region_label(label: &str) -> ScrapeResult<String> {
    let name = match label.find('(') {
        Some(ix) => &label[..ix],
        None => label,
    }
    .trim();

    if name.is_empty() {
        return Err(ScrapeError::CatalogFormat(format!("empty region label {label:?}")));
    }
    Ok(name.to_string())
}

/// Read a catalog CSV. The first row must be one of the known headers.
pub fn read_catalog<R: Read>(mut reader: R) -> ScrapeResult<Vec<RegionEntry>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut rows = parse_rows(&text).into_iter().enumerate();
    match rows.next() {
        None => return Ok(Vec::new()),
        Some((_, header)) if is_catalog_header(&header) => {}
        Some((_, header)) => {
            return Err(ScrapeError::CatalogFormat(format!(
                "catalog line 1 is not a header: {header:?}"
            )))
        }
    }

    rows.map(|(line, row)| catalog_entry(line + 1, row)).collect()
}

fn is_catalog_header(row: &[String]) -> bool {
    [CATALOG_HEADER, STATE_RTO_HEADER].iter().any(|header| {
        row.len() == header.len()
            && row
                .iter()
                .zip(header)
                .all(|(cell, name)| cell.trim().eq_ignore_ascii_case(name))
    })
}

pub fn read_catalog_file(path: &Path) -> ScrapeResult<Vec<RegionEntry>> {
    let file = std::fs::File::open(path)?;
    read_catalog(file)
}

fn catalog_entry(line: usize, row: Vec<String>) -> ScrapeResult<RegionEntry> {
    let [region, sub_region, region_code, sub_region_code]: [String; 4] =
        row.try_into().map_err(|row: Vec<String>| {
            ScrapeError::CatalogFormat(format!("catalog line {line} has {} columns, expected 4", row.len()))
        })?;

    let entry = RegionEntry::new(
        region.trim(),
        sub_region.trim(),
        region_code.trim(),
        sub_region_code.trim(),
    );
    if entry.region_code.is_empty() || entry.sub_region_code.is_empty() {
        return Err(ScrapeError::CatalogFormat(format!("catalog line {line} has an empty code")));
    }
    Ok(entry)
}

/// Write a catalog CSV with its header.
pub fn write_catalog<W: Write>(mut writer: W, entries: &[RegionEntry]) -> ScrapeResult<()> {
    write_row(&mut writer, &CATALOG_HEADER)?;
    for e in entries {
        write_row(
            &mut writer,
            &[&e.region_name, &e.sub_region_name, &e.region_code, &e.sub_region_code],
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// An `<option>` of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

/// Options of the `select` with the given id, skipping the leading "all" entry.
pub fn dropdown_options(html: &str, select_id: &str) -> ScrapeResult<Vec<DropdownOption>> {
    let document = Html::parse_document(html);
    let select_sel = id_selector("select", select_id)?;
    let option_sel = selector("option")?;

    let select = document
        .select(&select_sel)
        .next()
        .ok_or_else(|| ScrapeError::CatalogFormat(format!("no dropdown with id {select_id}")))?;

    Ok(select
        .select(&option_sel)
        .skip(1)
        .map(|opt| DropdownOption {
            value: opt.value().attr("value").unwrap_or_default().trim().to_string(),
            label: element_text(&opt),
        })
        .collect())
}

/// Enumerates the catalog from the live dashboard.
///
/// For each region the crawl selects it, reads the sub-region dropdown the
/// server renders in response, then refreshes back to "all regions" before
/// moving on. It shares nothing with the data conversations except the
/// transport.
pub struct CatalogCrawler<'a, T: Transport + ?Sized> {
    transport: &'a T,
    endpoint: &'a str,
    year: i32,
}

impl<'a, T: Transport + ?Sized> CatalogCrawler<'a, T> {
    pub fn new(transport: &'a T, endpoint: &'a str, year: i32) -> Self {
        Self {
            transport,
            endpoint,
            year,
        }
    }

    pub async fn crawl(&self) -> ScrapeResult<Vec<RegionEntry>> {
        let mut session = SessionState::new(self.transport, self.endpoint);
        let home = session.open().await?;
        let regions = dropdown_options(&home, REGION_SELECT_ID)?;
        tracing::info!("Catalog crawl: {} regions", regions.len());

        let mut entries = Vec::new();
        for region in regions {
            let region_name = parse_region_label(&region.label)?;
            if region.value.is_empty() {
                return Err(ScrapeError::CatalogFormat(format!(
                    "region option {:?} has no value",
                    region.label
                )));
            }

            let page = session
                .postback(
                    PayloadKind::RegionSelect,
                    &Selection::year(self.year).region(region.value.as_str()),
                )
                .await?;

            let before = entries.len();
            for option in dropdown_options(&page, SUB_REGION_SELECT_ID)? {
                let label = parse_sub_region_label(&option.label)?;
                entries.push(RegionEntry::new(
                    region_name.as_str(),
                    label.name,
                    label.state_code,
                    label.sub_region_code,
                ));
            }
            tracing::debug!("{region_name}: {} sub-regions", entries.len() - before);

            session
                .postback(PayloadKind::Refresh, &Selection::year(self.year))
                .await?;
        }

        Ok(entries)
    }
}
