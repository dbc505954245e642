//! Decides which (sub-region, year, months) units a run covers.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::types::RegionEntry;

/// One conversation's worth of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkUnit {
    pub entry: RegionEntry,
    pub year: i32,
    pub month_until: u32,
}

/// Last month of `year` with complete data as of `today`.
///
/// Past years are complete. The current year runs up to last month, and has
/// nothing in January. Future years have nothing.
pub fn month_until(year: i32, today: NaiveDate) -> Option<u32> {
    match year.cmp(&today.year()) {
        std::cmp::Ordering::Less => Some(12),
        std::cmp::Ordering::Equal => today.month().checked_sub(1).filter(|m| *m > 0),
        std::cmp::Ordering::Greater => None,
    }
}

/// Every unit from `start_year` through the last year with data, catalog
/// order first, then ascending year.
pub fn plan_units(catalog: &[RegionEntry], start_year: i32, today: NaiveDate) -> Vec<WorkUnit> {
    let years: Vec<(i32, u32)> = (start_year..=today.year())
        .filter_map(|y| month_until(y, today).map(|m| (y, m)))
        .collect();

    catalog
        .iter()
        .flat_map(|entry| {
            years.iter().map(move |&(year, month_until)| WorkUnit {
                entry: entry.clone(),
                year,
                month_until,
            })
        })
        .collect()
}

/// Keep only entries whose region code is in `codes` (case-insensitive).
/// An empty filter keeps everything.
pub fn filter_regions(catalog: Vec<RegionEntry>, codes: &[String]) -> Vec<RegionEntry> {
    if codes.is_empty() {
        return catalog;
    }
    catalog
        .into_iter()
        .filter(|e| codes.iter().any(|c| c.eq_ignore_ascii_case(&e.region_code)))
        .collect()
}
