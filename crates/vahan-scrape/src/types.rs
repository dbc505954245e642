//! Core data types for catalog entries, scraped rows, and errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Code the dashboard uses for "all regions" / "all sub-regions".
pub const ALL_CODE: &str = "-1";

/// One sub-region of the catalog, with the codes used to parameterize postbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub region_name: String,
    pub sub_region_name: String,
    pub region_code: String,
    pub sub_region_code: String,
}

impl RegionEntry {
    pub fn new(
        region_name: impl Into<String>,
        sub_region_name: impl Into<String>,
        region_code: impl Into<String>,
        sub_region_code: impl Into<String>,
    ) -> Self {
        Self {
            region_name: region_name.into(),
            sub_region_name: sub_region_name.into(),
            region_code: region_code.into(),
            sub_region_code: sub_region_code.into(),
        }
    }

    /// Identity of the entry: `(region_code, sub_region_code)`.
    pub fn key(&self) -> (&str, &str) {
        (&self.region_code, &self.sub_region_code)
    }
}

/// One parsed row of the data table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub electric_vehicle_count: u64,
}

/// A row of output: one vehicle category for one sub-region and month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRow {
    pub region: String,
    pub sub_region: String,
    pub year: i32,
    pub month: u32,
    pub category: String,
    pub electric_vehicle_count: u64,
}

impl DataRow {
    pub fn new(entry: &RegionEntry, year: i32, month: u32, count: CategoryCount) -> Self {
        Self {
            region: entry.region_name.clone(),
            sub_region: entry.sub_region_name.clone(),
            year,
            month,
            category: count.category,
            electric_vehicle_count: count.electric_vehicle_count,
        }
    }

    /// Output column names, in order.
    pub const HEADER: [&'static str; 6] = [
        "region",
        "sub_region",
        "year",
        "month",
        "category",
        "electric_vehicle_count",
    ];

    /// Cells in the same order as [`DataRow::HEADER`].
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.region.clone(),
            self.sub_region.clone(),
            self.year.to_string(),
            self.month.to_string(),
            self.category.clone(),
            self.electric_vehicle_count.to_string(),
        ]
    }
}

/// Identifies the unit of work an error belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitId {
    pub region: String,
    pub sub_region: String,
    pub year: i32,
    pub month: Option<u32>,
}

impl UnitId {
    pub fn new(entry: &RegionEntry, year: i32) -> Self {
        Self {
            region: entry.region_name.clone(),
            sub_region: entry.sub_region_name.clone(),
            year,
            month: None,
        }
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.region, self.sub_region, self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{month:02}")?;
        }
        Ok(())
    }
}

/// Broad error category, used when reporting a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProtocolFormat,
    TableFormat,
    CatalogFormat,
    Transport,
    Sequence,
    InvalidInput,
    Config,
    Io,
}

/// Errors that can occur while replaying postbacks.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// The state token field is missing from a response.
    #[error("Protocol format error: {0}")]
    ProtocolFormat(String),

    /// The data table is missing or does not have the expected shape.
    #[error("Table format error: {0}")]
    TableFormat(String),

    /// A catalog label or row cannot be split into name and codes.
    #[error("Catalog format error: {0}")]
    CatalogFormat(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// A conversation was driven out of order.
    #[error("Sequence error: {0}")]
    Sequence(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any of the above, tagged with the unit that failed.
    #[error("{unit}: {error}")]
    Unit {
        unit: UnitId,
        error: Box<ScrapeError>,
    },
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::ProtocolFormat(_) => ErrorKind::ProtocolFormat,
            ScrapeError::TableFormat(_) => ErrorKind::TableFormat,
            ScrapeError::CatalogFormat(_) => ErrorKind::CatalogFormat,
            ScrapeError::Transport(_) | ScrapeError::HttpStatus { .. } => ErrorKind::Transport,
            ScrapeError::Sequence(_) => ErrorKind::Sequence,
            ScrapeError::InvalidInput(_) => ErrorKind::InvalidInput,
            ScrapeError::Config(_) => ErrorKind::Config,
            ScrapeError::Io(_) => ErrorKind::Io,
            ScrapeError::Unit { error, .. } => error.kind(),
        }
    }

    /// Whether the request that produced this error may be sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScrapeError::Transport(e) => !e.is_builder() && !e.is_decode(),
            ScrapeError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The unit this error was raised for, if it has been tagged.
    pub fn unit(&self) -> Option<&UnitId> {
        match self {
            ScrapeError::Unit { unit, .. } => Some(unit),
            _ => None,
        }
    }

    /// Tag the error with a unit. An already tagged error keeps its unit.
    pub fn in_unit(self, unit: UnitId) -> Self {
        match self {
            e @ ScrapeError::Unit { .. } => e,
            other => ScrapeError::Unit {
                unit,
                error: Box::new(other),
            },
        }
    }
}

/// Convenience result type.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
