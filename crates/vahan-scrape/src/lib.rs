//! Vahan scrape: replays the dashboard's form postbacks to pull monthly
//! electric-vehicle registration counts per region, sub-region, and vehicle
//! category.
//!
//! The dashboard has no data API. Each request must echo the view state token
//! from the previous response, so data is reached by replaying, in order, the
//! postbacks a browser would send and then reading the rendered table.

pub mod catalog;
pub mod config;
pub mod csv;
mod html;
pub mod payload;
pub mod plan;
pub mod runner;
pub mod sequencer;
pub mod sink;
pub mod table;
pub mod token;
pub mod transport;
pub mod types;

pub use catalog::{parse_sub_region_label, read_catalog_file, write_catalog, CatalogCrawler};
pub use config::ScrapeConfig;
pub use payload::{build_payload, Payload, PayloadKind, Period, Selection};
pub use plan::{plan_units, WorkUnit};
pub use runner::{RunSummary, Runner};
pub use sequencer::{Conversation, ConversationState, SessionState, UnitReport};
pub use sink::{CsvSink, RowSink};
pub use table::{extract_counts, TableLayout};
pub use token::{extract_view_state, ViewState};
pub use transport::{HttpClient, HttpOptions, Transport};
pub use types::*;
