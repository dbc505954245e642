//! Vahan scrape CLI: plans, runs, and reports dashboard scrapes.

pub mod commands;
pub mod config;

pub use config::{load_config, resolve_config_path};
