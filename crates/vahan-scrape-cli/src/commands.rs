//! Subcommand bodies, separate from argument parsing.

use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;

use vahan_scrape::plan::filter_regions;
use vahan_scrape::{
    plan_units, read_catalog_file, write_catalog, CatalogCrawler, CsvSink, HttpClient, RunSummary,
    Runner, ScrapeConfig, WorkUnit,
};

pub const DEFAULT_CATALOG: &str = "rto_file.csv";
pub const DEFAULT_OUTPUT: &str = "vahan_data.csv";

/// Apply command-line flags over file settings.
pub fn apply_overrides(
    mut config: ScrapeConfig,
    start_year: Option<i32>,
    fail_fast: bool,
) -> anyhow::Result<ScrapeConfig> {
    if let Some(year) = start_year {
        config.start_year = year;
    }
    config.fail_fast |= fail_fast;
    config.validate()?;
    Ok(config)
}

/// Units a scrape over `catalog` would run.
pub fn plan(
    config: &ScrapeConfig,
    catalog: &Path,
    regions: &[String],
    today: NaiveDate,
) -> anyhow::Result<Vec<WorkUnit>> {
    let entries = read_catalog_file(catalog)
        .with_context(|| format!("reading catalog {}", catalog.display()))?;
    let entries = filter_regions(entries, regions);
    if entries.is_empty() {
        tracing::warn!("No catalog entries selected");
    }
    Ok(plan_units(&entries, config.start_year, today))
}

pub fn render_plan(units: &[WorkUnit], json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(units)? + "\n");
    }

    let mut out = String::new();
    for u in units {
        writeln!(
            out,
            "{}{:<4} {} / {}  {}  months 1-{}",
            u.entry.region_code,
            u.entry.sub_region_code,
            u.entry.region_name,
            u.entry.sub_region_name,
            u.year,
            u.month_until
        )?;
    }
    let months: u32 = units.iter().map(|u| u.month_until).sum();
    writeln!(out, "{} units, {} month pages", units.len(), months)?;
    Ok(out)
}

/// Run every unit, writing rows to `output`.
pub async fn scrape(
    config: ScrapeConfig,
    units: &[WorkUnit],
    output: &Path,
    append: bool,
) -> anyhow::Result<RunSummary> {
    let mut sink = if append {
        CsvSink::append(output)
    } else {
        CsvSink::create(output)
    }
    .with_context(|| format!("opening output {}", output.display()))?;

    let transport = HttpClient::new(config.http_options())?;
    let runner = Runner::new(transport, config);
    tracing::info!("Scraping {} units into {}", units.len(), output.display());

    Ok(runner.run(units, &mut sink).await?)
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = format!(
        "Units completed: {}\nRows written: {}\nRequests: {}\n",
        summary.units_completed, summary.rows_written, summary.round_trips
    );
    if !summary.skipped.is_empty() {
        out.push_str(&format!("Skipped: {}\n", summary.skipped.len()));
        for s in &summary.skipped {
            out.push_str(&format!("  {}: {}\n", s.unit, s.message));
        }
    }
    out
}

/// Crawl the dashboard's dropdowns and write the catalog to `output`.
pub async fn crawl_catalog(config: &ScrapeConfig, output: &Path, year: i32) -> anyhow::Result<usize> {
    let transport = HttpClient::new(config.http_options())?;
    let entries = CatalogCrawler::new(&transport, &config.endpoint, year)
        .crawl()
        .await?;

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    write_catalog(BufWriter::new(file), &entries)?;
    tracing::info!("Wrote {} catalog entries to {}", entries.len(), output.display());
    Ok(entries.len())
}
