//! Runs planned units one after another against a shared transport.

use std::time::Instant;

use serde::Serialize;

use crate::config::ScrapeConfig;
use crate::plan::WorkUnit;
use crate::sequencer::{Conversation, UnitReport};
use crate::sink::RowSink;
use crate::transport::Transport;
use crate::types::{ErrorKind, ScrapeResult, UnitId};

/// A unit that was given up on while the run carried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    pub unit: UnitId,
    pub kind: ErrorKind,
    pub message: String,
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub units_completed: usize,
    pub rows_written: u64,
    pub round_trips: u64,
    pub skipped: Vec<SkippedUnit>,
}

/// Drives conversations for every planned unit.
///
/// Units never overlap: each gets a fresh token state, and the transport's
/// cookie jar is the only thing they share.
pub struct Runner<T: Transport> {
    transport: T,
    config: ScrapeConfig,
}

impl<T: Transport> Runner<T> {
    pub fn new(transport: T, config: ScrapeConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one unit to completion.
    pub async fn run_unit<S: RowSink + ?Sized>(
        &self,
        unit: &WorkUnit,
        sink: &mut S,
    ) -> ScrapeResult<UnitReport> {
        let conversation = Conversation::new(
            &self.transport,
            &self.config.endpoint,
            &unit.entry,
            unit.year,
            unit.month_until,
        )
        .map_err(|e| e.in_unit(UnitId::new(&unit.entry, unit.year)))?;

        conversation.run(&self.config.layout, sink).await
    }

    /// Run every unit in order.
    ///
    /// A malformed table skips its unit (unless `fail_fast` is set); any
    /// other error stops the run. Rows already written stay in the sink.
    pub async fn run<S: RowSink + ?Sized>(
        &self,
        units: &[WorkUnit],
        sink: &mut S,
    ) -> ScrapeResult<RunSummary> {
        let mut summary = RunSummary::default();
        let total = units.len();

        for (ix, unit) in units.iter().enumerate() {
            let started = Instant::now();
            tracing::info!(
                "[{}/{total}] {} / {} {} (months 1-{})",
                ix + 1,
                unit.entry.region_name,
                unit.entry.sub_region_name,
                unit.year,
                unit.month_until
            );

            match self.run_unit(unit, sink).await {
                Ok(report) => {
                    summary.units_completed += 1;
                    summary.rows_written += report.rows_written;
                    summary.round_trips += u64::from(report.round_trips);
                    tracing::info!(
                        "Wrote {} rows in {} requests ({:.1}s)",
                        report.rows_written,
                        report.round_trips,
                        started.elapsed().as_secs_f64()
                    );
                }
                Err(e) if e.kind() == ErrorKind::TableFormat && !self.config.fail_fast => {
                    let unit_id = e
                        .unit()
                        .cloned()
                        .unwrap_or_else(|| UnitId::new(&unit.entry, unit.year));
                    tracing::warn!("Skipping {unit_id}: {e}");
                    summary.skipped.push(SkippedUnit {
                        unit: unit_id,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!("Run stopped: {e}");
                    return Err(e);
                }
            }
        }

        Ok(summary)
    }
}
