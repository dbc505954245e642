//! Destinations for scraped rows.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::csv::write_row;
use crate::types::{DataRow, ScrapeResult};

/// Receives rows one at a time as they are extracted.
pub trait RowSink {
    fn write_row(&mut self, row: &DataRow) -> ScrapeResult<()>;
}

impl RowSink for Vec<DataRow> {
    fn write_row(&mut self, row: &DataRow) -> ScrapeResult<()> {
        self.push(row.clone());
        Ok(())
    }
}

/// CSV output with a header line.
///
/// Every row is flushed as it is written, so rows already extracted survive
/// a failed run.
pub struct CsvSink<W: Write> {
    writer: W,
    rows_written: u64,
}

impl<W: Write> CsvSink<W> {
    /// Wrap `writer` and write the header.
    pub fn new(mut writer: W) -> ScrapeResult<Self> {
        write_row(&mut writer, &DataRow::HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Wrap `writer` without writing a header.
    pub fn headerless(writer: W) -> Self {
        Self {
            writer,
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl CsvSink<BufWriter<File>> {
    /// Create (or truncate) `path` and write the header.
    pub fn create(path: &Path) -> ScrapeResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::new(BufWriter::new(File::create(path)?))
    }

    /// Append to `path`; the header is written only if the file is new or empty.
    pub fn append(path: &Path) -> ScrapeResult<Self> {
        let is_empty = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = BufWriter::new(file);
        if is_empty {
            Self::new(writer)
        } else {
            Ok(Self::headerless(writer))
        }
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_row(&mut self, row: &DataRow) -> ScrapeResult<()> {
        write_row(&mut self.writer, &row.to_record())?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }
}
