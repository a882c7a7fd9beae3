//! Monthly plain-text report files.
//!
//! One report file per calendar month, named `devices_YYYY-MM.txt`. The file
//! starts with a header block written once at creation; every flush appends
//! the full snapshot as fixed-width rows, so the newest section at the end of
//! the file is the current state.

use crate::registry::DeviceRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Timestamp format used in the header and in row columns.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Width of the dash separator under the column header.
const SEPARATOR_WIDTH: usize = 160;

/// Format a wall-clock instant as the month stamp used in file names.
pub fn month_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// Build the report file name for a month stamp.
pub fn report_filename(month: &str) -> String {
    format!("devices_{}.txt", month)
}

/// Render one record as a fixed-width report row.
///
/// Columns are left-justified to minimum widths 15/8/12/15/20/20/12/12/8/10/15
/// and separated by a single space. Overlong values are never truncated, they
/// push the rest of the row to the right. Traffic is reported in binary
/// megabytes with two decimals.
pub fn render_row(record: &DeviceRecord) -> String {
    let uplink_mb = record.total_uplink as f64 / (1024.0 * 1024.0);
    let downlink_mb = record.total_downlink as f64 / (1024.0 * 1024.0);
    let protocols = record.protocols.iter().cloned().collect::<Vec<_>>().join(",");
    let tags = record.tags.iter().cloned().collect::<Vec<_>>().join(",");

    format!(
        "{:<15} {:<8} {:<12} {:<15} {:<20} {:<20} {:<12.2} {:<12.2} {:<8} {:<10} {:<15}\n",
        record.address,
        record.port,
        record.country,
        record.city,
        record.first_seen.format(TIMESTAMP_FORMAT).to_string(),
        record.last_seen.format(TIMESTAMP_FORMAT).to_string(),
        uplink_mb,
        downlink_mb,
        record.connection_count,
        protocols,
        tags,
    )
}

/// Render the header block written once at file creation.
fn render_header(month: &str, now: DateTime<Utc>) -> String {
    format!(
        "Device Tracker - {}\nGenerated: {}\n\n{:<15} {:<8} {:<12} {:<15} {:<20} {:<20} {:<12} {:<12} {:<8} {:<10} {:<15}\n{}\n",
        month,
        now.format(TIMESTAMP_FORMAT),
        "IP Address",
        "Port",
        "Country",
        "City",
        "First Seen",
        "Last Seen",
        "Uplink (MB)",
        "Downlink (MB)",
        "Connections",
        "Protocols",
        "Tags",
        "-".repeat(SEPARATOR_WIDTH),
    )
}

/// An open monthly report target.
///
/// Holds the path and month stamp only; the file itself is opened per write,
/// so an externally deleted file reappears on the next flush instead of
/// failing until rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyReport {
    /// Path of the report file
    path: PathBuf,
    /// Month stamp this file covers, e.g. "2026-08"
    month: String,
}

impl MonthlyReport {
    /// Create the report file for the month containing `now`.
    ///
    /// Truncates any existing file at the path and writes the header block.
    /// The caller must only rotate to the returned report after this
    /// succeeds, so a failed creation leaves the previous target in place.
    pub fn create(dir: &Path, now: DateTime<Utc>) -> Result<Self> {
        let month = month_stamp(now);
        let path = dir.join(report_filename(&month));

        let file = File::create(&path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(render_header(&month, now).as_bytes())
            .with_context(|| format!("Failed to write report header: {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush report header: {}", path.display()))?;

        Ok(Self { path, month })
    }

    /// Get the path of the report file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the month stamp this report covers.
    pub fn month(&self) -> &str {
        &self.month
    }

    /// Check whether this report still covers the month containing `now`.
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        self.month == month_stamp(now)
    }

    /// Append a snapshot of records to the report.
    ///
    /// Rows are sorted by endpoint so repeated flushes of the same state
    /// produce identical sections. Opens in append mode and recreates the
    /// file if it went missing, though a recreated file lacks the header.
    pub fn append(&self, records: &[DeviceRecord]) -> Result<()> {
        let mut rows: Vec<&DeviceRecord> = records.iter().collect();
        rows.sort_by(|a, b| (&a.address, a.port).cmp(&(&b.address, b.port)));

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open report file: {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);

        for record in rows {
            writer
                .write_all(render_row(record).as_bytes())
                .with_context(|| format!("Failed to write report row: {}", self.path.display()))?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to flush report rows: {}", self.path.display()))?;

        Ok(())
    }
}
