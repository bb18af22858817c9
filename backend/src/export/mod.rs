//! Output persistence.
//!
//! ```text
//! model values ─▶ frames (contract-checked) ─▶ Exporter ─▶ <dir>/<stem>.csv|.json
//! ```
//!
//! Frames are validated when they are built, so by the time the exporter
//! runs every table of a run is known to be well-formed.

pub mod frames;
pub mod schema;

pub use frames::{
    dates_frame, deposits_frame, events_frame, transactions_frame, users_frame,
    withdrawals_frame, FrameRecord, OutputFrame,
};
pub use schema::OutputTable;

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ExportResult;

/// On-disk format of the output tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Writes frames into one output directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
    format: OutputFormat,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Target path of a table in this exporter's directory and format.
    pub fn path_for(&self, table: OutputTable) -> PathBuf {
        self.dir
            .join(format!("{}.{}", table.stem(), self.format.extension()))
    }

    /// Write one frame, replacing any previous file. Returns the path written.
    pub fn write(&self, frame: &OutputFrame) -> ExportResult<PathBuf> {
        let path = self.path_for(frame.table());
        match self.format {
            OutputFormat::Csv => write_csv(frame, &path)?,
            OutputFormat::Json => write_json(frame, &path)?,
        }
        info!(
            table = frame.table().stem(),
            rows = frame.len(),
            path = %path.display(),
            "Saved table"
        );
        Ok(path)
    }

    /// Create the directory and write every frame, in export order.
    pub fn write_all(&self, frames: &[OutputFrame]) -> ExportResult<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)?;

        let mut ordered: Vec<&OutputFrame> = frames.iter().collect();
        ordered.sort_by_key(|f| OutputTable::ALL.iter().position(|t| *t == f.table()));

        ordered.into_iter().map(|frame| self.write(frame)).collect()
    }
}

fn write_csv(frame: &OutputFrame, path: &Path) -> ExportResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(frame.headers())?;
    for row in frame.rows() {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(frame: &OutputFrame, path: &Path) -> ExportResult<()> {
    let records: Vec<FrameRecord<'_>> = frame.records().collect();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;
    Ok(())
}
