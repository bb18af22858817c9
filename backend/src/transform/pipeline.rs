//! High-level pipeline API: raw extracts in, dimensional model out.
//!
//! [`transform`] is the pure core (clean, build the Dates dimension, map
//! DateIDs, consolidate, build frames). [`run`] wraps it with loading and
//! exporting.
//!
//! # Example
//!
//! ```rust,ignore
//! use txmart::{run, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let summary = run(&PipelineConfig::from_env()).await?;
//!     println!("Wrote {} tables", summary.tables.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::thread::{self, ScopedJoinHandle};
use tracing::info;

use super::cleaner::{clean_deposits, clean_events, clean_users, clean_withdrawals};
use super::consolidate::consolidate;
use super::dates::{DateDimension, KeyOrder};
use super::mapper::{map_date_ids, unresolved_count};
use crate::config::PipelineConfig;
use crate::error::{CleanResult, PipelineError, PipelineResult};
use crate::export::{
    dates_frame, deposits_frame, events_frame, transactions_frame, users_frame,
    withdrawals_frame, Exporter, OutputFrame, OutputTable,
};
use crate::loader::{Loader, RawTables};
use crate::models::{Event, Transaction};
use crate::parser::RawTable;

/// Options for the in-memory transformation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    /// How Dates-dimension ids are assigned.
    pub key_order: KeyOrder,
}

/// The six output frames of one run, all contract-checked.
#[derive(Debug, Clone)]
pub struct ModelTables {
    pub transactions: OutputFrame,
    pub deposits: OutputFrame,
    pub withdrawals: OutputFrame,
    pub events: OutputFrame,
    pub users: OutputFrame,
    pub dates: OutputFrame,

    /// Deposits, withdrawals and events whose date had no DateID.
    pub unresolved_date_ids: usize,
}

impl ModelTables {
    /// Frames in export order.
    pub fn into_frames(self) -> Vec<OutputFrame> {
        vec![
            self.transactions,
            self.deposits,
            self.withdrawals,
            self.events,
            self.users,
            self.dates,
        ]
    }
}

/// Per-table outcome of an export.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table: OutputTable,
    pub rows: usize,
    pub path: PathBuf,
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tables: Vec<TableSummary>,
    pub unresolved_date_ids: usize,
}

impl RunSummary {
    pub fn rows(&self, table: OutputTable) -> Option<usize> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }
}

struct CleanedTables {
    users: RawTable,
    deposits: Vec<Transaction>,
    withdrawals: Vec<Transaction>,
    events: Vec<Event>,
}

/// Clean the four tables; the independent cleanings run on scoped threads.
fn clean_all(raw: &RawTables) -> PipelineResult<CleanedTables> {
    thread::scope(|scope| -> PipelineResult<CleanedTables> {
        let users = scope.spawn(|| clean_users(&raw.users));
        let deposits = scope.spawn(|| clean_deposits(&raw.deposits));
        let withdrawals = scope.spawn(|| clean_withdrawals(&raw.withdrawals));
        let events = clean_events(&raw.events);

        Ok(CleanedTables {
            users: join_worker(users, "users")?,
            deposits: join_worker(deposits, "deposits")?,
            withdrawals: join_worker(withdrawals, "withdrawals")?,
            events: events?,
        })
    })
}

fn join_worker<T>(
    handle: ScopedJoinHandle<'_, CleanResult<T>>,
    table: &'static str,
) -> PipelineResult<T> {
    let cleaned = handle
        .join()
        .map_err(|_| PipelineError::WorkerPanicked(table))?;
    Ok(cleaned?)
}

/// Turn raw extracts into the six output frames.
///
/// Nothing is written here; any malformed input fails the whole call.
pub fn transform(raw: RawTables, options: &TransformOptions) -> PipelineResult<ModelTables> {
    let cleaned = clean_all(&raw)?;

    let dimension = DateDimension::build(
        &cleaned.deposits,
        &cleaned.withdrawals,
        &cleaned.events,
        options.key_order,
    );

    let dated_deposits = map_date_ids(&cleaned.deposits, &dimension);
    let dated_withdrawals = map_date_ids(&cleaned.withdrawals, &dimension);
    let dated_events = map_date_ids(&cleaned.events, &dimension);

    let unresolved = unresolved_count(&dated_deposits)
        + unresolved_count(&dated_withdrawals)
        + unresolved_count(&dated_events);

    let facts = consolidate(&dated_deposits, &dated_withdrawals);

    Ok(ModelTables {
        transactions: transactions_frame(&facts)?,
        deposits: deposits_frame(&cleaned.deposits)?,
        withdrawals: withdrawals_frame(&cleaned.withdrawals)?,
        events: events_frame(&dated_events)?,
        users: users_frame(&cleaned.users)?,
        dates: dates_frame(&dimension)?,
        unresolved_date_ids: unresolved,
    })
}

/// Load, transform and export.
///
/// Every frame is built before the first file is written, so a failure
/// leaves the output directory untouched.
pub async fn run(config: &PipelineConfig) -> PipelineResult<RunSummary> {
    info!(
        output_dir = %config.output_dir.display(),
        format = ?config.format,
        key_order = ?config.key_order,
        "Starting run"
    );

    let loader = Loader::new(config)?;
    let raw = loader.load_all().await?;

    let options = TransformOptions {
        key_order: config.key_order,
    };
    let model = tokio::task::spawn_blocking(move || transform(raw, &options))
        .await
        .map_err(|_| PipelineError::WorkerPanicked("transform"))??;
    let unresolved_date_ids = model.unresolved_date_ids;
    let frames = model.into_frames();

    let exporter = Exporter::new(&config.output_dir, config.format);
    let paths = exporter.write_all(&frames)?;

    let tables: Vec<TableSummary> = frames
        .iter()
        .zip(paths)
        .map(|(frame, path)| TableSummary {
            table: frame.table(),
            rows: frame.len(),
            path,
        })
        .collect();

    info!(tables = tables.len(), unresolved_date_ids, "Run complete");
    Ok(RunSummary {
        tables,
        unresolved_date_ids,
    })
}
