//! # txmart - transactions data mart builder
//!
//! txmart turns four raw extracts (users, deposits, withdrawals, events)
//! into a small star schema: a Dates dimension, a consolidated
//! Transactions fact table and cleaned pass-through tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Extracts   │────▶│   Loader    │────▶│   Cleaner   │────▶│ Dates + Map │────▶│  Exporter   │
//! │ (URL / zip) │     │ (auto-enc)  │     │ (dedup, ts) │     │ (+ facts)   │     │ (csv/json)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use txmart::{run, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let summary = run(&PipelineConfig::default()).await.unwrap();
//!     println!("{} tables written", summary.tables.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (Transaction, Event, DateId, TransactionFact)
//! - [`parser`] - CSV parsing with auto-detection
//! - [`loader`] - Fetching and unpacking the raw extracts
//! - [`transform`] - Cleaning, Dates dimension, consolidation, pipeline
//! - [`export`] - Output contracts and file writers
//! - [`config`] - Layered run configuration

// Core modules
pub mod error;
pub mod models;

// Configuration
pub mod config;

// Input
pub mod loader;
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod export;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CleanError, CsvError, DimensionError, ExportError, LoadError, PipelineError, PipelineResult,
    SchemaError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{DateId, Dated, Event, Timestamped, TransId, TransType, Transaction, TransactionFact};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{PipelineConfig, SourceLocation, SourceSet};

// =============================================================================
// Re-exports - Parsing & Loading
// =============================================================================

pub use loader::{extract_single_csv, Loader, RawTables};
pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_bytes_with,
    parse_csv_file_auto, parse_table, ParseResult, RawTable,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    consolidate, map_date_ids, run, transform, DateDimension, DateEntry, KeyOrder, ModelTables,
    RunSummary, TransformOptions,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{Exporter, OutputFormat, OutputFrame, OutputTable};
