//! Transformation module.
//!
//! This module turns raw extracts into the dimensional model:
//! - Timestamp: mixed and strict timestamp normalization
//! - Cleaner: dedup, missing-value removal, typed decoding
//! - Dates: the Dates dimension
//! - Mapper: DateID lookup onto timestamped records
//! - Consolidate: deposits + withdrawals into the fact table
//! - Pipeline: end-to-end orchestration

pub mod cleaner;
pub mod consolidate;
pub mod dates;
pub mod mapper;
pub mod pipeline;
pub mod timestamp;

pub use cleaner::{
    clean_deposits, clean_events, clean_transactions, clean_users, clean_withdrawals,
    drop_duplicate_keys, drop_duplicate_rows, drop_incomplete_rows,
};
pub use consolidate::consolidate;
pub use dates::{DateDimension, DateEntry, KeyOrder};
pub use mapper::{map_date_ids, unresolved_count};
pub use pipeline::{run, transform, ModelTables, RunSummary, TableSummary, TransformOptions};
pub use timestamp::{format_timestamp, parse_mixed, ParsePolicy, TimestampParser};
