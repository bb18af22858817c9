//! Output table contracts.
//!
//! Every output table has a fixed, ordered column list. Frames are checked
//! against it when they are built, so the exporter never sees a frame with
//! the wrong shape.

use serde::Serialize;
use std::fmt;

use crate::error::{SchemaError, SchemaResult};

pub const TRANSACTIONS_COLUMNS: &[&str] =
    &["TransID", "DateID", "user_id", "amount", "currency", "TransType"];
pub const DEPOSITS_COLUMNS: &[&str] = &["TransID", "user_id", "event_timestamp", "tx_status"];
pub const WITHDRAWALS_COLUMNS: &[&str] =
    &["TransID", "user_id", "event_timestamp", "interface", "tx_status"];
pub const EVENTS_COLUMNS: &[&str] = &["id", "event_timestamp", "user_id", "event_name", "DateID"];
pub const DATES_COLUMNS: &[&str] = &["DateID", "Date", "DayOfWeek", "Month", "Year"];

/// The six tables a run produces, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTable {
    Transactions,
    Deposits,
    Withdrawals,
    Events,
    Users,
    Dates,
}

impl OutputTable {
    pub const ALL: [OutputTable; 6] = [
        OutputTable::Transactions,
        OutputTable::Deposits,
        OutputTable::Withdrawals,
        OutputTable::Events,
        OutputTable::Users,
        OutputTable::Dates,
    ];

    /// File stem the exporter writes to.
    pub fn stem(self) -> &'static str {
        match self {
            OutputTable::Transactions => "transactions_vf",
            OutputTable::Deposits => "deposits_vf",
            OutputTable::Withdrawals => "withdrawals_vf",
            OutputTable::Events => "events_vf",
            OutputTable::Users => "users_vf",
            OutputTable::Dates => "dates_vf",
        }
    }

    /// Exact column list, or `None` for users, whose columns pass through
    /// from the source extract.
    pub fn columns(self) -> Option<&'static [&'static str]> {
        match self {
            OutputTable::Transactions => Some(TRANSACTIONS_COLUMNS),
            OutputTable::Deposits => Some(DEPOSITS_COLUMNS),
            OutputTable::Withdrawals => Some(WITHDRAWALS_COLUMNS),
            OutputTable::Events => Some(EVENTS_COLUMNS),
            OutputTable::Users => None,
            OutputTable::Dates => Some(DATES_COLUMNS),
        }
    }

    /// Check a header row against this table's contract.
    ///
    /// Users only need a `user_id` column and no repeated names.
    pub fn check_headers(self, headers: &[String]) -> SchemaResult<()> {
        let matches = match self.columns() {
            Some(expected) => headers.iter().map(String::as_str).eq(expected.iter().copied()),
            None => {
                let mut names: Vec<&str> = headers.iter().map(String::as_str).collect();
                let has_key = names.contains(&"user_id");
                names.sort_unstable();
                names.dedup();
                has_key && names.len() == headers.len()
            }
        };

        if matches {
            Ok(())
        } else {
            Err(SchemaError::ColumnMismatch {
                table: self.stem(),
                expected: self
                    .columns()
                    .map(|cols| cols.iter().map(|c| c.to_string()).collect())
                    .unwrap_or_else(|| vec!["user_id".to_string(), "...".to_string()]),
                actual: headers.to_vec(),
            })
        }
    }
}

impl fmt::Display for OutputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.stem())
    }
}
