//! Domain models for the txmart pipeline.
//!
//! - [`Transaction`] - a cleaned deposit or withdrawal
//! - [`Event`] - a cleaned user event
//! - [`DateId`] - surrogate key of the Dates dimension
//! - [`Dated`] - any record enriched with its (possibly unresolved) DateID
//! - [`TransactionFact`] - one row of the consolidated fact table

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status value a transaction must carry to reach the fact table.
pub const COMPLETE_STATUS: &str = "complete";

// =============================================================================
// Source Records
// =============================================================================

/// Which transaction source a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransType {
    Deposit,
    Withdrawal,
}

impl TransType {
    /// Prefix used when building the composite transaction id.
    pub fn marker(self) -> char {
        match self {
            TransType::Deposit => 'D',
            TransType::Withdrawal => 'W',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransType::Deposit => "deposit",
            TransType::Withdrawal => "withdrawal",
        }
    }

    /// Source table name, used in logs and error messages.
    pub fn table_name(self) -> &'static str {
        match self {
            TransType::Deposit => "deposits",
            TransType::Withdrawal => "withdrawals",
        }
    }
}

impl fmt::Display for TransType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cleaned deposit or withdrawal.
///
/// Only `id`, `amount` and `event_timestamp` are guaranteed; the cleaner
/// tolerates gaps elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: Option<String>,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub tx_status: Option<String>,
    /// UTC, timezone stripped.
    pub event_timestamp: NaiveDateTime,
    /// Withdrawals only.
    pub interface: Option<String>,
}

impl Transaction {
    pub fn is_complete(&self) -> bool {
        self.tx_status.as_deref() == Some(COMPLETE_STATUS)
    }
}

/// A cleaned event; every attribute is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub event_name: String,
    /// UTC, timezone stripped.
    pub event_timestamp: NaiveDateTime,
}

/// Records that carry a normalized instant.
pub trait Timestamped {
    fn timestamp(&self) -> NaiveDateTime;

    /// Calendar date of the instant (time of day dropped).
    fn calendar_date(&self) -> NaiveDate {
        self.timestamp().date()
    }
}

impl Timestamped for Transaction {
    fn timestamp(&self) -> NaiveDateTime {
        self.event_timestamp
    }
}

impl Timestamped for Event {
    fn timestamp(&self) -> NaiveDateTime {
        self.event_timestamp
    }
}

impl Timestamped for NaiveDateTime {
    fn timestamp(&self) -> NaiveDateTime {
        *self
    }
}

// =============================================================================
// Dimension Keys
// =============================================================================

/// Surrogate key of a Dates dimension entry. Starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateId(pub u32);

impl DateId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record plus its DateID. `None` means the record's date was not in
/// the dimension it was mapped against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dated<T> {
    pub record: T,
    pub date_id: Option<DateId>,
}

impl<T> Dated<T> {
    pub fn is_resolved(&self) -> bool {
        self.date_id.is_some()
    }
}

// =============================================================================
// Fact Table
// =============================================================================

/// Source-tagged transaction id: `D<id>` or `W<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransId {
    pub kind: TransType,
    pub source_id: i64,
}

impl TransId {
    pub fn new(kind: TransType, source_id: i64) -> Self {
        Self { kind, source_id }
    }
}

impl fmt::Display for TransId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.marker(), self.source_id)
    }
}

/// One row of the consolidated Transactions fact table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFact {
    pub trans_id: TransId,
    pub date_id: Option<DateId>,
    pub user_id: Option<String>,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub trans_type: TransType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trans_id_display_is_source_tagged() {
        assert_eq!(TransId::new(TransType::Deposit, 17).to_string(), "D17");
        assert_eq!(TransId::new(TransType::Withdrawal, 17).to_string(), "W17");
        assert_ne!(
            TransId::new(TransType::Deposit, 17),
            TransId::new(TransType::Withdrawal, 17)
        );
    }

    #[test]
    fn test_trans_type_serializes_lowercase() {
        let json = serde_json::to_string(&TransType::Withdrawal).unwrap();
        assert_eq!(json, "\"withdrawal\"");
    }

    #[test]
    fn test_calendar_date_truncates_time() {
        let ts = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(ts.calendar_date(), NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
    }
}
