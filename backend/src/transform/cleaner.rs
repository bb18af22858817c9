//! Row cleaning for the four raw extracts.
//!
//! The row-level helpers work on [`RawTable`] and return a new table; they
//! are idempotent. The per-source functions apply the same rules in one pass
//! so that errors carry the source row index, and decode the surviving rows
//! into typed records.
//!
//! | Source      | Dedup            | Missing values dropped | Timestamp policy |
//! |-------------|------------------|------------------------|------------------|
//! | users       | by `user_id`     | any column             | -                |
//! | deposits    | typed row        | `amount` only          | mixed            |
//! | withdrawals | typed row        | `amount` only          | mixed            |
//! | events      | whole row        | any column             | strict           |

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info};

use super::timestamp::{ParsePolicy, TimestampParser};
use crate::error::{CleanError, CleanResult};
use crate::models::{Event, TransType, Transaction};
use crate::parser::RawTable;

pub const USERS: &str = "users";
pub const EVENTS: &str = "events";

// =============================================================================
// Row-level helpers
// =============================================================================

/// Predicate keeping the first of each run of identical rows.
fn first_occurrence() -> impl FnMut(&[Option<String>]) -> bool {
    let mut seen = HashSet::new();
    move |row| seen.insert(row.to_vec())
}

fn is_complete(row: &[Option<String>]) -> bool {
    row.iter().all(Option::is_some)
}

fn has_value(row: &[Option<String>], column: usize) -> bool {
    matches!(row.get(column), Some(Some(_)))
}

/// Remove rows identical to an earlier row. First occurrence wins.
pub fn drop_duplicate_rows(table: &RawTable) -> RawTable {
    table.filter_rows(first_occurrence())
}

/// Remove rows whose key cell repeats an earlier row's. First occurrence wins.
pub fn drop_duplicate_keys(table: &RawTable, key: usize) -> RawTable {
    let mut seen = HashSet::new();
    table.filter_rows(|row| seen.insert(row.get(key).cloned().flatten()))
}

/// Remove rows with at least one missing cell.
pub fn drop_incomplete_rows(table: &RawTable) -> RawTable {
    table.filter_rows(is_complete)
}

fn require_column(table: &RawTable, name: &'static str, column: &str) -> CleanResult<usize> {
    table
        .column_index(column)
        .ok_or_else(|| CleanError::MissingColumn {
            table: name,
            column: column.to_string(),
        })
}

// =============================================================================
// Users
// =============================================================================

/// Deduplicate users on `user_id`, then drop rows with any missing value.
pub fn clean_users(raw: &RawTable) -> CleanResult<RawTable> {
    let key = require_column(raw, USERS, "user_id")?;

    let unique = drop_duplicate_keys(raw, key);
    let cleaned = drop_incomplete_rows(&unique);

    info!(
        table = USERS,
        input = raw.len(),
        duplicates = raw.len() - unique.len(),
        incomplete = unique.len() - cleaned.len(),
        output = cleaned.len(),
        "Cleaned table"
    );
    Ok(cleaned)
}

// =============================================================================
// Deposits / Withdrawals
// =============================================================================

struct TransactionColumns {
    id: usize,
    user_id: usize,
    amount: usize,
    currency: usize,
    tx_status: usize,
    event_timestamp: usize,
    interface: Option<usize>,
}

impl TransactionColumns {
    fn locate(table: &RawTable, kind: TransType) -> CleanResult<Self> {
        let name = kind.table_name();
        Ok(Self {
            id: require_column(table, name, "id")?,
            user_id: require_column(table, name, "user_id")?,
            amount: require_column(table, name, "amount")?,
            currency: require_column(table, name, "currency")?,
            tx_status: require_column(table, name, "tx_status")?,
            event_timestamp: require_column(table, name, "event_timestamp")?,
            interface: match kind {
                TransType::Withdrawal => Some(require_column(table, name, "interface")?),
                TransType::Deposit => None,
            },
        })
    }

    /// Typed id and amount, plus the text of every other cell.
    fn dedup_key(&self, record: &Transaction, cells: &[Option<String>]) -> DedupKey {
        let rest = cells
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != self.id && *idx != self.amount)
            .map(|(_, cell)| cell.clone())
            .collect();
        (record.id, record.amount.normalize(), rest)
    }
}

type DedupKey = (i64, Decimal, Vec<Option<String>>);

/// Clean the deposits extract.
pub fn clean_deposits(raw: &RawTable) -> CleanResult<Vec<Transaction>> {
    clean_transactions(raw, TransType::Deposit)
}

/// Clean the withdrawals extract.
pub fn clean_withdrawals(raw: &RawTable) -> CleanResult<Vec<Transaction>> {
    clean_transactions(raw, TransType::Withdrawal)
}

/// Drop rows without an amount, decode the rest, then drop duplicates.
///
/// Duplicates are judged on decoded values: `id` as an integer and `amount`
/// as a normalized decimal, so `100` and `100.0` match. Every other cell is
/// compared as text. Timestamps are parsed with the mixed policy. Gaps in
/// `user_id`, `currency`, `tx_status` and `interface` are kept as `None`.
/// Error rows are source row indices.
pub fn clean_transactions(raw: &RawTable, kind: TransType) -> CleanResult<Vec<Transaction>> {
    let name = kind.table_name();
    let cols = TransactionColumns::locate(raw, kind)?;

    let mut parser = TimestampParser::new(ParsePolicy::Mixed);
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(raw.len());
    let (mut duplicates, mut missing_amount) = (0usize, 0usize);

    for (row, cells) in raw.rows.iter().map(Vec::as_slice).enumerate() {
        if !has_value(cells, cols.amount) {
            missing_amount += 1;
            continue;
        }
        let record = decode_transaction(name, row, cells, &cols, &mut parser)?;
        if seen.insert(cols.dedup_key(&record, cells)) {
            records.push(record);
        } else {
            duplicates += 1;
        }
    }

    info!(
        table = name,
        input = raw.len(),
        duplicates,
        missing_amount,
        output = records.len(),
        "Cleaned table"
    );
    Ok(records)
}

fn decode_transaction(
    table: &'static str,
    row: usize,
    cells: &[Option<String>],
    cols: &TransactionColumns,
    parser: &mut TimestampParser,
) -> CleanResult<Transaction> {
    let text = |idx: usize| cells.get(idx).cloned().flatten();

    let id_raw = text(cols.id).ok_or(CleanError::MissingValue {
        table,
        row,
        column: "id",
    })?;
    let id = parse_id(&id_raw).ok_or(CleanError::InvalidValue {
        table,
        row,
        column: "id",
        value: id_raw.clone(),
    })?;

    let amount_raw = text(cols.amount).ok_or(CleanError::MissingValue {
        table,
        row,
        column: "amount",
    })?;
    let amount = parse_amount(&amount_raw).ok_or(CleanError::InvalidValue {
        table,
        row,
        column: "amount",
        value: amount_raw.clone(),
    })?;

    let ts_raw = text(cols.event_timestamp).ok_or(CleanError::MissingValue {
        table,
        row,
        column: "event_timestamp",
    })?;
    let event_timestamp = parser
        .parse(&ts_raw)
        .map_err(|message| CleanError::Timestamp {
            table,
            row,
            value: ts_raw.clone(),
            message,
        })?;

    Ok(Transaction {
        id,
        user_id: text(cols.user_id),
        amount,
        currency: text(cols.currency),
        tx_status: text(cols.tx_status),
        event_timestamp,
        interface: cols.interface.and_then(text),
    })
}

/// Integer id, tolerating a float rendering such as `12.0`.
fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        let value = Decimal::from_str(raw).ok()?;
        if value.fract().is_zero() {
            value.to_i64()
        } else {
            None
        }
    })
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

// =============================================================================
// Events
// =============================================================================

/// Drop duplicate and incomplete rows, then decode with the strict
/// timestamp policy. Duplicates are compared as text. Error rows are source
/// row indices.
pub fn clean_events(raw: &RawTable) -> CleanResult<Vec<Event>> {
    let id = require_column(raw, EVENTS, "id")?;
    let user_id = require_column(raw, EVENTS, "user_id")?;
    let event_name = require_column(raw, EVENTS, "event_name")?;
    let event_timestamp = require_column(raw, EVENTS, "event_timestamp")?;

    let mut unique = first_occurrence();
    let mut parser = TimestampParser::new(ParsePolicy::Strict);
    let mut events = Vec::with_capacity(raw.len());
    let (mut duplicates, mut incomplete) = (0usize, 0usize);

    for (row, cells) in raw.rows.iter().map(Vec::as_slice).enumerate() {
        if !unique(cells) {
            duplicates += 1;
            continue;
        }
        if !is_complete(cells) {
            incomplete += 1;
            continue;
        }
        let cell = |idx: usize| cells.get(idx).cloned().flatten().unwrap_or_default();

        let ts_raw = cell(event_timestamp);
        let parsed = parser
            .parse(&ts_raw)
            .map_err(|message| CleanError::Timestamp {
                table: EVENTS,
                row,
                value: ts_raw.clone(),
                message,
            })?;

        events.push(Event {
            id: cell(id),
            user_id: cell(user_id),
            event_name: cell(event_name),
            event_timestamp: parsed,
        });
    }

    if let Some(format) = parser.inferred_format() {
        debug!(table = EVENTS, format, "Inferred timestamp format");
    }
    info!(
        table = EVENTS,
        input = raw.len(),
        duplicates,
        incomplete,
        output = events.len(),
        "Cleaned table"
    );
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::timestamp::format_timestamp;
    use chrono::NaiveDate;

    fn deposits_table(rows: &[&[&str]]) -> RawTable {
        RawTable::from_strs(
            &["id", "event_timestamp", "user_id", "amount", "currency", "tx_status"],
            rows,
        )
    }

    /// Render cleaned deposits back into a raw extract.
    fn deposits_as_raw(deposits: &[Transaction]) -> RawTable {
        RawTable::new(
            ["id", "event_timestamp", "user_id", "amount", "currency", "tx_status"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            deposits
                .iter()
                .map(|tx| {
                    vec![
                        Some(tx.id.to_string()),
                        Some(format_timestamp(&tx.event_timestamp)),
                        tx.user_id.clone(),
                        Some(tx.amount.to_string()),
                        tx.currency.clone(),
                        tx.tx_status.clone(),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_users_keep_first_duplicate() {
        let raw = RawTable::from_strs(
            &["user_id", "country"],
            &[&["u1", "MX"], &["u2", "US"], &["u1", "BR"]],
        );
        let cleaned = clean_users(&raw).unwrap();

        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.rows[0][1].as_deref(), Some("MX"));
    }

    #[test]
    fn test_users_drop_incomplete_after_dedup() {
        // The first u1 row is the one kept, and it is incomplete
        let raw = RawTable::from_strs(
            &["user_id", "country"],
            &[&["u1", ""], &["u1", "BR"], &["u2", "US"]],
        );
        let cleaned = clean_users(&raw).unwrap();

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.rows[0][0].as_deref(), Some("u2"));
    }

    #[test]
    fn test_users_missing_key_column() {
        let raw = RawTable::from_strs(&["id"], &[&["1"]]);
        let err = clean_users(&raw).unwrap_err();
        assert!(matches!(err, CleanError::MissingColumn { column, .. } if column == "user_id"));
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let raw = RawTable::from_strs(
            &["user_id", "country"],
            &[&["u1", "MX"], &["u1", "MX"], &["u2", ""], &["u3", "US"]],
        );
        let once = clean_users(&raw).unwrap();
        let twice = clean_users(&once).unwrap();
        assert_eq!(once, twice);

        let rows = drop_duplicate_rows(&raw);
        assert_eq!(drop_duplicate_rows(&rows), rows);
        let complete = drop_incomplete_rows(&raw);
        assert_eq!(drop_incomplete_rows(&complete), complete);
    }

    #[test]
    fn test_deposits_dedup_and_missing_amount() {
        let raw = deposits_table(&[
            &["1", "2023-01-01T00:00:00Z", "u1", "100.0", "USD", "complete"],
            &["1", "2023-01-01T00:00:00Z", "u1", "100.0", "USD", "complete"],
            &["2", "2023-01-02T00:00:00Z", "u1", "", "USD", "complete"],
            &["3", "2023-01-03 10:00:00+00:00", "", "5", "", "pending"],
        ]);
        let deposits = clean_deposits(&raw).unwrap();

        assert_eq!(deposits.len(), 2);
        assert_eq!(deposits[0].id, 1);
        assert_eq!(deposits[0].amount, Decimal::new(1000, 1));
        // other gaps are tolerated
        assert_eq!(deposits[1].user_id, None);
        assert_eq!(deposits[1].currency, None);
        assert_eq!(deposits[1].tx_status.as_deref(), Some("pending"));
    }

    #[test]
    fn test_deposits_mixed_formats_normalized_to_utc() {
        let raw = deposits_table(&[
            &["1", "2023-01-01T23:30:00-02:00", "u1", "1", "USD", "complete"],
            &["2", "2023-01-01 08:00:00", "u1", "1", "USD", "complete"],
        ]);
        let deposits = clean_deposits(&raw).unwrap();

        let expected_first = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        assert_eq!(deposits[0].event_timestamp, expected_first);
        assert_eq!(deposits[1].event_timestamp.date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }

    #[test]
    fn test_unparsable_timestamp_aborts() {
        let raw = deposits_table(&[&["1", "not a date", "u1", "1", "USD", "complete"]]);
        let err = clean_deposits(&raw).unwrap_err();
        assert!(matches!(err, CleanError::Timestamp { table: "deposits", row: 0, .. }));
    }

    #[test]
    fn test_invalid_amount_aborts() {
        let raw = deposits_table(&[&["1", "2023-01-01", "u1", "ten", "USD", "complete"]]);
        let err = clean_deposits(&raw).unwrap_err();
        assert!(matches!(err, CleanError::InvalidValue { column: "amount", .. }));
    }

    #[test]
    fn test_float_rendered_id_accepted() {
        assert_eq!(parse_id("12"), Some(12));
        assert_eq!(parse_id("12.0"), Some(12));
        assert_eq!(parse_id("12.5"), None);
        assert_eq!(parse_amount("1e3"), Some(Decimal::new(1000, 0)));
    }

    #[test]
    fn test_withdrawals_require_interface() {
        let raw = deposits_table(&[&["1", "2023-01-01", "u1", "1", "USD", "complete"]]);
        let err = clean_withdrawals(&raw).unwrap_err();
        assert!(matches!(err, CleanError::MissingColumn { column, .. } if column == "interface"));
    }

    #[test]
    fn test_withdrawals_keep_interface() {
        let raw = RawTable::from_strs(
            &["id", "event_timestamp", "user_id", "amount", "interface", "currency", "tx_status"],
            &[&["9", "2023-01-01", "u1", "50", "app", "USD", "complete"]],
        );
        let withdrawals = clean_withdrawals(&raw).unwrap();
        assert_eq!(withdrawals[0].interface.as_deref(), Some("app"));
    }

    #[test]
    fn test_events_drop_incomplete_and_parse_strict() {
        let raw = RawTable::from_strs(
            &["id", "event_timestamp", "user_id", "event_name"],
            &[
                &["1", "2023-01-01T00:00:00Z", "u1", "login"],
                &["1", "2023-01-01T00:00:00Z", "u1", "login"],
                &["2", "2023-01-02T00:00:00Z", "", "login"],
                &["3", "2023-01-04T06:00:00Z", "u2", "logout"],
            ],
        );
        let events = clean_events(&raw).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].id, "3");
        assert_eq!(events[1].event_name, "logout");
    }

    #[test]
    fn test_events_reject_format_switch() {
        let raw = RawTable::from_strs(
            &["id", "event_timestamp", "user_id", "event_name"],
            &[
                &["1", "2023-01-01T00:00:00Z", "u1", "login"],
                &["2", "2023-01-02 00:00:00", "u1", "login"],
            ],
        );
        let err = clean_events(&raw).unwrap_err();
        assert!(matches!(err, CleanError::Timestamp { table: "events", row: 1, .. }));
    }

    #[test]
    fn test_deposits_dedup_compares_typed_amounts() {
        let raw = deposits_table(&[
            &["1", "2023-01-01T00:00:00Z", "u1", "100", "USD", "complete"],
            &["1", "2023-01-01T00:00:00Z", "u1", "100.0", "USD", "complete"],
            &["1.0", "2023-01-01T00:00:00Z", "u1", "1e2", "USD", "complete"],
            &["1", "2023-01-01T00:00:00Z", "u1", "100", "MXN", "complete"],
        ]);
        let deposits = clean_deposits(&raw).unwrap();

        assert_eq!(deposits.len(), 2);
        // first occurrence keeps its own scale
        assert_eq!(deposits[0].amount.to_string(), "100");
        assert_eq!(deposits[1].currency.as_deref(), Some("MXN"));
    }

    #[test]
    fn test_errors_report_source_row() {
        let raw = deposits_table(&[
            &["1", "2023-01-01T00:00:00Z", "u1", "10", "USD", "complete"],
            &["1", "2023-01-01T00:00:00Z", "u1", "10", "USD", "complete"],
            &["2", "2023-01-02T00:00:00Z", "u1", "", "USD", "complete"],
            &["3", "garbage", "u1", "10", "USD", "complete"],
        ]);
        let err = clean_deposits(&raw).unwrap_err();
        assert!(matches!(
            err,
            CleanError::Timestamp { table: "deposits", row: 3, ref value, .. } if value == "garbage"
        ));

        let raw = deposits_table(&[
            &["", "2023-01-01T00:00:00Z", "u1", "", "USD", "complete"],
            &["x", "2023-01-01T00:00:00Z", "u1", "10", "USD", "complete"],
        ]);
        let err = clean_deposits(&raw).unwrap_err();
        assert!(matches!(err, CleanError::InvalidValue { row: 1, column: "id", .. }));

        let raw = RawTable::from_strs(
            &["id", "event_timestamp", "user_id", "event_name"],
            &[
                &["1", "2023-01-01T00:00:00Z", "u1", "login"],
                &["1", "2023-01-01T00:00:00Z", "u1", "login"],
                &["2", "2023-01-02T00:00:00Z", "", "login"],
                &["3", "2023-01-03 00:00:00", "u1", "login"],
            ],
        );
        let err = clean_events(&raw).unwrap_err();
        assert!(matches!(err, CleanError::Timestamp { table: "events", row: 3, .. }));
    }

    #[test]
    fn test_transaction_and_event_cleaning_is_idempotent() {
        let raw = deposits_table(&[
            &["1", "2023-01-01T23:30:00-02:00", "u1", "100", "USD", "complete"],
            &["1", "2023-01-01T23:30:00-02:00", "u1", "100.00", "USD", "complete"],
            &["2", "2023-01-02 08:00:00 UTC", "", "7.5", "", "pending"],
            &["3", "2023-01-03", "u2", "", "USD", "complete"],
        ]);
        let once = clean_deposits(&raw).unwrap();
        let twice = clean_deposits(&deposits_as_raw(&once)).unwrap();
        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);

        let headers = &["id", "event_timestamp", "user_id", "event_name"];
        let raw = RawTable::from_strs(
            headers,
            &[
                &["1", "2023-01-01 00:00:00", "u1", "login"],
                &["1", "2023-01-01 00:00:00", "u1", "login"],
                &["2", "2023-01-02 12:00:00", "u2", ""],
                &["3", "2023-01-02 13:00:00", "u2", "logout"],
            ],
        );
        let once = clean_events(&raw).unwrap();
        let rendered: Vec<Vec<String>> = once
            .iter()
            .map(|ev| {
                vec![
                    ev.id.clone(),
                    format_timestamp(&ev.event_timestamp),
                    ev.user_id.clone(),
                    ev.event_name.clone(),
                ]
            })
            .collect();
        let rows: Vec<Vec<&str>> = rendered
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect();
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        let twice = clean_events(&RawTable::from_strs(headers, &rows)).unwrap();
        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
    }
}
