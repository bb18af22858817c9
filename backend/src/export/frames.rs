//! Build checked output frames from model values.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::schema::OutputTable;
use crate::error::{SchemaError, SchemaResult};
use crate::models::{Dated, Event, TransId, TransType, Transaction, TransactionFact};
use crate::parser::RawTable;
use crate::transform::dates::DateDimension;
use crate::transform::timestamp::format_timestamp;

/// A finished output table: contract-checked headers plus rendered cells.
/// `None` cells are written empty (CSV) or `null` (JSON).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFrame {
    table: OutputTable,
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl OutputFrame {
    /// Check `headers` against the table contract and every row's width.
    pub fn new(
        table: OutputTable,
        headers: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    ) -> SchemaResult<Self> {
        table.check_headers(&headers)?;
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != headers.len()) {
            return Err(SchemaError::RowWidth {
                table: table.stem(),
                row,
                expected: headers.len(),
                actual: cells.len(),
            });
        }
        Ok(Self {
            table,
            headers,
            rows,
        })
    }

    fn from_contract(table: OutputTable, rows: Vec<Vec<Option<String>>>) -> SchemaResult<Self> {
        let headers = table
            .columns()
            .unwrap_or_default()
            .iter()
            .map(|c| c.to_string())
            .collect();
        Self::new(table, headers, rows)
    }

    pub fn table(&self) -> OutputTable {
        self.table
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as header-keyed records, in column order, for JSON output.
    pub fn records(&self) -> impl Iterator<Item = FrameRecord<'_>> {
        self.rows.iter().map(move |cells| FrameRecord {
            headers: &self.headers,
            cells,
        })
    }
}

/// Borrowed view of one row that serializes as an ordered map.
pub struct FrameRecord<'a> {
    headers: &'a [String],
    cells: &'a [Option<String>],
}

impl Serialize for FrameRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (header, cell) in self.headers.iter().zip(self.cells) {
            map.serialize_entry(header, cell)?;
        }
        map.end()
    }
}

// =============================================================================
// Frame Builders
// =============================================================================

/// `transactions_vf`: TransID, DateID, user_id, amount, currency, TransType.
pub fn transactions_frame(facts: &[TransactionFact]) -> SchemaResult<OutputFrame> {
    let rows = facts
        .iter()
        .map(|f| {
            vec![
                Some(f.trans_id.to_string()),
                f.date_id.map(|id| id.to_string()),
                f.user_id.clone(),
                Some(f.amount.to_string()),
                f.currency.clone(),
                Some(f.trans_type.to_string()),
            ]
        })
        .collect();
    OutputFrame::from_contract(OutputTable::Transactions, rows)
}

/// `deposits_vf`: every cleaned deposit, completed or not.
pub fn deposits_frame(deposits: &[Transaction]) -> SchemaResult<OutputFrame> {
    let rows = deposits
        .iter()
        .map(|tx| {
            vec![
                Some(TransId::new(TransType::Deposit, tx.id).to_string()),
                tx.user_id.clone(),
                Some(format_timestamp(&tx.event_timestamp)),
                tx.tx_status.clone(),
            ]
        })
        .collect();
    OutputFrame::from_contract(OutputTable::Deposits, rows)
}

/// `withdrawals_vf`: every cleaned withdrawal, completed or not.
pub fn withdrawals_frame(withdrawals: &[Transaction]) -> SchemaResult<OutputFrame> {
    let rows = withdrawals
        .iter()
        .map(|tx| {
            vec![
                Some(TransId::new(TransType::Withdrawal, tx.id).to_string()),
                tx.user_id.clone(),
                Some(format_timestamp(&tx.event_timestamp)),
                tx.interface.clone(),
                tx.tx_status.clone(),
            ]
        })
        .collect();
    OutputFrame::from_contract(OutputTable::Withdrawals, rows)
}

/// `events_vf`: id, event_timestamp, user_id, event_name, DateID.
pub fn events_frame(events: &[Dated<Event>]) -> SchemaResult<OutputFrame> {
    let rows = events
        .iter()
        .map(|dated| {
            let ev = &dated.record;
            vec![
                Some(ev.id.clone()),
                Some(format_timestamp(&ev.event_timestamp)),
                Some(ev.user_id.clone()),
                Some(ev.event_name.clone()),
                dated.date_id.map(|id| id.to_string()),
            ]
        })
        .collect();
    OutputFrame::from_contract(OutputTable::Events, rows)
}

/// `users_vf`: the cleaned users table, columns and values unchanged.
pub fn users_frame(users: &RawTable) -> SchemaResult<OutputFrame> {
    OutputFrame::new(OutputTable::Users, users.headers.clone(), users.rows.clone())
}

/// `dates_vf`: DateID, Date, DayOfWeek, Month, Year.
pub fn dates_frame(dimension: &DateDimension) -> SchemaResult<OutputFrame> {
    let rows = dimension
        .entries()
        .iter()
        .map(|e| {
            vec![
                Some(e.date_id.to_string()),
                Some(e.date.format("%Y-%m-%d").to_string()),
                Some(e.day_of_week.to_string()),
                Some(e.month.to_string()),
                Some(e.year.to_string()),
            ]
        })
        .collect();
    OutputFrame::from_contract(OutputTable::Dates, rows)
}
