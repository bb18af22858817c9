//! The Dates dimension.
//!
//! Built once per run from the distinct calendar dates of deposits,
//! withdrawals and events, in that concatenation order. Ids are dense and
//! start at 1. With [`KeyOrder::FirstSeen`] an id reflects where a date
//! first appeared, not where it falls on the calendar; order by
//! [`DateEntry::date`] when chronology matters.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::error::DimensionError;
use crate::models::{DateId, Event, Timestamped, Transaction};

/// How surrogate ids are assigned to distinct dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyOrder {
    /// Order of first appearance across deposits, withdrawals, events.
    #[default]
    FirstSeen,
    /// Calendar order.
    Chronological,
}

/// One row of the Dates dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateEntry {
    pub date_id: DateId,
    pub date: NaiveDate,
    /// Monday = 0 ... Sunday = 6.
    pub day_of_week: u32,
    pub month: u32,
    pub year: i32,
}

impl DateEntry {
    /// Derive the calendar attributes from the date.
    pub fn new(date_id: DateId, date: NaiveDate) -> Self {
        Self {
            date_id,
            date,
            day_of_week: date.weekday().num_days_from_monday(),
            month: date.month(),
            year: date.year(),
        }
    }
}

/// The Dates dimension and its date-to-id index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateDimension {
    entries: Vec<DateEntry>,
    index: HashMap<NaiveDate, DateId>,
}

impl DateDimension {
    /// Build the dimension from the three cleaned sources.
    pub fn build(
        deposits: &[Transaction],
        withdrawals: &[Transaction],
        events: &[Event],
        order: KeyOrder,
    ) -> Self {
        let dates = deposits
            .iter()
            .map(|d| d.calendar_date())
            .chain(withdrawals.iter().map(|w| w.calendar_date()))
            .chain(events.iter().map(|e| e.calendar_date()));

        let dimension = Self::from_dates(dates, order);
        info!(
            dates = dimension.len(),
            order = ?order,
            "Built Dates dimension"
        );
        dimension
    }

    /// Build from any date sequence: duplicates collapse onto the first
    /// occurrence, then ids 1..=N are assigned in `order`.
    pub fn from_dates<I>(dates: I, order: KeyOrder) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut seen = HashSet::new();
        let mut distinct: Vec<NaiveDate> = dates.into_iter().filter(|d| seen.insert(*d)).collect();

        if order == KeyOrder::Chronological {
            distinct.sort_unstable();
        }

        let entries: Vec<DateEntry> = distinct
            .into_iter()
            .zip(1u32..)
            .map(|(date, id)| DateEntry::new(DateId(id), date))
            .collect();
        let index = entries.iter().map(|e| (e.date, e.date_id)).collect();

        Self { entries, index }
    }

    /// Build a lookup from explicit date-to-id assignments.
    ///
    /// Ids need not be dense, but dates and ids must both be unique and
    /// ids start at 1.
    pub fn from_assignments<I>(pairs: I) -> Result<Self, DimensionError>
    where
        I: IntoIterator<Item = (NaiveDate, DateId)>,
    {
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        let mut ids = HashSet::new();

        for (date, id) in pairs {
            if id.get() == 0 {
                return Err(DimensionError::ZeroId);
            }
            if !ids.insert(id) {
                return Err(DimensionError::DuplicateId(id.get()));
            }
            if index.insert(date, id).is_some() {
                return Err(DimensionError::DuplicateDate(date));
            }
            entries.push(DateEntry::new(id, date));
        }

        Ok(Self { entries, index })
    }

    /// Entries in id-assignment order.
    pub fn entries(&self) -> &[DateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Surrogate id of a calendar date, if the date is in the dimension.
    pub fn lookup(&self, date: NaiveDate) -> Option<DateId> {
        self.index.get(&date).copied()
    }
}
