//! Attach Dates-dimension surrogate ids to timestamped records.

use tracing::warn;

use super::dates::DateDimension;
use crate::models::{Dated, Timestamped};

/// Pair every record with the id of its calendar date.
///
/// A date missing from `dimension` yields `date_id: None`; the lookup
/// never fails. Row order is preserved.
pub fn map_date_ids<T>(records: &[T], dimension: &DateDimension) -> Vec<Dated<T>>
where
    T: Timestamped + Clone,
{
    let dated: Vec<Dated<T>> = records
        .iter()
        .map(|record| Dated {
            date_id: dimension.lookup(record.calendar_date()),
            record: record.clone(),
        })
        .collect();

    let unresolved = unresolved_count(&dated);
    if unresolved > 0 {
        warn!(unresolved, total = dated.len(), "Records with no matching DateID");
    }
    dated
}

/// How many records did not resolve to a DateID.
pub fn unresolved_count<T>(dated: &[Dated<T>]) -> usize {
    dated.iter().filter(|d| !d.is_resolved()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateId;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn lookup_table() -> DateDimension {
        DateDimension::from_assignments([
            (date("2023-01-01"), DateId(1)),
            (date("2023-01-02"), DateId(2)),
        ])
        .unwrap()
    }

    #[test]
    fn test_maps_in_row_order() {
        let records = vec![ts("2023-01-01 00:00:00"), ts("2023-01-02 00:00:00")];
        let dated = map_date_ids(&records, &lookup_table());

        let ids: Vec<Option<DateId>> = dated.iter().map(|d| d.date_id).collect();
        assert_eq!(ids, vec![Some(DateId(1)), Some(DateId(2))]);
    }

    #[test]
    fn test_time_of_day_ignored() {
        let records = vec![ts("2023-01-02 23:59:59"), ts("2023-01-01 12:00:00")];
        let dated = map_date_ids(&records, &lookup_table());

        assert_eq!(dated[0].date_id, Some(DateId(2)));
        assert_eq!(dated[1].date_id, Some(DateId(1)));
        assert_eq!(dated[0].record, records[0]);
    }

    #[test]
    fn test_missing_date_is_unresolved_not_error() {
        let records = vec![ts("2023-01-01 08:00:00"), ts("2024-06-30 08:00:00")];
        let dated = map_date_ids(&records, &lookup_table());

        assert_eq!(dated.len(), 2);
        assert_eq!(dated[1].date_id, None);
        assert_eq!(unresolved_count(&dated), 1);
    }
}
