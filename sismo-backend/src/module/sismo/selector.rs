///! Newest-event selection

use chrono::{Datelike, NaiveDateTime};

use super::EventRecord;

/// Accepted `date time` layouts. The listing publishes day-first dates;
/// ISO dates show up in fixtures and older snapshots.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Combine a record's date and time into a comparable timestamp.
///
/// Text that matches none of [`TIMESTAMP_FORMATS`] maps to
/// [`NaiveDateTime::MIN`], so an unparseable row sorts after every parseable
/// one instead of aborting the cycle. `%Y` alone would read `01/02/24` as
/// year 24, so years below 1000 are treated as unparseable too.
pub fn event_timestamp(record: &EventRecord) -> NaiveDateTime {
    let combined = format!("{} {}", record.date.trim(), record.time.trim());
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
        .filter(|ts| ts.year() >= 1000)
        .unwrap_or(NaiveDateTime::MIN)
}

/// Return the most recent record, or `None` for an empty slice.
///
/// Equal timestamps resolve to the record that appears first in `records`.
pub fn select_latest(records: &[EventRecord]) -> Option<&EventRecord> {
    let mut latest: Option<(&EventRecord, NaiveDateTime)> = None;

    for record in records {
        let ts = event_timestamp(record);
        match latest {
            Some((_, best)) if ts <= best => {}
            _ => latest = Some((record, ts)),
        }
    }

    latest.map(|(record, _)| record)
}
