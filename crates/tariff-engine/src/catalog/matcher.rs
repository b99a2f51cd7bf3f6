use chrono::{Duration, NaiveDate};

use super::domain::{DateRange, PowerRange};

/// How long an open-ended validity period keeps matching queries, measured
/// from its start. Newer categories supersede older open-ended ones in the
/// source data, so open-ended validity expires after exactly one year of
/// queried distance.
const OPEN_RANGE_VALIDITY_DAYS: i64 = 365;

/// Inclusive containment check for commissioning dates. Open-ended ranges
/// match everything at or after `from`; the staleness rule is applied by the
/// catalog filter, never here.
pub fn date_in_range(date: NaiveDate, range: &DateRange) -> bool {
    date >= range.from && range.to.map_or(true, |to| date <= to)
}

/// Inclusive containment check for power output in kilowatts.
pub fn power_in_range(power: f64, range: &PowerRange) -> bool {
    power >= range.from && range.to.map_or(true, |to| power <= to)
}

/// Staleness rule for open-ended date ranges only: the range stops applying
/// once the queried date lies more than [`OPEN_RANGE_VALIDITY_DAYS`] past
/// its start. Closed ranges are never stale.
pub fn open_range_is_stale(date: NaiveDate, range: &DateRange) -> bool {
    range.to.is_none()
        && date.signed_duration_since(range.from) > Duration::days(OPEN_RANGE_VALIDITY_DAYS)
}
