use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use super::domain::DateRange;

/// Month-name alternation used by the commissioning-period vocabulary.
const MONTH_NAMES: &str =
    "Januar|Februar|März|April|Mai|Juni|Juli|August|September|Oktober|November|Dezember";

type Extractor = fn(&Captures<'_>) -> Option<DateRange>;

/// Ordered recognizer table for the commissioning-period vocabulary. The
/// order is part of the contract: an ambiguous cell must keep resolving to
/// the same family it always has, so entries must not be reordered.
static RECOGNIZERS: LazyLock<Vec<(Regex, Extractor)>> = LazyLock::new(|| {
    let pattern = |raw: &str| {
        let expanded = raw.replace("MONAT", MONTH_NAMES);
        Regex::new(&format!("(?i)^{expanded}$")).expect("valid period pattern")
    };

    vec![
        (pattern(r"bis\s+Ende\s+(\d{4})"), until_end_of_year as Extractor),
        (pattern(r"(?:im\s+Jahr\s+)?(\d{4})"), whole_year),
        (
            pattern(r"(MONAT)\s*(?:bis|-|–)\s*(MONAT)\s+(\d{4})"),
            month_span,
        ),
        (
            pattern(r"ab\s+(?:(MONAT)\s+|(\d{1,2})\s*/\s*)(\d{4})"),
            from_month_onward,
        ),
        (
            pattern(r"ab\s+(\d{1,2})\.(\d{1,2})\.(\d{4})"),
            from_date_onward,
        ),
        (
            pattern(r"(?:(MONAT)\s+|(\d{1,2})\s*/\s*)(\d{4})"),
            single_month,
        ),
        (
            pattern(r"Modernisierung\s+(?:im\s+Jahr\s+)?(\d{4})"),
            whole_year,
        ),
        (
            pattern(r"Modernisierung\s+(MONAT)\s*(?:bis|-|–)\s*(MONAT)\s+(\d{4})"),
            month_span,
        ),
        (
            pattern(r"(\d{1,2})\.(\d{1,2})\.\s*bis\s*(\d{1,2})\.(\d{1,2})\.(\d{4})"),
            same_year_span,
        ),
        (
            pattern(r"(\d{1,2})\.(\d{1,2})\.(\d{4})\s*bis\s*(\d{1,2})\.(\d{1,2})\.(\d{4})"),
            cross_year_span,
        ),
        (
            pattern(r"(\d{1,2})\.(\d{1,2})\.\s*[-–]\s*(\d{1,2})\.(\d{1,2})\.(\d{4})"),
            same_year_span,
        ),
    ]
});

/// Parse a free-text commissioning-period description into a normalized
/// range. Returns `None` for vocabulary the recognizers do not cover;
/// callers log and continue, they never fail the row.
pub fn parse(text: &str) -> Option<DateRange> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    for (regex, extract) in RECOGNIZERS.iter() {
        if let Some(captures) = regex.captures(trimmed) {
            if let Some(range) = extract(&captures) {
                if range.to.is_some_and(|to| to < range.from) {
                    return None;
                }
                return Some(range);
            }
        }
    }

    None
}

/// Sentinel start for periods with no known beginning ("bis Ende ...").
pub fn epoch_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).expect("valid epoch date")
}

fn until_end_of_year(captures: &Captures<'_>) -> Option<DateRange> {
    let year = captures[1].parse().ok()?;
    Some(DateRange::closed(
        epoch_start(),
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

fn whole_year(captures: &Captures<'_>) -> Option<DateRange> {
    let year = captures[1].parse().ok()?;
    Some(DateRange::closed(
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

fn month_span(captures: &Captures<'_>) -> Option<DateRange> {
    let start_month = month_number(&captures[1])?;
    let end_month = month_number(&captures[2])?;
    let year = captures[3].parse().ok()?;
    Some(DateRange::closed(
        NaiveDate::from_ymd_opt(year, start_month, 1)?,
        last_day_of_month(year, end_month)?,
    ))
}

fn from_month_onward(captures: &Captures<'_>) -> Option<DateRange> {
    let month = captured_month(captures, 1, 2)?;
    let year = captures[3].parse().ok()?;
    Some(DateRange::open(NaiveDate::from_ymd_opt(year, month, 1)?))
}

fn from_date_onward(captures: &Captures<'_>) -> Option<DateRange> {
    let day = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let year = captures[3].parse().ok()?;
    Some(DateRange::open(NaiveDate::from_ymd_opt(year, month, day)?))
}

fn single_month(captures: &Captures<'_>) -> Option<DateRange> {
    let month = captured_month(captures, 1, 2)?;
    let year = captures[3].parse().ok()?;
    Some(DateRange::closed(
        NaiveDate::from_ymd_opt(year, month, 1)?,
        last_day_of_month(year, month)?,
    ))
}

fn same_year_span(captures: &Captures<'_>) -> Option<DateRange> {
    // Short form: the leading date borrows the year of the trailing one.
    let from_day = captures[1].parse().ok()?;
    let from_month = captures[2].parse().ok()?;
    let to_day = captures[3].parse().ok()?;
    let to_month = captures[4].parse().ok()?;
    let year = captures[5].parse().ok()?;
    Some(DateRange::closed(
        NaiveDate::from_ymd_opt(year, from_month, from_day)?,
        NaiveDate::from_ymd_opt(year, to_month, to_day)?,
    ))
}

fn cross_year_span(captures: &Captures<'_>) -> Option<DateRange> {
    let from = NaiveDate::from_ymd_opt(
        captures[3].parse().ok()?,
        captures[2].parse().ok()?,
        captures[1].parse().ok()?,
    )?;
    let to = NaiveDate::from_ymd_opt(
        captures[6].parse().ok()?,
        captures[5].parse().ok()?,
        captures[4].parse().ok()?,
    )?;
    Some(DateRange::closed(from, to))
}

/// Resolve a month captured either as a German name or as a numeric `MM/`.
fn captured_month(captures: &Captures<'_>, name_group: usize, numeric_group: usize) -> Option<u32> {
    if let Some(name) = captures.get(name_group) {
        return month_number(name.as_str());
    }
    captures.get(numeric_group)?.as_str().parse().ok()
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "januar" => 1,
        "februar" => 2,
        "märz" => 3,
        "april" => 4,
        "mai" => 5,
        "juni" => 6,
        "juli" => 7,
        "august" => 8,
        "september" => 9,
        "oktober" => 10,
        "november" => 11,
        "dezember" => 12,
        _ => return None,
    };
    Some(month)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn until_end_of_year_starts_at_epoch() {
        let range = parse("bis Ende 2001").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(1900, 1, 1), ymd(2001, 12, 31)));
    }

    #[test]
    fn whole_year_covers_january_through_december() {
        let expected = DateRange::closed(ymd(2004, 1, 1), ymd(2004, 12, 31));
        assert_eq!(parse("im Jahr 2004"), Some(expected));
        assert_eq!(parse("2004"), Some(expected));
    }

    #[test]
    fn month_span_ends_on_actual_last_day() {
        let range = parse("Januar bis März 2004").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2004, 1, 1), ymd(2004, 3, 31)));

        let range = parse("April - Juni 2011").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2011, 4, 1), ymd(2011, 6, 30)));
    }

    #[test]
    fn from_month_onward_is_open_ended() {
        let range = parse("ab Juli 2004").expect("parses");
        assert_eq!(range, DateRange::open(ymd(2004, 7, 1)));

        let range = parse("ab 07/2004").expect("parses");
        assert_eq!(range, DateRange::open(ymd(2004, 7, 1)));
    }

    #[test]
    fn from_specific_date_onward_is_open_ended() {
        let range = parse("ab 25.07.2017").expect("parses");
        assert_eq!(range, DateRange::open(ymd(2017, 7, 25)));
    }

    #[test]
    fn single_month_spans_that_month_only() {
        let range = parse("Juli 2004").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2004, 7, 1), ymd(2004, 7, 31)));

        let range = parse("09/2010").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2010, 9, 1), ymd(2010, 9, 30)));
    }

    #[test]
    fn february_respects_leap_years() {
        let leap = parse("Februar 2004").expect("parses");
        assert_eq!(leap.to, Some(ymd(2004, 2, 29)));

        let common = parse("Februar 2005").expect("parses");
        assert_eq!(common.to, Some(ymd(2005, 2, 28)));
    }

    #[test]
    fn modernization_variants_mirror_year_and_month_span() {
        let range = parse("Modernisierung im Jahr 2004").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2004, 1, 1), ymd(2004, 12, 31)));

        let range = parse("Modernisierung 2009").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2009, 1, 1), ymd(2009, 12, 31)));

        let range = parse("Modernisierung Januar bis März 2004").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2004, 1, 1), ymd(2004, 3, 31)));
    }

    #[test]
    fn same_year_span_infers_year_from_trailing_date() {
        let range = parse("01.04. bis 31.07.2004").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2004, 4, 1), ymd(2004, 7, 31)));

        let range = parse("01.04. - 31.07.2004").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2004, 4, 1), ymd(2004, 7, 31)));
    }

    #[test]
    fn cross_year_span_uses_both_explicit_years() {
        let range = parse("01.11.2004 bis 31.01.2005").expect("parses");
        assert_eq!(range, DateRange::closed(ymd(2004, 11, 1), ymd(2005, 1, 31)));
    }

    #[test]
    fn rejects_unrecognized_vocabulary() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("keine Angabe"), None);
        assert_eq!(parse("seit jeher"), None);
    }

    #[test]
    fn rejects_impossible_and_inverted_dates() {
        assert_eq!(parse("ab 32.01.2004"), None);
        assert_eq!(parse("31.12.2005 bis 01.01.2004"), None);
    }
}
