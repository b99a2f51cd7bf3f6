use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::domain::PowerRange;

const KILOWATTS_PER_MEGAWATT: f64 = 1000.0;

type Extractor = fn(&Captures<'_>) -> Option<PowerRange>;

/// Ordered recognizer table for the power-criteria vocabulary. Values are
/// normalized to kilowatts; the mixed-unit form must be tried before the
/// single-unit ranges so its trailing "MW" is not claimed by them.
static RECOGNIZERS: LazyLock<Vec<(Regex, Extractor)>> = LazyLock::new(|| {
    let pattern = |raw: &str| Regex::new(&format!("(?i)^{raw}$")).expect("valid power pattern");

    vec![
        (
            pattern(r"([\d.]+)\s*kW\s*(?:-|bis|–)\s*([\d.]+)\s*MW"),
            mixed_unit_span as Extractor,
        ),
        (
            pattern(r"([\d.]+)\s*(?:-|bis|–)\s*([\d.]+)\s*MW"),
            megawatt_span,
        ),
        (
            pattern(r"([\d.]+)\s*(?:-|bis|–)\s*([\d.]+)\s*kW"),
            kilowatt_span,
        ),
        (pattern(r">\s*([\d.]+)\s*(kW|MW)"), above_threshold),
        (pattern(r"(?:≤|<=)\s*([\d.]+)\s*(kW|MW)"), up_to_threshold),
    ]
});

/// Parse a free-text power-criteria description into a normalized kilowatt
/// range. Bare numbers carry no decidable meaning (exact value or ceiling)
/// and return `None` rather than guessing.
pub fn parse(text: &str) -> Option<PowerRange> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }

    for (regex, extract) in RECOGNIZERS.iter() {
        if let Some(captures) = regex.captures(&normalized) {
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

fn mixed_unit_span(captures: &Captures<'_>) -> Option<PowerRange> {
    let from: f64 = captures[1].parse().ok()?;
    let to: f64 = captures[2].parse().ok()?;
    Some(PowerRange::bounded(from, to * KILOWATTS_PER_MEGAWATT))
}

fn megawatt_span(captures: &Captures<'_>) -> Option<PowerRange> {
    let from: f64 = captures[1].parse().ok()?;
    let to: f64 = captures[2].parse().ok()?;
    Some(PowerRange::bounded(
        from * KILOWATTS_PER_MEGAWATT,
        to * KILOWATTS_PER_MEGAWATT,
    ))
}

fn kilowatt_span(captures: &Captures<'_>) -> Option<PowerRange> {
    let from = captures[1].parse().ok()?;
    let to = captures[2].parse().ok()?;
    Some(PowerRange::bounded(from, to))
}

fn above_threshold(captures: &Captures<'_>) -> Option<PowerRange> {
    let value: f64 = captures[1].parse().ok()?;
    Some(PowerRange::unbounded(in_kilowatts(value, &captures[2])))
}

fn up_to_threshold(captures: &Captures<'_>) -> Option<PowerRange> {
    let value: f64 = captures[1].parse().ok()?;
    Some(PowerRange::bounded(0.0, in_kilowatts(value, &captures[2])))
}

fn in_kilowatts(value: f64, unit: &str) -> f64 {
    if unit.eq_ignore_ascii_case("mw") {
        value * KILOWATTS_PER_MEGAWATT
    } else {
        value
    }
}
