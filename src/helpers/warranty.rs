use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};

use crate::models::handover::ComponentRecord;

/// Average year length used for warranty periods; leap days are not tracked
/// individually.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Parses a form date value, returning `None` for blank or unparseable input.
///
/// Blank-on-failure is the policy here: a warranty start that is not known
/// yet is a normal state, not an error.
pub fn parse_date_or_blank(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.date()))
        .ok()
}

/// Whole days covered by a warranty of `years` years.
pub fn warranty_days(years: f64) -> i64 {
    (years * DAYS_PER_YEAR).floor() as i64
}

pub fn warranty_end_date(start: NaiveDate, years: f64) -> Option<NaiveDate> {
    TimeDelta::try_days(warranty_days(years)).and_then(|offset| start.checked_add_signed(offset))
}

/// Warranty end of a component as `YYYY-MM-DD`, or an empty string when the
/// start is missing or unparseable. A missing duration counts as zero years.
pub fn compute_warranty_end(record: &ComponentRecord) -> String {
    let years = record.warranty_duration_years.unwrap_or(0.0);

    parse_date_or_blank(&record.warranty_start)
        .and_then(|start| warranty_end_date(start, years))
        .map(|end| end.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start: &str, years: Option<f64>) -> ComponentRecord {
        ComponentRecord {
            warranty_start: start.to_string(),
            warranty_duration_years: years,
            ..Default::default()
        }
    }

    #[test]
    fn ten_years_is_3652_days() {
        assert_eq!(warranty_days(10.0), 3652);
        assert_eq!(compute_warranty_end(&record("2024-01-01", Some(10.0))), "2033-12-31");
    }

    #[test]
    fn end_matches_day_offset() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        for years in [0.0, 1.0, 2.5, 5.0, 12.0, 25.0] {
            let expected = start + TimeDelta::days((years * 365.25_f64).floor() as i64);
            assert_eq!(
                compute_warranty_end(&record("2020-01-01", Some(years))),
                expected.format("%Y-%m-%d").to_string()
            );
        }
        assert_eq!(compute_warranty_end(&record("2020-01-01", Some(5.0))), "2024-12-31");
    }

    #[test]
    fn blank_or_unparseable_start_yields_empty() {
        assert_eq!(compute_warranty_end(&record("", Some(5.0))), "");
        assert_eq!(compute_warranty_end(&record("   ", Some(5.0))), "");
        assert_eq!(compute_warranty_end(&record("demnächst", Some(5.0))), "");
        assert_eq!(compute_warranty_end(&record("2024-02-30", Some(5.0))), "");
    }

    #[test]
    fn missing_duration_counts_as_zero() {
        assert_eq!(compute_warranty_end(&record("2024-06-15", None)), "2024-06-15");
    }

    #[test]
    fn overflow_is_blank_not_panic() {
        assert_eq!(compute_warranty_end(&record("2024-01-01", Some(1.0e12))), "");
    }

    #[test]
    fn accepts_common_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_date_or_blank("2024-03-05"), expected);
        assert_eq!(parse_date_or_blank("2024/03/05"), expected);
        assert_eq!(parse_date_or_blank("05.03.2024"), expected);
        assert_eq!(parse_date_or_blank("2024-03-05T10:30:00"), expected);
        assert_eq!(parse_date_or_blank("2024-03-05T10:30:00.000+01:00"), expected);
        assert_eq!(parse_date_or_blank("2024-03-05 00:00:00"), expected);
    }
}
