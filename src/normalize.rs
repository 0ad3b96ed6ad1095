// 🧹 Text Normalizer
// Pure helpers shared by the matcher, filters and aggregations

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Trim surrounding whitespace and lowercase.
pub fn normalize_text(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Keep only ASCII decimal digits ("111-11-11111" → "11111111111").
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse a closure date leniently.
///
/// Spreadsheet exports carry dates in a handful of shapes, sometimes with a
/// trailing time component. Anything unrecognised becomes `None` rather
/// than an error.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  A상사 "), "a상사");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("111-11-11111"), "11111111111");
        assert_eq!(digits_only("800101-1234567"), "8001011234567");
        assert_eq!(digits_only("홍길동"), "");
        assert_eq!(digits_only(""), "");
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 3, 1);
        assert_eq!(parse_date("2020-03-01"), expected);
        assert_eq!(parse_date("2020/03/01"), expected);
        assert_eq!(parse_date("2020.03.01"), expected);
        assert_eq!(parse_date("20200301"), expected);
        assert_eq!(parse_date("03/01/2020"), expected);
        assert_eq!(parse_date("2020-03-01 00:00:00"), expected);
        assert_eq!(parse_date(" 2020-03-01 "), expected);
    }

    #[test]
    fn test_parse_date_garbage_is_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("nan"), None);
        assert_eq!(parse_date("2020-13-45"), None);
        assert_eq!(parse_date("폐업"), None);
    }
}
