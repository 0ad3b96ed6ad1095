// 📇 Record - one row of the uploaded registration table
// Required fields are typed; every other uploaded column rides along in `extra`

use crate::normalize::{digits_only, normalize_text, parse_date};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Category assigned when no rule matches.
pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    // ========================================================================
    // REQUIRED FIELDS
    // ========================================================================
    pub name: String,
    pub registration_id: String,
    pub owner_name: String,
    pub national_id: String,
    pub status: String,

    // ========================================================================
    // CLOSURE DATE (optional column)
    // ========================================================================
    /// Cell text exactly as uploaded (trimmed); used for display and export
    #[serde(default)]
    pub closure_date_raw: String,

    /// Parsed closure date; `None` when blank or unparseable
    #[serde(default)]
    pub closure_date: Option<NaiveDate>,

    // ========================================================================
    // DERIVED + PASS-THROUGH
    // ========================================================================
    #[serde(default = "default_category")]
    pub category: String,

    /// Uploaded columns the core does not interpret, in source order
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        registration_id: impl Into<String>,
        owner_name: impl Into<String>,
        national_id: impl Into<String>,
        status: impl Into<String>,
        closure_date: impl Into<String>,
    ) -> Self {
        let closure_date_raw = closure_date.into().trim().to_string();
        Record {
            name: name.into(),
            registration_id: registration_id.into(),
            owner_name: owner_name.into(),
            national_id: national_id.into(),
            status: status.into(),
            closure_date: parse_date(&closure_date_raw),
            closure_date_raw,
            category: default_category(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((column.into(), value.into()));
        self
    }

    /// Normalized text blob searched by text terms.
    pub fn text_haystack(&self) -> String {
        [
            self.name.as_str(),
            self.owner_name.as_str(),
            self.registration_id.as_str(),
            self.national_id.as_str(),
        ]
        .iter()
        .map(|field| normalize_text(field))
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Digit-only identifiers, space separated so a term cannot straddle both.
    pub fn digit_haystack(&self) -> String {
        format!(
            "{} {}",
            digits_only(&self.registration_id),
            digits_only(&self.national_id)
        )
    }

    pub fn is_closed(&self, closed_status: &str) -> bool {
        self.status.trim() == closed_status.trim()
    }

    pub fn closure_year(&self) -> Option<i32> {
        self.closure_date.map(|d| d.year())
    }

    pub fn extra_value(&self, column: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new("A상사", "111-11-11111", "홍길동", "800101-1234567", "폐업", " 2020-03-01 ")
    }

    #[test]
    fn test_new_parses_closure_date() {
        let r = sample();
        assert_eq!(r.closure_date_raw, "2020-03-01");
        assert_eq!(r.closure_date, NaiveDate::from_ymd_opt(2020, 3, 1));
        assert_eq!(r.closure_year(), Some(2020));
        assert_eq!(r.category, UNCATEGORIZED);
    }

    #[test]
    fn test_unparseable_date_is_absent() {
        let r = Record::new("B", "1", "x", "2", "폐업", "someday");
        assert_eq!(r.closure_date, None);
        assert_eq!(r.closure_date_raw, "someday");
        assert_eq!(r.closure_year(), None);
    }

    #[test]
    fn test_haystacks() {
        let r = sample();
        assert_eq!(r.text_haystack(), "a상사 홍길동 111-11-11111 800101-1234567");
        assert_eq!(r.digit_haystack(), "11111111111 8001011234567");
    }

    #[test]
    fn test_is_closed_trims() {
        let r = Record::new("A", "1", "o", "2", " 폐업 ", "");
        assert!(r.is_closed("폐업"));
        assert!(!r.is_closed("계속사업자"));
    }

    #[test]
    fn test_extra_columns() {
        let r = sample().with_extra("업종", "도소매");
        assert_eq!(r.extra_value("업종"), Some("도소매"));
        assert_eq!(r.extra_value("주소"), None);
    }
}
