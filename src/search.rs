// 🔎 Record Matcher - multi-term substring search over a record
// Text terms hit the normalized text haystack; digit terms also hit the
// hyphen-free identifier haystack, so "111-11-11111" and "11111111111" agree.

use crate::normalize::{digits_only, normalize_text};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// MATCH MODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every term must be present (AND)
    #[default]
    All,
    /// At least one term must be present (OR)
    Any,
}

impl MatchMode {
    pub fn toggle(self) -> Self {
        match self {
            MatchMode::All => MatchMode::Any,
            MatchMode::Any => MatchMode::All,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            MatchMode::All => "ALL (AND)",
            MatchMode::Any => "ANY (OR)",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::All => write!(f, "all"),
            MatchMode::Any => write!(f, "any"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "and" => Ok(MatchMode::All),
            "any" | "or" => Ok(MatchMode::Any),
            other => Err(format!("unknown match mode: {other} (expected all|any)")),
        }
    }
}

// ============================================================================
// QUERY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub terms: Vec<String>,
    pub mode: MatchMode,
}

impl Query {
    /// Split free text into whitespace-delimited terms.
    pub fn parse(text: &str, mode: MatchMode) -> Self {
        Query {
            terms: text.split_whitespace().map(str::to_string).collect(),
            mode,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.matcher().matches(record)
    }

    /// Prepare the terms once for matching many records.
    pub fn matcher(&self) -> Matcher {
        Matcher::new(&self.terms, self.mode)
    }
}

// ============================================================================
// MATCHER
// ============================================================================

/// One normalized search term.
#[derive(Debug, Clone)]
struct Term {
    text: String,
    /// Only set for letter-free terms; a term with letters never matches on digits alone
    digits: Option<String>,
}

impl Term {
    fn new(raw: &str) -> Option<Self> {
        // Pure punctuation never matches anything
        if !raw.chars().any(char::is_alphanumeric) {
            return None;
        }

        let text = normalize_text(raw);
        let digits = if raw.chars().any(char::is_alphabetic) {
            None
        } else {
            Some(digits_only(raw)).filter(|d| !d.is_empty())
        };

        Some(Term { text, digits })
    }

    fn present_in(&self, text_hay: &str, digit_hay: &str) -> bool {
        if !self.text.is_empty() && text_hay.contains(&self.text) {
            return true;
        }
        match &self.digits {
            Some(d) => digit_hay.contains(d.as_str()),
            None => false,
        }
    }
}

/// Terms normalized up front, reused for every record of a scan.
#[derive(Debug, Clone)]
pub struct Matcher {
    /// `None` marks a term that can never match
    terms: Vec<Option<Term>>,
    mode: MatchMode,
}

impl Matcher {
    pub fn new<S: AsRef<str>>(terms: &[S], mode: MatchMode) -> Self {
        Matcher {
            terms: terms.iter().map(|t| Term::new(t.as_ref())).collect(),
            mode,
        }
    }

    /// An empty term list never matches.
    pub fn matches(&self, record: &Record) -> bool {
        if self.terms.is_empty() {
            return false;
        }

        let text_hay = record.text_haystack();
        let digit_hay = record.digit_haystack();

        let mut present = self.terms.iter().map(|term| {
            term.as_ref()
                .map(|t| t.present_in(&text_hay, &digit_hay))
                .unwrap_or(false)
        });

        match self.mode {
            MatchMode::All => present.all(|p| p),
            MatchMode::Any => present.any(|p| p),
        }
    }
}

/// Decide whether one record matches `terms` under `mode`.
///
/// An empty term list never matches.
pub fn matches<S: AsRef<str>>(record: &Record, terms: &[S], mode: MatchMode) -> bool {
    Matcher::new(terms, mode).matches(record)
}

// ============================================================================
// SEARCH OUTCOME
// ============================================================================

/// Result of the search view; empty results carry why they are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Nothing was typed; the view stays empty until input arrives
    NoQuery,
    /// A query was given but no record matched
    NoMatches,
    Matches(Vec<Record>),
}

impl SearchOutcome {
    pub fn records(&self) -> &[Record] {
        match self {
            SearchOutcome::Matches(records) => records,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Advisory shown next to an empty view.
    pub fn advisory(&self) -> Option<&'static str> {
        match self {
            SearchOutcome::NoQuery => Some("Enter a name, owner, registration or national id to search."),
            SearchOutcome::NoMatches => {
                Some("No results. Check the spelling, or try the id with/without hyphens (-).")
            }
            SearchOutcome::Matches(_) => None,
        }
    }
}

/// Run a query over the table, preserving source order.
pub fn search(records: &[Record], query: &Query) -> SearchOutcome {
    if query.is_empty() {
        return SearchOutcome::NoQuery;
    }

    let matcher = query.matcher();
    let hits: Vec<Record> = records.iter().filter(|r| matcher.matches(r)).cloned().collect();
    tracing::debug!(terms = query.terms.len(), mode = %query.mode, hits = hits.len(), "search");

    if hits.is_empty() {
        SearchOutcome::NoMatches
    } else {
        SearchOutcome::Matches(hits)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_records;
    use proptest::prelude::*;

    fn hong() -> Record {
        Record::new("A상사", "111-11-11111", "홍길동", "800101-1234567", "계속사업자", "")
    }

    fn acme() -> Record {
        Record::new("Acme Trading", "222-22-22222", "Kim Cheolsu", "820202-2345678", "폐업", "2020-03-01")
    }

    #[test]
    fn test_hyphen_insensitive_registration_id() {
        let r = hong();
        assert!(matches(&r, &["11111111111"], MatchMode::All));
        assert!(matches(&r, &["111-11-11111"], MatchMode::All));
        assert!(matches(&r, &["1111111"], MatchMode::All));
    }

    #[test]
    fn test_hyphen_insensitive_national_id() {
        let r = hong();
        assert!(matches(&r, &["8001011234567"], MatchMode::All));
        assert!(matches(&r, &["800101-1234567"], MatchMode::All));
    }

    #[test]
    fn test_digits_cannot_straddle_identifiers() {
        // end of registration id + start of national id
        let r = hong();
        assert!(!matches(&r, &["1118001"], MatchMode::All));
    }

    #[test]
    fn test_letters_never_match_on_digits_alone() {
        let r = hong();
        // "x11111111111" is not a text substring, and its digits must not be used
        assert!(!matches(&r, &["x11111111111"], MatchMode::All));
    }

    #[test]
    fn test_case_insensitive() {
        let r = hong();
        assert!(matches(&r, &["a상사"], MatchMode::All));
        assert!(matches(&r, &["A상사"], MatchMode::All));

        let r = acme();
        assert!(matches(&r, &["ACME"], MatchMode::All));
        assert!(matches(&r, &["trading"], MatchMode::All));
        assert!(matches(&r, &["kim"], MatchMode::All));
    }

    #[test]
    fn test_all_vs_any() {
        let r = hong();
        let terms = ["홍길동", "김철수"];
        assert!(!matches(&r, &terms, MatchMode::All));
        assert!(matches(&r, &terms, MatchMode::Any));
    }

    #[test]
    fn test_empty_terms_never_match() {
        let r = hong();
        let none: [&str; 0] = [];
        assert!(!matches(&r, &none, MatchMode::All));
        assert!(!matches(&r, &none, MatchMode::Any));
    }

    #[test]
    fn test_punctuation_only_term_never_matches() {
        let r = hong();
        assert!(!matches(&r, &["-"], MatchMode::Any));
        assert!(!matches(&r, &["--"], MatchMode::All));
        assert!(!matches(&r, &["-", "홍길동"], MatchMode::All));
        assert!(matches(&r, &["-", "홍길동"], MatchMode::Any));
    }

    #[test]
    fn test_status_is_not_searched() {
        let r = hong();
        assert!(!matches(&r, &["계속사업자"], MatchMode::All));
    }

    #[test]
    fn test_query_parse_splits_whitespace() {
        let q = Query::parse("  홍길동   111-11-11111\t800101 ", MatchMode::Any);
        assert_eq!(q.terms, vec!["홍길동", "111-11-11111", "800101"]);
        assert_eq!(q.mode, MatchMode::Any);
        assert!(Query::parse("   ", MatchMode::All).is_empty());
    }

    #[test]
    fn test_search_outcomes() {
        let table = vec![hong(), acme()];

        let outcome = search(&table, &Query::parse("", MatchMode::All));
        assert_eq!(outcome, SearchOutcome::NoQuery);
        assert!(outcome.advisory().is_some());

        let outcome = search(&table, &Query::parse("nobody", MatchMode::All));
        assert_eq!(outcome, SearchOutcome::NoMatches);
        assert!(outcome.advisory().is_some());

        let outcome = search(&table, &Query::parse("홍길동 acme", MatchMode::Any));
        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.records()[0].name, "A상사");
        assert_eq!(outcome.advisory(), None);
    }

    #[test]
    fn test_match_mode_from_str() {
        assert_eq!("ALL".parse::<MatchMode>(), Ok(MatchMode::All));
        assert_eq!("or".parse::<MatchMode>(), Ok(MatchMode::Any));
        assert!("xor".parse::<MatchMode>().is_err());
        assert_eq!(MatchMode::All.toggle(), MatchMode::Any);
    }

    proptest! {
        #[test]
        fn prop_single_term_mode_irrelevant(term in "\\PC{0,12}") {
            let r = hong();
            prop_assert_eq!(
                matches(&r, &[term.as_str()], MatchMode::Any),
                matches(&r, &[term.as_str()], MatchMode::All)
            );
        }

        #[test]
        fn prop_digit_term_ignores_hyphens(start in 0usize..11, len in 1usize..6) {
            let r = hong();
            let digits = "11111111111";
            let end = (start + len).min(digits.len());
            let term = &digits[start..end];
            let hyphenated: String = term.chars().flat_map(|c| [c, '-']).collect();
            prop_assert!(matches(&r, &[hyphenated.as_str()], MatchMode::All));
        }
    }

    #[test]
    fn test_matcher_agrees_with_per_record_matching() {
        let records = sample_records();
        for text in ["홍길동", "222-22", "b무역 김철수", "-- 333", "없음"] {
            for mode in [MatchMode::All, MatchMode::Any] {
                let query = Query::parse(text, mode);
                let matcher = query.matcher();
                for r in &records {
                    assert_eq!(matcher.matches(r), matches(r, &query.terms, mode), "{text} {mode}");
                }
            }
        }
    }
}
