// 🧮 Table Filter - query, status, closure-date and category constraints
// Every active constraint is ANDed; the source table is never mutated.

use crate::record::Record;
use crate::search::{Matcher, Query};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Inclusive closure-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range; swapped bounds are put back in order.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            DateRange { start, end }
        } else {
            DateRange { start: end, end: start }
        }
    }

    /// Parse `START..END` (either side in any accepted date format).
    pub fn parse(text: &str) -> Option<Self> {
        let (start, end) = text.split_once("..")?;
        let start = crate::normalize::parse_date(start)?;
        let end = crate::normalize::parse_date(end)?;
        Some(DateRange::new(start, end))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Smallest range covering every parseable closure date, if any.
    pub fn spanning(records: &[Record]) -> Option<Self> {
        let mut dates = records.iter().filter_map(|r| r.closure_date);
        let first = dates.next()?;
        let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateRange::new(min, max))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    /// Applied only when it holds at least one term
    pub query: Option<Query>,

    /// `None` = any status
    pub status_allow: Option<BTreeSet<String>>,

    /// Applied within the status-filtered subset; undated records drop out
    pub date_range: Option<DateRange>,

    /// `None` = any category
    pub category_allow: Option<BTreeSet<String>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status_allow = Some(statuses.into_iter().map(|s| s.into().trim().to_string()).collect());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_allow = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn accepts(&self, record: &Record) -> bool {
        self.accepts_with(self.matcher().as_ref(), record)
    }

    /// Prepared query terms; a blank query is no constraint.
    fn matcher(&self) -> Option<Matcher> {
        self.query.as_ref().filter(|q| !q.is_empty()).map(Query::matcher)
    }

    fn accepts_with(&self, matcher: Option<&Matcher>, record: &Record) -> bool {
        if let Some(matcher) = matcher {
            if !matcher.matches(record) {
                return false;
            }
        }

        if let Some(allowed) = &self.status_allow {
            if !allowed.contains(record.status.trim()) {
                return false;
            }
        }

        if let Some(range) = &self.date_range {
            match record.closure_date {
                Some(date) if range.contains(date) => {}
                _ => return false,
            }
        }

        if let Some(allowed) = &self.category_allow {
            if !allowed.contains(&record.category) {
                return false;
            }
        }

        true
    }
}

/// Copy the records that pass every active constraint, in source order.
pub fn filter(records: &[Record], spec: &FilterSpec) -> Vec<Record> {
    let matcher = spec.matcher();
    let view: Vec<Record> = records
        .iter()
        .filter(|r| spec.accepts_with(matcher.as_ref(), r))
        .cloned()
        .collect();
    tracing::debug!(total = records.len(), kept = view.len(), "filter");
    view
}

/// Distinct statuses, sorted, for a status picker.
pub fn status_options(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.status.trim())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
