// 🗂️ Session - the loaded table plus what the user is looking at
// Every dashboard view is a read-only method; uploads build a new session.

use crate::aggregate::{self, DuplicateGroup, DuplicateKey, YearCount};
use crate::config::Config;
use crate::error::{ExportError, LoadError, RuleError};
use crate::export;
use crate::filter::{self, DateRange, FilterSpec};
use crate::loader::{self, SourceEncoding};
use crate::record::{Record, UNCATEGORIZED};
use crate::rules::CategoryRules;
use crate::sample::sample_records;
use crate::search::{self, MatchMode, Query, SearchOutcome};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::slice;

/// Where the table came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum TableSource {
    Sample,
    Upload(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub closed: usize,
    /// Closed share of all rows, in percent (0.0 for an empty table)
    pub closed_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct Session {
    config: Config,
    records: Vec<Record>,
    source: TableSource,
    encoding: Option<SourceEncoding>,
    rules: CategoryRules,

    /// Current search text and mode
    pub query_text: String,
    pub mode: MatchMode,
}

impl Session {
    pub fn new(records: Vec<Record>, source: TableSource, config: Config) -> Self {
        let mode = config.default_mode;
        let mut session = Session {
            config,
            records,
            source,
            encoding: None,
            rules: CategoryRules::new(),
            query_text: String::new(),
            mode,
        };
        session.assign_categories();
        session
    }

    pub fn sample(config: Config) -> Self {
        Self::new(sample_records(), TableSource::Sample, config)
    }

    pub fn from_bytes(name: &str, bytes: &[u8], config: Config) -> Result<Self, LoadError> {
        let table = loader::load_bytes(bytes, &config.columns)?;
        let mut session = Self::new(table.records, TableSource::Upload(name.to_string()), config);
        session.encoding = Some(table.encoding);
        Ok(session)
    }

    pub fn from_path(path: &Path, config: Config) -> Result<Self, LoadError> {
        let table = loader::load_path(path, &config.columns)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        let mut session = Self::new(table.records, TableSource::Upload(name), config);
        session.encoding = Some(table.encoding);
        Ok(session)
    }

    /// Load the rules file named in the config, if any.
    pub fn load_configured_rules(&mut self) -> Result<(), RuleError> {
        if let Some(path) = self.config.rules_file.clone() {
            let rules = CategoryRules::from_file(&path)?;
            tracing::info!(rules = rules.rule_count(), path = %path.display(), "loaded category rules");
            self.set_rules(rules);
        }
        Ok(())
    }

    pub fn set_rules(&mut self, rules: CategoryRules) {
        self.rules = rules;
        self.assign_categories();
    }

    fn assign_categories(&mut self) {
        let column = self.config.category_column.clone();
        for record in &mut self.records {
            record.category = match &column {
                Some(col) => record
                    .extra_value(col)
                    .filter(|v| !v.is_empty())
                    .unwrap_or(UNCATEGORIZED)
                    .to_string(),
                None => self.rules.classify_record(record),
            };
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &TableSource {
        &self.source
    }

    pub fn encoding(&self) -> Option<SourceEncoding> {
        self.encoding
    }

    pub fn rules(&self) -> &CategoryRules {
        &self.rules
    }

    pub fn closed_status(&self) -> &str {
        &self.config.closed_status
    }

    pub fn summary(&self) -> Summary {
        let total = self.records.len();
        let closed = self
            .records
            .iter()
            .filter(|r| r.is_closed(&self.config.closed_status))
            .count();
        let closed_ratio = if total == 0 {
            0.0
        } else {
            closed as f64 / total as f64 * 100.0
        };
        Summary {
            total,
            closed,
            closed_ratio,
        }
    }

    // ========================================================================
    // VIEWS
    // ========================================================================

    /// Search view for the current query text and mode.
    pub fn search(&self) -> SearchOutcome {
        self.search_for(&self.query_text, self.mode)
    }

    pub fn search_for(&self, text: &str, mode: MatchMode) -> SearchOutcome {
        search::search(&self.records, &Query::parse(text, mode))
    }

    /// Statuses preselected in the status list; falls back to the closed label.
    pub fn default_statuses(&self) -> Vec<String> {
        if self.config.default_statuses.is_empty() {
            vec![self.config.closed_status.clone()]
        } else {
            self.config.default_statuses.clone()
        }
    }

    /// Records whose status is one of `statuses`, optionally within an
    /// inclusive closure-date range. No statuses selects nothing.
    pub fn status_list(&self, statuses: &[String], range: Option<DateRange>) -> Vec<Record> {
        let spec = FilterSpec::new().with_statuses(statuses.iter().map(String::as_str));
        let spec = match range {
            Some(r) => spec.with_date_range(r),
            None => spec,
        };
        filter::filter(&self.records, &spec)
    }

    /// Closed businesses, optionally within an inclusive closure-date range.
    pub fn closed_list(&self, range: Option<DateRange>) -> Vec<Record> {
        self.status_list(slice::from_ref(&self.config.closed_status), range)
    }

    /// Date range spanning the closure dates of records with these statuses.
    pub fn status_date_span(&self, statuses: &[String]) -> Option<DateRange> {
        DateRange::spanning(&self.status_list(statuses, None))
    }

    pub fn closed_date_span(&self) -> Option<DateRange> {
        self.status_date_span(slice::from_ref(&self.config.closed_status))
    }

    /// Range from optional bounds over the records with these statuses.
    ///
    /// Two bounds are put in order. A single bound keeps its side and the open
    /// side takes the edge of the subset's dates (or the bound itself when the
    /// subset has none), so a bound past that edge selects nothing.
    pub fn status_range(
        &self,
        statuses: &[String],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Option<DateRange> {
        match (start, end) {
            (None, None) => None,
            (Some(s), Some(e)) => Some(DateRange::new(s, e)),
            (Some(start), None) => {
                let end = self.status_date_span(statuses).map_or(start, |span| span.end);
                Some(DateRange { start, end })
            }
            (None, Some(end)) => {
                let start = self.status_date_span(statuses).map_or(end, |span| span.start);
                Some(DateRange { start, end })
            }
        }
    }

    pub fn closed_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<DateRange> {
        self.status_range(slice::from_ref(&self.config.closed_status), start, end)
    }

    pub fn closed_years(&self) -> Vec<i32> {
        aggregate::closed_years(&self.records, &self.config.closed_status)
    }

    pub fn closures_by_year(&self, years: Option<RangeInclusive<i32>>) -> Vec<YearCount> {
        aggregate::closures_by_year(&self.records, &self.config.closed_status, years)
    }

    pub fn duplicate_groups(&self, key: DuplicateKey) -> Vec<DuplicateGroup> {
        aggregate::duplicate_groups(&self.records, key)
    }

    pub fn duplicate_detail(&self, key: DuplicateKey, value: &str) -> Vec<Record> {
        aggregate::duplicate_detail(&self.records, key, value)
    }

    pub fn filter(&self, spec: &FilterSpec) -> Vec<Record> {
        filter::filter(&self.records, spec)
    }

    pub fn status_options(&self) -> Vec<String> {
        filter::status_options(&self.records)
    }

    /// Rows per category, in label order.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts.entry(r.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Display name of the column a duplicate key groups on.
    pub fn key_header(&self, key: DuplicateKey) -> &str {
        match key {
            DuplicateKey::Owner => &self.config.columns.owner_name,
            DuplicateKey::NationalId => &self.config.columns.national_id,
        }
    }

    // ========================================================================
    // EXPORT
    // ========================================================================

    pub fn export_records(&self, view: &[Record]) -> Result<Vec<u8>, ExportError> {
        export::records_csv(view, &self.config.columns)
    }

    pub fn export_year_counts(&self, counts: &[YearCount]) -> Result<Vec<u8>, ExportError> {
        export::year_counts_csv(counts)
    }

    pub fn export_duplicate_groups(
        &self,
        key: DuplicateKey,
        groups: &[DuplicateGroup],
    ) -> Result<Vec<u8>, ExportError> {
        export::duplicate_groups_csv(groups, self.key_header(key))
    }
}

// ============================================================================
// TESTS
// ============================================================================
