// 🏷️ Category Rules - Rules as Data
// Ordered keyword rules; the first rule with a matching pattern wins

use crate::error::RuleError;
use crate::record::{Record, UNCATEGORIZED};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CategoryRule {
    /// Category assigned when any pattern matches
    pub label: String,

    /// Case-insensitive regular expressions, tried in order
    pub patterns: Vec<Regex>,
}

/// On-disk shape of a rule (JSON rules file)
#[derive(Debug, Deserialize)]
struct RuleSpec {
    label: String,
    patterns: Vec<String>,
}

impl CategoryRule {
    pub fn new<S: AsRef<str>>(label: &str, patterns: &[S]) -> Result<Self, RuleError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(RuleError::EmptyLabel);
        }

        let patterns = patterns
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| RuleError::InvalidPattern {
                        label: label.to_string(),
                        pattern: p.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CategoryRule {
            label: label.to_string(),
            patterns,
        })
    }

    /// Check if any pattern matches the given text
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

// ============================================================================
// RULE SET
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
}

impl CategoryRules {
    pub fn new() -> Self {
        CategoryRules { rules: Vec::new() }
    }

    pub fn from_rules(rules: Vec<CategoryRule>) -> Self {
        CategoryRules { rules }
    }

    /// Parse `label = pattern1|pattern2` lines.
    ///
    /// Blank lines and `#` comments are skipped. Listed order is match order.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let mut rules = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, patterns) = line.split_once('=').ok_or(RuleError::MissingSeparator {
                line: idx + 1,
            })?;
            let patterns: Vec<&str> = patterns.split('|').collect();
            rules.push(CategoryRule::new(label, &patterns)?);
        }

        Ok(CategoryRules { rules })
    }

    /// Load rules from a file: JSON array when the extension is `.json`,
    /// `label = a|b` lines otherwise.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| RuleError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if !is_json {
            return Self::parse(&content);
        }

        let specs: Vec<RuleSpec> = serde_json::from_str(&content)?;
        let rules = specs
            .iter()
            .map(|s| CategoryRule::new(&s.label, &s.patterns))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CategoryRules { rules })
    }

    /// First matching label, or `uncategorized`.
    pub fn classify(&self, text: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| rule.label.as_str())
            .unwrap_or(UNCATEGORIZED)
    }

    /// Classify a record by its name, owner and pass-through columns.
    pub fn classify_record(&self, record: &Record) -> String {
        let mut text = format!("{} {}", record.name, record.owner_name);
        for (_, value) in &record.extra {
            text.push(' ');
            text.push_str(value);
        }
        self.classify(&text).to_string()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.label.as_str()).collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
