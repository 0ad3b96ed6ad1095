// ⚠️ Error types for the library surface
// Binaries wrap these in anyhow with context

use thiserror::Error;

/// Loading an uploaded table failed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The header row lacks one or more required columns; nothing is loaded.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook has no sheet with a header row")]
    EmptyWorkbook,
}

/// A category rule could not be built.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("line {line}: expected `label = pattern1|pattern2`")]
    MissingSeparator { line: usize },

    #[error("rule label is empty")]
    EmptyLabel,

    #[error("rule '{label}': invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        label: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read rules file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rules JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The configuration file could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// An export could not be written.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer could not be flushed: {0}")]
    Io(#[from] std::io::Error),
}
