// Registry Lens - Core Library
// Search, filter and aggregate uploaded business-registration tables.
// Shared by the CLI, the terminal dashboard and the API server.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod record;
pub mod rules;
pub mod sample;
pub mod search;
pub mod session;

// Re-export commonly used types
pub use aggregate::{
    closed_years, closures_by_year, duplicate_detail, duplicate_groups,
    DuplicateGroup, DuplicateKey, YearCount,
};
pub use config::{ColumnNames, Config};
pub use error::{ConfigError, ExportError, LoadError, RuleError};
pub use export::ExportView;
pub use filter::{filter, status_options, DateRange, FilterSpec};
pub use loader::{decode, is_workbook, load_bytes, load_path, LoadedTable, SourceEncoding};
pub use normalize::{digits_only, normalize_text, parse_date};
pub use record::{Record, UNCATEGORIZED};
pub use rules::{CategoryRule, CategoryRules};
pub use sample::sample_records;
pub use search::{matches, search, MatchMode, Matcher, Query, SearchOutcome};
pub use session::{Session, Summary, TableSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
