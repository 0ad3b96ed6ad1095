// ⚙️ Configuration - column names, status labels, defaults
// Every field has a default; a TOML file only overrides what it names

use crate::error::ConfigError;
use crate::search::MatchMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Header names of the uploaded table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub name: String,
    pub registration_id: String,
    pub owner_name: String,
    pub national_id: String,
    pub status: String,
    /// Optional in the upload; absent means every closure date is absent
    pub closure_date: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            name: "상호".to_string(),
            registration_id: "사업자번호".to_string(),
            owner_name: "대표자".to_string(),
            national_id: "주민번호".to_string(),
            status: "사업자상태".to_string(),
            closure_date: "폐업일자".to_string(),
        }
    }
}

impl ColumnNames {
    /// Required columns in canonical order.
    pub fn required(&self) -> [&str; 5] {
        [
            self.name.as_str(),
            self.registration_id.as_str(),
            self.owner_name.as_str(),
            self.national_id.as_str(),
            self.status.as_str(),
        ]
    }

    /// Columns shown in table views and exports.
    pub fn display(&self) -> [&str; 6] {
        [
            self.name.as_str(),
            self.registration_id.as_str(),
            self.owner_name.as_str(),
            self.national_id.as_str(),
            self.status.as_str(),
            self.closure_date.as_str(),
        ]
    }

    pub fn is_known(&self, column: &str) -> bool {
        self.display().contains(&column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub columns: ColumnNames,

    /// Status value that marks a closed business
    pub closed_status: String,

    /// Statuses pre-selected by the status filter
    pub default_statuses: Vec<String>,

    pub default_mode: MatchMode,

    /// Take the category from this uploaded column instead of rules
    pub category_column: Option<String>,

    /// Category rules file (`.json` or `label = a|b` lines)
    pub rules_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            columns: ColumnNames::default(),
            closed_status: "폐업".to_string(),
            default_statuses: vec!["폐업".to_string()],
            default_mode: MatchMode::All,
            category_column: None,
            rules_file: None,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }
}
