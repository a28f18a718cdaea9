//! Layered application settings: defaults, then an optional TOML file, then
//! `CSV2SQL_*` environment variables.

use crate::config::{
    ConversionConfig, DEFAULT_MAX_COLUMN_NAME_LENGTH, DEFAULT_RESPONSE_TIME_COLUMN,
    DEFAULT_SEPARATOR, DEFAULT_TIMESTAMP_COLUMN, DEFAULT_TIMESTAMP_PATTERN,
};
use crate::{ConvertResult, Csv2SqlError};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "CSV2SQL_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub table_name: String,
    pub field_separator: String,
    pub timestamp_pattern: String,
    pub column_name_prefix: String,
    pub timestamp_column_name: String,
    /// Empty or absent disables the numeric response-time column.
    pub response_time_column_name: Option<String>,
    pub max_column_name_length: usize,
    pub charset: String,
    pub destination_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_name: "LOG".to_string(),
            field_separator: DEFAULT_SEPARATOR.to_string(),
            timestamp_pattern: DEFAULT_TIMESTAMP_PATTERN.to_string(),
            column_name_prefix: String::new(),
            timestamp_column_name: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            response_time_column_name: Some(DEFAULT_RESPONSE_TIME_COLUMN.to_string()),
            max_column_name_length: DEFAULT_MAX_COLUMN_NAME_LENGTH,
            charset: "utf-8".to_string(),
            destination_dir: None,
        }
    }
}

impl Settings {
    /// Defaults, merged with `file` (if given) and the environment.
    pub fn load(file: Option<&Path>) -> ConvertResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = file {
            if !path.is_file() {
                return Err(Csv2SqlError::Config(format!(
                    "settings file {} not found",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| Csv2SqlError::Config(e.to_string()))
    }

    /// Validate into an engine configuration.
    pub fn to_config(&self) -> ConvertResult<ConversionConfig> {
        let response_time = self
            .response_time_column_name
            .as_deref()
            .filter(|name| !name.trim().is_empty());
        ConversionConfig::builder(self.table_name.as_str())
            .field_separator(self.field_separator.as_str())
            .timestamp_pattern(self.timestamp_pattern.as_str())
            .column_name_prefix(self.column_name_prefix.as_str())
            .timestamp_column_name(self.timestamp_column_name.as_str())
            .response_time_column_name(response_time)
            .max_column_name_length(self.max_column_name_length)
            .charset(self.charset.as_str())
            .build()
    }
}
