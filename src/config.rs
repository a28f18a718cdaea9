use crate::format::TimestampPattern;
use crate::{ConvertResult, Csv2SqlError};
use encoding_rs::Encoding;

pub const DEFAULT_SEPARATOR: &str = ";";
pub const DEFAULT_TIMESTAMP_PATTERN: &str = "dd/MM/yyyy HH:mm:ss.SSS";
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "LOG_TIME";
pub const DEFAULT_RESPONSE_TIME_COLUMN: &str = "RESPONSE_TIME";
pub const DEFAULT_MAX_COLUMN_NAME_LENGTH: usize = 30;

/// Immutable conversion settings shared by every file of a batch.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    field_separator: String,
    timestamp_pattern: TimestampPattern,
    table_name: String,
    column_name_prefix: String,
    timestamp_column_name: String,
    response_time_column_name: Option<String>,
    max_column_name_length: usize,
    charset: &'static Encoding,
}

impl ConversionConfig {
    pub fn builder(table_name: impl Into<String>) -> ConversionConfigBuilder {
        ConversionConfigBuilder::new(table_name)
    }

    pub fn field_separator(&self) -> &str {
        &self.field_separator
    }

    pub fn timestamp_pattern(&self) -> &TimestampPattern {
        &self.timestamp_pattern
    }

    /// Used verbatim in the `INSERT INTO` clause.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn column_name_prefix(&self) -> &str {
        &self.column_name_prefix
    }

    pub fn timestamp_column_name(&self) -> &str {
        &self.timestamp_column_name
    }

    /// `None` when column 1 is plain text.
    pub fn response_time_column_name(&self) -> Option<&str> {
        self.response_time_column_name.as_deref()
    }

    pub fn max_column_name_length(&self) -> usize {
        self.max_column_name_length
    }

    pub fn charset(&self) -> &'static Encoding {
        self.charset
    }
}

#[derive(Debug, Clone)]
pub struct ConversionConfigBuilder {
    field_separator: String,
    timestamp_pattern: String,
    table_name: String,
    column_name_prefix: String,
    timestamp_column_name: String,
    response_time_column_name: Option<String>,
    max_column_name_length: usize,
    charset: String,
}

impl ConversionConfigBuilder {
    fn new(table_name: impl Into<String>) -> Self {
        Self {
            field_separator: DEFAULT_SEPARATOR.to_string(),
            timestamp_pattern: DEFAULT_TIMESTAMP_PATTERN.to_string(),
            table_name: table_name.into(),
            column_name_prefix: String::new(),
            timestamp_column_name: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            response_time_column_name: Some(DEFAULT_RESPONSE_TIME_COLUMN.to_string()),
            max_column_name_length: DEFAULT_MAX_COLUMN_NAME_LENGTH,
            charset: "utf-8".to_string(),
        }
    }

    pub fn field_separator(mut self, separator: impl Into<String>) -> Self {
        self.field_separator = separator.into();
        self
    }

    pub fn timestamp_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.timestamp_pattern = pattern.into();
        self
    }

    pub fn column_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.column_name_prefix = prefix.into();
        self
    }

    pub fn timestamp_column_name(mut self, name: impl Into<String>) -> Self {
        self.timestamp_column_name = name.into();
        self
    }

    /// `None` disables the numeric response-time column.
    pub fn response_time_column_name(mut self, name: Option<&str>) -> Self {
        self.response_time_column_name = name.map(str::to_string);
        self
    }

    pub fn max_column_name_length(mut self, len: usize) -> Self {
        self.max_column_name_length = len;
        self
    }

    /// Any WHATWG encoding label, e.g. `utf-8`, `windows-1252`, `utf-16le`.
    pub fn charset(mut self, label: impl Into<String>) -> Self {
        self.charset = label.into();
        self
    }

    pub fn build(self) -> ConvertResult<ConversionConfig> {
        if self.table_name.trim().is_empty() {
            return Err(Csv2SqlError::Config("table name must not be blank".into()));
        }
        if self.field_separator.is_empty() {
            return Err(Csv2SqlError::Config(
                "field separator must not be empty".into(),
            ));
        }
        if self.timestamp_column_name.trim().is_empty() {
            return Err(Csv2SqlError::Config(
                "timestamp column name must not be blank".into(),
            ));
        }
        if self.max_column_name_length == 0 {
            return Err(Csv2SqlError::Config(
                "max column name length must be positive".into(),
            ));
        }
        let charset = Encoding::for_label(self.charset.trim().as_bytes()).ok_or_else(|| {
            Csv2SqlError::Config(format!("unknown charset '{}'", self.charset))
        })?;
        let timestamp_pattern = TimestampPattern::compile(&self.timestamp_pattern)?;

        Ok(ConversionConfig {
            field_separator: self.field_separator,
            timestamp_pattern,
            table_name: self.table_name,
            column_name_prefix: self.column_name_prefix,
            timestamp_column_name: self.timestamp_column_name,
            response_time_column_name: self.response_time_column_name,
            max_column_name_length: self.max_column_name_length,
            charset,
        })
    }
}
