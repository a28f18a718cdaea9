use crate::config::ConversionConfig;
use crate::format::ColumnRole;

/// Turns an arbitrary string into something usable as an unquoted SQL identifier.
/// Implementations must be deterministic.
pub trait IdentifierSanitizer: Send + Sync {
    fn sanitize(&self, raw: &str) -> String;
}

/// ASCII-only sanitizer.
///
/// Anything outside `[A-Za-z0-9_]` becomes `_`, runs of `_` collapse, an empty
/// result becomes `_` and a leading digit gets a `_` in front. Idempotent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSanitizer;

impl IdentifierSanitizer for DefaultSanitizer {
    fn sanitize(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len() + 1);
        for c in raw.chars() {
            let c = if c.is_ascii_alphanumeric() { c } else { '_' };
            if c == '_' && out.ends_with('_') {
                continue;
            }
            out.push(c);
        }
        match out.chars().next() {
            None => out.push('_'),
            Some(first) if first.is_ascii_digit() => out.insert(0, '_'),
            Some(_) => {}
        }
        out
    }
}

/// `prefix + raw`, sanitized, then cut to at most `max_len` characters.
pub fn build_name<S>(raw: &str, prefix: &str, max_len: usize, sanitizer: &S) -> String
where
    S: IdentifierSanitizer + ?Sized,
{
    let mut name = sanitizer.sanitize(&format!("{prefix}{raw}"));
    if let Some((cut, _)) = name.char_indices().nth(max_len) {
        name.truncate(cut);
    }
    name
}

/// SQL column names for one source file, in CSV column order.
///
/// Duplicates are possible when two headers collapse to the same identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    names: Vec<String>,
}

impl ColumnNames {
    /// Derive one name per header field. The timestamp column (and the
    /// response-time column when enabled) take their configured base names;
    /// every other column is named after its header token.
    pub fn from_header<S>(header: &[&str], config: &ConversionConfig, sanitizer: &S) -> Self
    where
        S: IdentifierSanitizer + ?Sized,
    {
        let names = header
            .iter()
            .enumerate()
            .map(|(idx, &token)| {
                let base = match ColumnRole::for_index(idx, config) {
                    ColumnRole::Timestamp => config.timestamp_column_name(),
                    ColumnRole::ResponseTime => config
                        .response_time_column_name()
                        .unwrap_or(token),
                    ColumnRole::Text => token,
                };
                build_name(
                    base,
                    config.column_name_prefix(),
                    config.max_column_name_length(),
                    sanitizer,
                )
            })
            .collect();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    /// Comma-separated list of the first `count` names (all of them if `count`
    /// exceeds the list).
    pub fn joined(&self, count: usize) -> String {
        self.names[..count.min(self.names.len())].join(",")
    }
}
