use crate::config::ConversionConfig;
use crate::{ConvertResult, Csv2SqlError, FieldError};
use chrono::format::{self, Fixed, Item, Numeric, Parsed, StrftimeItems};
use chrono::{NaiveDateTime, NaiveTime};
use std::fmt::Write as _;

/// Body of the emitted `TIMESTAMP '...'` literal: month unpadded, millisecond precision.
const SQL_TIMESTAMP_FORMAT: &str = "%Y-%-m-%d %H:%M:%S%.3f";

/// How a column's values are rendered, decided by position only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Timestamp,
    ResponseTime,
    Text,
}

impl ColumnRole {
    pub fn for_index(idx: usize, config: &ConversionConfig) -> Self {
        match idx {
            0 => ColumnRole::Timestamp,
            1 if config.response_time_column_name().is_some() => ColumnRole::ResponseTime,
            _ => ColumnRole::Text,
        }
    }
}

/// A compiled input timestamp pattern.
///
/// Accepts chrono strftime syntax (anything containing `%`) or the letter
/// notation `dd/MM/yyyy HH:mm:ss.SSS`, which is translated to strftime once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampPattern {
    source: String,
    strftime: String,
    /// Whether any hour, minute, second or am/pm field appears.
    has_time: bool,
}

impl TimestampPattern {
    pub fn compile(pattern: &str) -> ConvertResult<Self> {
        if pattern.trim().is_empty() {
            return Err(Csv2SqlError::Config(
                "timestamp pattern must not be empty".into(),
            ));
        }
        let strftime = if pattern.contains('%') {
            pattern.to_string()
        } else {
            translate_letter_pattern(pattern)?
        };
        let mut has_time = false;
        for item in StrftimeItems::new(&strftime) {
            match item {
                Item::Error => {
                    return Err(Csv2SqlError::Config(format!(
                        "invalid timestamp pattern '{pattern}'"
                    )))
                }
                Item::Numeric(
                    Numeric::Hour | Numeric::Hour12 | Numeric::Minute | Numeric::Second,
                    _,
                )
                | Item::Fixed(Fixed::LowerAmPm | Fixed::UpperAmPm) => has_time = true,
                _ => {}
            }
        }
        Ok(Self {
            source: pattern.to_string(),
            strftime,
            has_time,
        })
    }

    /// The pattern as configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Equivalent chrono format string.
    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Strict parse: the whole value must match and denote a real date/time.
    /// Patterns without time fields resolve to midnight; a time without
    /// minutes or seconds has them set to zero.
    pub fn parse(&self, value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        let mut parsed = Parsed::new();
        format::parse(&mut parsed, value, StrftimeItems::new(&self.strftime))?;
        let date = parsed.to_naive_date()?;
        if !self.has_time {
            return Ok(date.and_time(NaiveTime::MIN));
        }
        // Only fails when the field was already parsed, which keeps that value.
        let _ = parsed.set_minute(0);
        Ok(date.and_time(parsed.to_naive_time()?))
    }
}

fn translate_letter_pattern(pattern: &str) -> ConvertResult<String> {
    let unsupported = |what: String| {
        Csv2SqlError::Config(format!("timestamp pattern '{pattern}': {what}"))
    };
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut has_hour12 = false;
    let mut has_am_pm = false;
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
                continue;
            }
            let mut closed = false;
            while let Some(q) = chars.next() {
                if q == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        out.push('\'');
                        continue;
                    }
                    closed = true;
                    break;
                }
                push_literal(&mut out, q);
            }
            if !closed {
                return Err(unsupported("unterminated quoted literal".into()));
            }
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            continue;
        }

        let mut run = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            run += 1;
        }
        let directive = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1 | 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1 | 2) => "%d",
            ('H', 1 | 2) => "%H",
            ('h', 1 | 2) => {
                has_hour12 = true;
                "%I"
            }
            ('m', 1 | 2) => "%M",
            ('s', 1 | 2) => "%S",
            ('S', 3) => "%3f",
            ('S', 6) => "%6f",
            ('S', 9) => "%9f",
            ('a', _) => {
                has_am_pm = true;
                "%p"
            }
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            _ => {
                return Err(unsupported(format!(
                    "unsupported field '{}'",
                    c.to_string().repeat(run)
                )))
            }
        };
        out.push_str(directive);
    }

    if has_hour12 && !has_am_pm {
        return Err(unsupported("12-hour field 'h' requires an am/pm marker 'a'".into()));
    }
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// SQL string literal: single quotes doubled, whole value single-quoted.
pub fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    push_text(&mut out, raw);
    out
}

fn push_text(out: &mut String, raw: &str) {
    out.push('\'');
    for c in raw.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
}

/// Renders raw CSV fields as SQL literals according to their column role.
#[derive(Debug, Clone, Copy)]
pub struct ValueFormatter<'a> {
    pattern: &'a TimestampPattern,
}

impl<'a> ValueFormatter<'a> {
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self {
            pattern: config.timestamp_pattern(),
        }
    }

    /// Append the literal for `raw` to `out`.
    pub fn write_value(
        &self,
        role: ColumnRole,
        raw: &str,
        out: &mut String,
    ) -> Result<(), FieldError> {
        match role {
            ColumnRole::Timestamp => {
                let instant = self
                    .pattern
                    .parse(raw.trim())
                    .map_err(|source| FieldError::Timestamp {
                        value: raw.to_string(),
                        pattern: self.pattern.as_str().to_string(),
                        source,
                    })?;
                // Writing into a String cannot fail.
                let _ = write!(out, "TIMESTAMP '{}'", instant.format(SQL_TIMESTAMP_FORMAT));
            }
            ColumnRole::ResponseTime => {
                let value: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|source| FieldError::ResponseTime {
                        value: raw.to_string(),
                        source,
                    })?;
                let _ = write!(out, "{value}");
            }
            ColumnRole::Text => push_text(out, raw),
        }
        Ok(())
    }

    pub fn format_value(&self, role: ColumnRole, raw: &str) -> Result<String, FieldError> {
        let mut out = String::new();
        self.write_value(role, raw, &mut out)?;
        Ok(out)
    }
}
