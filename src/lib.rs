//! Streaming conversion of delimiter-separated log files into SQL `INSERT` scripts.
//!
//! - One source file in, one `.sql` file out, next to nothing held in memory.
//! - Sources may be plain, gzip or zstd compressed, in any `encoding_rs` charset.
//! - Cancellation is cooperative: the signal is polled once per input line.
//!
//! Data shape:
//! - `ConversionConfig` is built once per batch and shared by every file.
//! - `ConversionEngine::convert` returns `ConversionOutcome::{Completed, Aborted}`
//!   or a `Csv2SqlError` for a failed file.
//! - `BatchRunner::run` yields a stream of `BatchEvent`s.
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod batch;
mod cancel;
mod codec;
mod config;
mod engine;
mod format;
mod identifier;
mod io;
mod row;
mod settings;

pub use crate::batch::{BatchEvent, BatchOutcome, BatchRunner};
pub use crate::cancel::CancellationSignal;
pub use crate::codec::LineDecoder;
pub use crate::config::{ConversionConfig, ConversionConfigBuilder};
pub use crate::engine::{ConversionEngine, ConversionOutcome, ConversionSummary};
pub use crate::format::{escape_text, ColumnRole, TimestampPattern, ValueFormatter};
pub use crate::identifier::{build_name, ColumnNames, DefaultSanitizer, IdentifierSanitizer};
pub use crate::io::{destination_path, open_source, Compression, SourceLines, SourceMeta};
pub use crate::row::split_fields;
pub use crate::settings::Settings;

use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single field could not be turned into a SQL literal.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("'{value}' does not match timestamp pattern '{pattern}': {source}")]
    Timestamp {
        value: String,
        pattern: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("'{value}' is not an integer response time: {source}")]
    ResponseTime {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("row has {found} fields but the header has {expected}")]
    TooManyFields { expected: usize, found: usize },
}

/// Error type returned by this crate.
#[derive(Debug, Error)]
pub enum Csv2SqlError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),
    #[error("{file}, line {line}: {source}")]
    Field {
        file: String,
        line: u64,
        #[source]
        source: FieldError,
    },
    #[error("File {index} ({}) failed: {source}", .path.display())]
    FileFailed {
        /// 1-based position of the file in its batch.
        index: usize,
        path: PathBuf,
        #[source]
        source: Box<Csv2SqlError>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ConvertResult<T> = std::result::Result<T, Csv2SqlError>;
