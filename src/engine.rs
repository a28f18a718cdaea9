use crate::cancel::CancellationSignal;
use crate::config::ConversionConfig;
use crate::format::{ColumnRole, ValueFormatter};
use crate::identifier::{ColumnNames, DefaultSanitizer, IdentifierSanitizer};
use crate::io::{create_destination, destination_path, open_source, SourceLines, SourceMeta};
use crate::row::split_fields;
use crate::{ConvertResult, Csv2SqlError, FieldError};
use crc32fast::Hasher as Crc32;
use futures::StreamExt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

/// How a single file conversion ended, when it did not fail.
#[derive(Debug)]
pub enum ConversionOutcome {
    Completed(ConversionSummary),
    /// Cancelled; the partial destination has been removed.
    Aborted,
}

/// Result summary for one converted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Number of `INSERT` statements written.
    pub rows_written: u64,
    /// Data lines skipped because they were blank after trimming.
    pub blank_lines: u64,
    pub bytes_written: u64,
    /// CRC32 over every byte written to the destination.
    pub checksum: u32,
}

/// Converts CSV log files into `INSERT` scripts under one configuration.
pub struct ConversionEngine {
    config: ConversionConfig,
    sanitizer: Box<dyn IdentifierSanitizer>,
}

impl ConversionEngine {
    pub fn new(config: ConversionConfig) -> Self {
        Self::with_sanitizer(config, DefaultSanitizer)
    }

    pub fn with_sanitizer<Z>(config: ConversionConfig, sanitizer: Z) -> Self
    where
        Z: IdentifierSanitizer + 'static,
    {
        Self {
            config,
            sanitizer: Box::new(sanitizer),
        }
    }

    /// Convert `source` into `<destination_dir>/<name>.sql`.
    ///
    /// Fails without touching anything if the destination already exists.
    /// On cancellation or failure the partially written destination is deleted;
    /// a failed deletion is only logged.
    pub async fn convert<S>(
        &self,
        source: &Path,
        destination_dir: &Path,
        signal: &S,
    ) -> ConvertResult<ConversionOutcome>
    where
        S: CancellationSignal + ?Sized,
    {
        let meta = SourceMeta::from_path(source, self.config.charset());
        let destination = destination_path(source, destination_dir);
        info!(
            source = %source.display(),
            destination = %destination.display(),
            "converting"
        );

        let mut lines = open_source(source, &meta).await?;
        let mut writer = SqlWriter::new(create_destination(&destination).await?);

        let streamed = match self.write_statements(&mut lines, &mut writer, &meta, signal).await {
            Ok(StreamEnd::Finished(counts)) => writer.finish().await.map(|()| Some(counts)),
            Ok(StreamEnd::Cancelled { line }) => {
                info!(source = %source.display(), line, "conversion cancelled");
                Ok(None)
            }
            Err(e) => Err(e),
        };

        match streamed {
            Ok(Some(counts)) => {
                let summary = ConversionSummary {
                    source: source.to_path_buf(),
                    destination,
                    rows_written: counts.rows,
                    blank_lines: counts.blank_lines,
                    bytes_written: writer.bytes_written,
                    checksum: writer.checksum(),
                };
                info!(
                    source = %summary.source.display(),
                    rows = summary.rows_written,
                    bytes = summary.bytes_written,
                    "conversion completed"
                );
                Ok(ConversionOutcome::Completed(summary))
            }
            Ok(None) => {
                writer.discard(&destination).await;
                Ok(ConversionOutcome::Aborted)
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "conversion failed");
                writer.discard(&destination).await;
                Err(e)
            }
        }
    }

    async fn write_statements<S>(
        &self,
        lines: &mut SourceLines,
        writer: &mut SqlWriter,
        meta: &SourceMeta,
        signal: &S,
    ) -> ConvertResult<StreamEnd>
    where
        S: CancellationSignal + ?Sized,
    {
        let mut counts = RowCounts::default();
        let header = match lines.next().await {
            Some(header) => header?,
            None => {
                debug!(source = %meta.name, "empty source, nothing to convert");
                return Ok(StreamEnd::Finished(counts));
            }
        };

        let config = &self.config;
        let separator = config.field_separator();
        let header_fields = split_fields(header.trim(), separator);
        let columns = ColumnNames::from_header(&header_fields, config, self.sanitizer.as_ref());
        debug!(source = %meta.name, columns = %columns.joined(columns.len()), "column names");

        let roles: Vec<ColumnRole> = (0..columns.len())
            .map(|idx| ColumnRole::for_index(idx, config))
            .collect();
        let formatter = ValueFormatter::new(config);
        let full_prefix = insert_prefix(config.table_name(), &columns, columns.len());
        let mut statement = String::with_capacity(full_prefix.len() * 2);
        let mut line_no: u64 = 1;

        while let Some(line) = lines.next().await {
            let line = line?;
            line_no += 1;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                counts.blank_lines += 1;
            } else {
                let fields = split_fields(trimmed, separator);
                let field_error = |source: FieldError| Csv2SqlError::Field {
                    file: meta.name.clone(),
                    line: line_no,
                    source,
                };
                if fields.len() > columns.len() {
                    return Err(field_error(FieldError::TooManyFields {
                        expected: columns.len(),
                        found: fields.len(),
                    }));
                }
                // A short row narrows the column list to the fields present.
                let arity = fields.len();
                statement.clear();
                if arity == columns.len() {
                    statement.push_str(&full_prefix);
                } else {
                    statement.push_str(&insert_prefix(config.table_name(), &columns, arity));
                }
                for (idx, raw) in fields.iter().enumerate() {
                    if idx > 0 {
                        statement.push(',');
                    }
                    formatter
                        .write_value(roles[idx], raw, &mut statement)
                        .map_err(field_error)?;
                }
                statement.push_str(");\n");
                writer.write_str(&statement).await?;
                counts.rows += 1;
            }

            if signal.is_cancelled() {
                return Ok(StreamEnd::Cancelled { line: line_no });
            }
        }

        writer.write_str("COMMIT;\n").await?;
        Ok(StreamEnd::Finished(counts))
    }
}

fn insert_prefix(table: &str, columns: &ColumnNames, arity: usize) -> String {
    let mut prefix = String::new();
    let _ = write!(prefix, "INSERT INTO {table} ({}) VALUES (", columns.joined(arity));
    prefix
}

#[derive(Debug, Default, Clone, Copy)]
struct RowCounts {
    rows: u64,
    blank_lines: u64,
}

enum StreamEnd {
    Finished(RowCounts),
    Cancelled { line: u64 },
}

/// Buffered destination that tracks byte count and checksum of what it wrote.
struct SqlWriter {
    inner: BufWriter<File>,
    hasher: Crc32,
    bytes_written: u64,
}

impl SqlWriter {
    fn new(file: File) -> Self {
        Self {
            inner: BufWriter::with_capacity(1 << 16, file),
            hasher: Crc32::new(),
            bytes_written: 0,
        }
    }

    async fn write_str(&mut self, s: &str) -> ConvertResult<()> {
        self.inner.write_all(s.as_bytes()).await?;
        self.hasher.update(s.as_bytes());
        self.bytes_written += s.len() as u64;
        Ok(())
    }

    async fn finish(&mut self) -> ConvertResult<()> {
        self.inner.flush().await?;
        self.inner.shutdown().await?;
        Ok(())
    }

    fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Close without flushing and remove the file.
    async fn discard(self, path: &Path) {
        // Wait for any in-flight write so the handle is really closed before removal.
        drop(self.inner.into_inner().into_std().await);
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(
                destination = %path.display(),
                error = %e,
                "could not delete partial destination"
            );
        }
    }
}
