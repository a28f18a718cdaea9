use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use csv2sql::{BatchEvent, BatchRunner, ConversionEngine, Settings};
use futures::StreamExt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("csv2sql")
        .about("Convert CSV log files into SQL INSERT scripts")
        .arg(Arg::new("files").value_parser(clap::value_parser!(PathBuf)).action(ArgAction::Append).num_args(1..).required(true))
        .arg(Arg::new("dest").long("dest").short('d').help("Destination directory (defaults to settings, then the current directory)").value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("config").long("config").short('c').help("TOML settings file").value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("table").long("table"))
        .arg(Arg::new("separator").long("separator"))
        .arg(Arg::new("timestamp-pattern").long("timestamp-pattern"))
        .arg(Arg::new("prefix").long("prefix"))
        .arg(Arg::new("timestamp-column").long("timestamp-column"))
        .arg(Arg::new("response-time-column").long("response-time-column"))
        .arg(Arg::new("no-response-time").long("no-response-time").help("Treat the second column as text").action(ArgAction::SetTrue))
        .arg(Arg::new("max-column-length").long("max-column-length").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("charset").long("charset").help("Source encoding label, e.g. utf-8, windows-1252"))
        .arg(Arg::new("log-level").long("log-level").default_value("info"))
        .get_matches();

    let level = matches.get_one::<String>("log-level").map(String::as_str).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut settings = Settings::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    let overrides = [
        ("table", &mut settings.table_name),
        ("separator", &mut settings.field_separator),
        ("timestamp-pattern", &mut settings.timestamp_pattern),
        ("prefix", &mut settings.column_name_prefix),
        ("timestamp-column", &mut settings.timestamp_column_name),
        ("charset", &mut settings.charset),
    ];
    for (arg, slot) in overrides {
        if let Some(value) = matches.get_one::<String>(arg) {
            *slot = value.clone();
        }
    }
    if let Some(name) = matches.get_one::<String>("response-time-column") {
        settings.response_time_column_name = Some(name.clone());
    }
    if matches.get_flag("no-response-time") {
        settings.response_time_column_name = None;
    }
    if let Some(len) = matches.get_one::<usize>("max-column-length") {
        settings.max_column_name_length = *len;
    }
    if let Some(dest) = matches.get_one::<PathBuf>("dest") {
        settings.destination_dir = Some(dest.clone());
    }

    let config = settings.to_config()?;
    let destination_dir = settings
        .destination_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    anyhow::ensure!(
        destination_dir.is_dir(),
        "destination {} is not a directory",
        destination_dir.display()
    );

    let sources: Vec<PathBuf> = matches
        .get_many::<PathBuf>("files")
        .map(|files| files.cloned().collect())
        .unwrap_or_default();

    let token = CancellationToken::new();
    let on_ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current line");
            on_ctrl_c.cancel();
        }
    });

    let engine = ConversionEngine::new(config);
    let runner = BatchRunner::new(&engine, destination_dir);
    let signal = || token.is_cancelled();
    let events = runner.run(sources, &signal);
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        match event {
            Ok(BatchEvent::Starting { position, total, source }) => {
                info!("[{position}/{total}] {}", source.display());
            }
            Ok(BatchEvent::FileCompleted { summary, .. }) => {
                info!(
                    "  -> {} ({} rows, {} bytes, crc=0x{:08x})",
                    summary.destination.display(),
                    summary.rows_written,
                    summary.bytes_written,
                    summary.checksum
                );
            }
            Ok(BatchEvent::Cancelled { completed }) => {
                warn!("cancelled by user after {completed} complete file(s)");
                return Ok(());
            }
            Ok(BatchEvent::Finished { files }) => {
                info!("done, {files} file(s) converted");
            }
            Err(e) => {
                error!("{e}");
                return Err(e).context("conversion failed");
            }
        }
    }
    Ok(())
}
