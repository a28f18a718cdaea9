use clap::{Arg, Command};
use csv2sql::{ConversionConfig, ConversionEngine, ConversionOutcome};
use std::path::PathBuf;
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("bench")
        .arg(Arg::new("path").long("path").value_parser(clap::value_parser!(PathBuf)).required(true))
        .arg(Arg::new("dest").long("dest").help("Output directory (defaults to a temporary one)").value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("separator").long("separator").default_value(";"))
        .arg(Arg::new("table").long("table").default_value("LOG"))
        .get_matches();

    let path = matches.get_one::<PathBuf>("path").unwrap();
    let config = ConversionConfig::builder(matches.get_one::<String>("table").unwrap().as_str())
        .field_separator(matches.get_one::<String>("separator").unwrap().as_str())
        .build()?;
    let engine = ConversionEngine::new(config);

    let dest = match matches.get_one::<PathBuf>("dest") {
        Some(d) => d.clone(),
        None => {
            let scratch = std::env::temp_dir().join(format!("csv2sql-bench-{}", std::process::id()));
            std::fs::create_dir_all(&scratch)?;
            scratch
        }
    };

    let start = Instant::now();
    let outcome = engine.convert(path, &dest, &|| false).await?;
    let elapsed = start.elapsed().as_secs_f64();

    match outcome {
        ConversionOutcome::Completed(summary) => {
            let rps = (summary.rows_written as f64) / elapsed;
            println!(
                "source={} rows={} bytes={} crc=0x{:08x}\nelapsed={:.1}s rows/sec={:.0}",
                path.display(),
                summary.rows_written,
                summary.bytes_written,
                summary.checksum,
                elapsed,
                rps
            );
            if matches.get_one::<PathBuf>("dest").is_none() {
                std::fs::remove_dir_all(&dest)?;
            }
        }
        ConversionOutcome::Aborted => println!("aborted"),
    }
    Ok(())
}
