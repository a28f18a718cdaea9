use chrono::{Duration, NaiveDate};
use clap::{Arg, Command};
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic CSV log to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("cols")
                .long("cols")
                .help("Total columns, including timestamp and response time")
                .value_parser(clap::value_parser!(usize))
                .default_value("4"),
        )
        .arg(Arg::new("delim").long("delim").default_value(";"))
        .arg(
            Arg::new("blank_every")
                .long("blank-every")
                .help("Insert a blank line every N rows (0 = never)")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .get_matches();

    let rows: u64 = *matches.get_one("rows").unwrap();
    let cols: usize = (*matches.get_one::<usize>("cols").unwrap()).max(2);
    let delim = matches.get_one::<String>("delim").unwrap();
    let blank_every: u64 = *matches.get_one("blank_every").unwrap();

    let mut out = io::BufWriter::new(io::stdout().lock());

    write!(&mut out, "Date{delim}Response time")?;
    for i in 2..cols {
        write!(&mut out, "{delim}Field {i}")?;
    }
    writeln!(&mut out)?;

    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid start date"))?;

    // Deterministic data: one row every 250ms, a quote in every 7th message.
    for i in 0..rows {
        let ts = start + Duration::milliseconds(250 * i as i64);
        write!(
            &mut out,
            "{}{delim}{}",
            ts.format("%d/%m/%Y %H:%M:%S%.3f"),
            (i * 37) % 5000
        )?;
        for c in 2..cols {
            if i % 7 == 0 && c == 2 {
                write!(&mut out, "{delim}user's request {i}")?;
            } else {
                write!(&mut out, "{delim}v{c}_{i}")?;
            }
        }
        writeln!(&mut out)?;
        if blank_every > 0 && i % blank_every == blank_every - 1 {
            writeln!(&mut out)?;
        }
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
