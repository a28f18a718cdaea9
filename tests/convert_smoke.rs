use csv2sql::{
    ConversionConfig, ConversionEngine, ConversionOutcome, ConversionSummary, Csv2SqlError,
    FieldError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;

const HEADER: &str = "Date;Elapsed;Status";

fn engine(response_time: bool) -> ConversionEngine {
    let config = ConversionConfig::builder("LOG")
        .response_time_column_name(response_time.then_some("RESPONSE_TIME"))
        .build()
        .unwrap();
    ConversionEngine::new(config)
}

fn write_source(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn completed(outcome: ConversionOutcome) -> ConversionSummary {
    match outcome {
        ConversionOutcome::Completed(summary) => summary,
        ConversionOutcome::Aborted => panic!("unexpected abort"),
    }
}

#[tokio::test]
async fn converts_rows_into_inserts_and_commit() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(
        src.path(),
        "day1.csv",
        &format!("{HEADER}\n24/03/1998 04:21:23.456;42;ok\n   \n01/01/2020 00:00:00.000; 7 ;O'Brien\n"),
    );

    let summary = completed(engine(true).convert(&source, dest.path(), &|| false).await?);

    let sql = fs::read_to_string(dest.path().join("day1.sql"))?;
    assert_eq!(
        sql,
        "INSERT INTO LOG (LOG_TIME,RESPONSE_TIME,Status) VALUES (TIMESTAMP '1998-3-24 04:21:23.456',42,'ok');\n\
         INSERT INTO LOG (LOG_TIME,RESPONSE_TIME,Status) VALUES (TIMESTAMP '2020-1-01 00:00:00.000',7,'O''Brien');\n\
         COMMIT;\n"
    );
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.blank_lines, 1);
    assert_eq!(summary.bytes_written, sql.len() as u64);
    assert_eq!(summary.checksum, crc32fast::hash(sql.as_bytes()));
    assert_eq!(summary.destination, dest.path().join("day1.sql"));
    Ok(())
}

#[tokio::test]
async fn response_time_disabled_uses_header_name_and_text() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(
        src.path(),
        "day.csv",
        &format!("{HEADER}\n01/01/2020 00:00:00.000;42;ok\n"),
    );

    completed(engine(false).convert(&source, dest.path(), &|| false).await?);

    let sql = fs::read_to_string(dest.path().join("day.sql"))?;
    assert_eq!(
        sql.lines().next(),
        Some("INSERT INTO LOG (LOG_TIME,Elapsed,Status) VALUES (TIMESTAMP '2020-1-01 00:00:00.000','42','ok');")
    );
    Ok(())
}

#[tokio::test]
async fn every_insert_has_the_same_column_clause() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let mut contents = String::from("When;Took;Who;What\n");
    for i in 0..50 {
        contents.push_str(&format!("02/02/2021 10:00:{:02}.000;{i};u{i};a\n", i % 60));
    }
    let source = write_source(src.path(), "many.csv", &contents);

    let summary = completed(engine(true).convert(&source, dest.path(), &|| false).await?);
    assert_eq!(summary.rows_written, 50);

    let sql = fs::read_to_string(dest.path().join("many.sql"))?;
    let lines: Vec<&str> = sql.lines().collect();
    assert_eq!(lines.len(), 51);
    assert_eq!(lines[50], "COMMIT;");
    for (i, line) in lines[..50].iter().enumerate() {
        assert!(line.starts_with("INSERT INTO LOG (LOG_TIME,RESPONSE_TIME,Who,What) VALUES ("));
        assert!(line.contains(&format!(",{i},'u{i}','a');")), "{line}");
    }
    Ok(())
}

#[tokio::test]
async fn short_rows_narrow_the_column_clause() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(src.path(), "short.csv", &format!("{HEADER}\n01/01/2020 00:00:00.000;5\n"));

    completed(engine(true).convert(&source, dest.path(), &|| false).await?);

    let sql = fs::read_to_string(dest.path().join("short.sql"))?;
    assert_eq!(
        sql,
        "INSERT INTO LOG (LOG_TIME,RESPONSE_TIME) VALUES (TIMESTAMP '2020-1-01 00:00:00.000',5);\nCOMMIT;\n"
    );
    Ok(())
}

#[tokio::test]
async fn extra_fields_fail_with_line_and_remove_output() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(
        src.path(),
        "wide.csv",
        &format!("{HEADER}\n01/01/2020 00:00:00.000;1;ok\n24/03/1998 04:21:23.456;42;ok;LOST DATA\n"),
    );

    let err = engine(true)
        .convert(&source, dest.path(), &|| false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Csv2SqlError::Field {
            line: 3,
            source: FieldError::TooManyFields { expected: 3, found: 4 },
            ..
        }
    ));
    assert!(!dest.path().join("wide.sql").exists());
    Ok(())
}

#[tokio::test]
async fn whitespace_around_separator_is_ignored_for_timestamps() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(
        src.path(),
        "padded.csv",
        "Date;Took;Msg\n24/03/1998 04:21:23.456 ;42;ok\n",
    );

    completed(engine(true).convert(&source, dest.path(), &|| false).await?);

    let sql = fs::read_to_string(dest.path().join("padded.sql"))?;
    assert_eq!(
        sql,
        "INSERT INTO LOG (LOG_TIME,RESPONSE_TIME,Msg) VALUES (TIMESTAMP '1998-3-24 04:21:23.456',42,'ok');\nCOMMIT;\n"
    );
    Ok(())
}

#[tokio::test]
async fn bad_timestamp_fails_with_line_and_removes_output() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(
        src.path(),
        "broken.csv",
        &format!("{HEADER}\n01/01/2020 00:00:00.000;1;ok\n\n2020-01-01;2;bad\n"),
    );

    let err = engine(true)
        .convert(&source, dest.path(), &|| false)
        .await
        .unwrap_err();
    match err {
        Csv2SqlError::Field { file, line, source } => {
            assert_eq!(file, "broken.csv");
            assert_eq!(line, 4);
            assert!(matches!(source, FieldError::Timestamp { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!dest.path().join("broken.sql").exists());
    Ok(())
}

#[tokio::test]
async fn bad_response_time_is_a_field_error() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(src.path(), "rt.csv", &format!("{HEADER}\n01/01/2020 00:00:00.000;fast;ok\n"));

    let err = engine(true)
        .convert(&source, dest.path(), &|| false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Csv2SqlError::Field {
            line: 2,
            source: FieldError::ResponseTime { .. },
            ..
        }
    ));
    assert!(!dest.path().join("rt.sql").exists());
    Ok(())
}

#[tokio::test]
async fn cancellation_aborts_and_deletes_destination() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let mut contents = format!("{HEADER}\n");
    for i in 0..10 {
        contents.push_str(&format!("01/01/2020 00:00:0{i}.000;{i};row\n"));
    }
    let source = write_source(src.path(), "cancel.csv", &contents);

    let polls = AtomicUsize::new(0);
    let signal = || polls.fetch_add(1, Ordering::SeqCst) + 1 >= 3;
    let outcome = engine(true).convert(&source, dest.path(), &signal).await?;

    assert!(matches!(outcome, ConversionOutcome::Aborted));
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert!(!dest.path().join("cancel.sql").exists());
    Ok(())
}

#[tokio::test]
async fn existing_destination_is_left_untouched() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(src.path(), "dup.csv", &format!("{HEADER}\n01/01/2020 00:00:00.000;1;ok\n"));
    let existing = dest.path().join("dup.sql");
    fs::write(&existing, "-- hand written\n")?;

    let err = engine(true)
        .convert(&source, dest.path(), &|| false)
        .await
        .unwrap_err();
    assert!(matches!(err, Csv2SqlError::DestinationExists(ref p) if *p == existing));
    assert_eq!(fs::read_to_string(&existing)?, "-- hand written\n");
    Ok(())
}

#[tokio::test]
async fn empty_source_gives_empty_destination() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(src.path(), "empty.CSV", "");

    let summary = completed(engine(true).convert(&source, dest.path(), &|| false).await?);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(fs::read(dest.path().join("empty.sql"))?, b"");
    Ok(())
}

#[tokio::test]
async fn header_only_source_gives_commit_only() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let source = write_source(src.path(), "header.csv", &format!("{HEADER}\n\n"));

    let summary = completed(engine(true).convert(&source, dest.path(), &|| false).await?);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(summary.blank_lines, 1);
    assert_eq!(fs::read_to_string(dest.path().join("header.sql"))?, "COMMIT;\n");
    Ok(())
}

#[tokio::test]
async fn missing_source_creates_nothing() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;

    let err = engine(true)
        .convert(&src.path().join("nope.csv"), dest.path(), &|| false)
        .await
        .unwrap_err();
    assert!(matches!(err, Csv2SqlError::Io(_)));
    assert!(!dest.path().join("nope.sql").exists());
    Ok(())
}

#[tokio::test]
async fn gzip_source_is_decompressed() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let gz_path = src.path().join("zipped.csv.gz");

    let file = tokio::fs::File::create(&gz_path).await?;
    let mut encoder = async_compression::tokio::write::GzipEncoder::new(file);
    encoder
        .write_all(format!("{HEADER}\r\n01/01/2020 00:00:00.000;3;gz\r\n").as_bytes())
        .await?;
    encoder.shutdown().await?;

    let summary = completed(engine(true).convert(&gz_path, dest.path(), &|| false).await?);
    assert_eq!(summary.rows_written, 1);
    let sql = fs::read_to_string(dest.path().join("zipped.sql"))?;
    assert!(sql.ends_with(",3,'gz');\nCOMMIT;\n"), "{sql}");
    Ok(())
}

#[tokio::test]
async fn latin1_source_is_transcoded() -> anyhow::Result<()> {
    let src = tempfile::tempdir()?;
    let dest = tempfile::tempdir()?;
    let path = src.path().join("latin.csv");
    fs::write(&path, b"Date;Took;Caf\xe9\n01/01/2020 00:00:00.000;1;cr\xe8me\n")?;

    let config = ConversionConfig::builder("LOG").charset("windows-1252").build()?;
    completed(ConversionEngine::new(config).convert(&path, dest.path(), &|| false).await?);

    let sql = fs::read_to_string(dest.path().join("latin.sql"))?;
    assert!(sql.starts_with("INSERT INTO LOG (LOG_TIME,RESPONSE_TIME,Caf_) VALUES ("), "{sql}");
    assert!(sql.contains("'crème'"));
    Ok(())
}
