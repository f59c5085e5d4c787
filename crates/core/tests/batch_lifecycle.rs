//! Batch lifecycle integration tests.
//!
//! These tests drive `ConversionEngine::convert_batch` end to end:
//! - Partial failures are isolated and reported
//! - Progress strictly increases and ends at 100
//! - Multi-file output is archived, single-file output is not

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use docshift_core::testing::MockStrategy;
use docshift_core::{
    Config, ConversionEngine, ErrorKind, FormatTag, ProcessorConfig, SourceFile, StrategyRegistry,
};

fn archive_entries(zip: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(zip)).unwrap();
    let mut entries: Vec<_> = (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).unwrap();
            (file.name().to_string(), bytes)
        })
        .collect();
    entries.sort();
    entries
}

#[tokio::test]
async fn mixed_batch_converts_what_it_can() {
    let engine = ConversionEngine::new(Config::default());
    let files = vec![
        SourceFile::new("people.json", r#"[{"id": 1}, {"id": 2}]"#),
        SourceFile::new("feed.xml", "<feed><item>1</item></feed>"),
        SourceFile::new("setup.exe", "MZ"),
    ];
    let mut progress = Vec::new();

    let batch = engine
        .convert_batch(files, FormatTag::Csv, |p| progress.push(p))
        .await
        .unwrap();

    // xml -> csv has no edge, so the xml file fails on capability.
    assert_eq!(batch.summary.total, 3);
    assert_eq!(batch.summary.succeeded, 1);
    assert_eq!(batch.summary.failed, 2);
    assert_eq!(progress.len(), 3);
    assert_eq!(*progress.last().unwrap(), 100.0);
    assert!(progress.windows(2).all(|w| w[1] > w[0]));

    let mut kinds: Vec<_> = batch
        .delivery
        .failures()
        .iter()
        .map(|f| (f.file_name.clone(), f.kind))
        .collect();
    kinds.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        kinds,
        vec![
            ("feed.xml".to_string(), ErrorKind::Capability),
            ("setup.exe".to_string(), ErrorKind::Classification),
        ]
    );
    assert!(batch.delivery.is_archive());
}

#[tokio::test]
async fn json_csv_exe_batch_yields_two_artifacts_and_one_failure() {
    let engine = ConversionEngine::new(Config::default());
    let files = vec![
        SourceFile::new("people.json", r#"[{"id": 1}, {"id": 2}]"#),
        SourceFile::new("cities.csv", "city,country\nOslo,Norway\n\nRome,Italy\n"),
        SourceFile::new("setup.exe", "MZ"),
    ];
    let mut progress = Vec::new();

    let batch = engine
        .convert_batch(files, FormatTag::Csv, |p| progress.push(p))
        .await
        .unwrap();

    assert_eq!(batch.summary.total, 3);
    assert_eq!(batch.summary.succeeded, 2);
    assert_eq!(batch.summary.failed, 1);

    let artifact = batch.delivery.artifact();
    assert_eq!(artifact.file_name, "converted_files.zip");
    assert_eq!(artifact.mime_type, "application/zip");
    assert_eq!(
        archive_entries(&artifact.bytes),
        vec![
            (
                "cities.csv".to_string(),
                b"city,country\r\nOslo,Norway\r\nRome,Italy\r\n".to_vec()
            ),
            ("people.csv".to_string(), b"id\r\n1\r\n2\r\n".to_vec()),
        ]
    );

    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].file_name.as_deref(), Some("setup.exe"));
    assert_eq!(batch.delivery.failures().len(), 1);
    assert_eq!(batch.delivery.failures()[0].kind, ErrorKind::Classification);
    assert_eq!(progress.len(), 3);
    assert!(progress.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(*progress.last().unwrap(), 100.0);
}

#[tokio::test]
async fn single_file_batch_is_delivered_directly() {
    let engine = ConversionEngine::new(Config::default());
    let batch = engine
        .convert_batch(vec![SourceFile::new("a.txt", "hi")], FormatTag::Html, |_| {})
        .await
        .unwrap();
    assert!(!batch.delivery.is_archive());
    assert_eq!(batch.delivery.artifact().file_name, "a.html");
    assert!(batch.failures.is_empty());
}

#[tokio::test]
async fn archive_names_are_deduplicated() {
    let engine = ConversionEngine::new(Config::default());
    let files = vec![
        SourceFile::new("a/notes.txt", "first"),
        SourceFile::new("b/notes.txt", "second"),
    ];
    let batch = engine.convert_batch(files, FormatTag::Html, |_| {}).await.unwrap();

    let names: Vec<_> = archive_entries(&batch.delivery.artifact().bytes)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["notes (1).html", "notes.html"]);
}

#[tokio::test]
async fn large_batch_respects_concurrency() {
    let mock = MockStrategy::new(vec![(FormatTag::PlainText, FormatTag::Pdf)])
        .with_delay(Duration::from_millis(10));
    mock.fail_file("f3.txt");
    mock.fail_file("f7.txt");
    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(mock.clone()));

    let config = Config {
        processor: ProcessorConfig::default()
            .with_concurrency(4)
            .with_archive_name("out.zip"),
        ..Config::default()
    };
    let engine = ConversionEngine::with_strategies(config, registry);

    let files = (0..12)
        .map(|i| SourceFile::new(format!("f{}.txt", i), "x"))
        .collect();
    let mut progress = Vec::new();
    let batch = engine
        .convert_batch(files, FormatTag::Pdf, |p| progress.push(p))
        .await
        .unwrap();

    assert_eq!(mock.call_count(), 12);
    assert!(mock.max_in_flight() <= 4);
    assert_eq!(progress.len(), 12);
    assert_eq!(*progress.last().unwrap(), 100.0);
    assert_eq!(batch.summary.succeeded, 10);
    assert_eq!(batch.delivery.artifact().file_name, "out.zip");
    assert_eq!(archive_entries(&batch.delivery.artifact().bytes).len(), 10);
    assert!(batch.summary.finished_at >= batch.summary.started_at);
}
