//! End-to-end conversions through the public engine facade.

use docshift_core::converter::{CapabilityRegistry, ConverterConfig, StrategyRegistry};
use docshift_core::testing::fixtures;
use docshift_core::{
    Config, ConversionEngine, Delivery, ErrorKind, ErrorReport, FormatTag, SourceFile,
};
use serde_json::Value;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("docshift_core=debug")
        .with_test_writer()
        .try_init();
}

fn engine() -> ConversionEngine {
    init_tracing();
    ConversionEngine::new(Config::default())
}

async fn convert(name: &str, bytes: impl Into<Vec<u8>>, target: FormatTag) -> Result<Delivery, ErrorReport> {
    engine().convert_single(SourceFile::new(name, bytes), target).await
}

/// Reads the `MediaBox` of the first page.
fn media_box(pdf: &[u8]) -> (f32, f32) {
    let doc = lopdf::Document::load_mem(pdf).unwrap();
    let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let values: Vec<f32> = page
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect();
    (values[2] - values[0], values[3] - values[1])
}

#[tokio::test]
async fn whitespace_text_to_pdf_has_no_content() {
    let err = convert("notes.txt", "   \n\t  \n", FormatTag::Pdf).await.unwrap_err();
    assert_eq!(err.message, "No content found");
    assert_eq!(err.file_name.as_deref(), Some("notes.txt"));
}

#[tokio::test]
async fn docx_to_txt_yields_raw_text() {
    let docx = fixtures::docx_from_paragraphs(&["Quarterly report", "Revenue grew & costs fell."]);
    let delivery = convert("report.docx", docx, FormatTag::PlainText).await.unwrap();

    let artifact = delivery.artifact();
    assert_eq!(artifact.file_name, "report.txt");
    assert_eq!(artifact.mime_type, "text/plain");
    assert_eq!(
        String::from_utf8(artifact.bytes.clone()).unwrap(),
        "Quarterly report\nRevenue grew & costs fell."
    );
}

#[tokio::test]
async fn png_to_pdf_keeps_aspect_ratio() {
    let delivery = convert("photo.png", fixtures::png(40, 20), FormatTag::Pdf).await.unwrap();
    let artifact = delivery.artifact();
    assert_eq!(artifact.file_name, "photo.pdf");

    let (width, height) = media_box(&artifact.bytes);
    assert!((width - 595.28).abs() < 0.01);
    assert!((width / height - 2.0).abs() < 0.01);
}

#[tokio::test]
async fn pdf_first_page_renders_to_png_at_double_scale() {
    let pdf = convert("photo.png", fixtures::png(40, 20), FormatTag::Pdf)
        .await
        .unwrap()
        .into_artifact();
    let (width, height) = media_box(&pdf.bytes);

    let delivery = convert("photo.pdf", pdf.bytes, FormatTag::Png).await.unwrap();
    let artifact = delivery.artifact();
    assert_eq!(artifact.file_name, "photo.png");
    assert_eq!(artifact.mime_type, "image/png");

    let image = image::load_from_memory_with_format(&artifact.bytes, image::ImageFormat::Png).unwrap();
    assert!((i64::from(image.width()) - (width * 2.0).round() as i64).abs() <= 1);
    assert!((i64::from(image.height()) - (height * 2.0).round() as i64).abs() <= 1);
}

#[tokio::test]
async fn text_pdf_renders_to_jpeg() {
    let pdf = convert("notes.txt", "first line\nsecond line", FormatTag::Pdf)
        .await
        .unwrap()
        .into_artifact();

    let delivery = convert("notes.pdf", pdf.bytes, FormatTag::Jpeg).await.unwrap();
    let image = image::load_from_memory_with_format(&delivery.artifact().bytes, image::ImageFormat::Jpeg)
        .unwrap();
    assert!((1190..=1192).contains(&image.width()));
    assert!((1683..=1685).contains(&image.height()));
}

#[tokio::test]
async fn svg_renders_to_png_at_intrinsic_size() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="30" height="10"><circle cx="5" cy="5" r="4" fill="blue"/></svg>"#;
    let delivery = convert("logo.svg", svg, FormatTag::Png).await.unwrap();
    assert_eq!(delivery.artifact().file_name, "logo.png");

    let image = image::load_from_memory_with_format(&delivery.artifact().bytes, image::ImageFormat::Png).unwrap();
    assert_eq!((image.width(), image.height()), (30, 10));
}

#[tokio::test]
async fn missing_edge_fails_fast() {
    assert!(!CapabilityRegistry::can_convert(FormatTag::Json, FormatTag::Webp));

    let err = engine()
        .dispatcher()
        .dispatch(&SourceFile::new("data.json", "not even json"), FormatTag::Webp)
        .await
        .unwrap_err();
    // Capability, not extraction: the bytes were never parsed.
    assert_eq!(err.kind, ErrorKind::Capability);
}

#[tokio::test]
async fn json_csv_json_round_trip() {
    let json = r#"[{"name": "ann", "age": 31, "admin": true}, {"name": "bob, jr", "age": 40, "admin": false}]"#;
    let csv = convert("people.json", json, FormatTag::Csv).await.unwrap().into_artifact();
    assert_eq!(
        String::from_utf8(csv.bytes.clone()).unwrap(),
        "name,age,admin\r\nann,31,true\r\n\"bob, jr\",40,false\r\n"
    );

    let back = convert("people.csv", csv.bytes, FormatTag::Json).await.unwrap().into_artifact();
    let original: Vec<Value> = serde_json::from_str(json).unwrap();
    let round_trip: Vec<Value> = serde_json::from_slice(&back.bytes).unwrap();

    assert_eq!(round_trip.len(), original.len());
    for (before, after) in original.iter().zip(&round_trip) {
        for (key, value) in before.as_object().unwrap() {
            let expected = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            assert_eq!(after[key], Value::String(expected));
        }
    }
}

#[tokio::test]
async fn conversions_are_deterministic() {
    let docx = fixtures::docx_from_paragraphs(&["One", "Two"]);
    let cases: Vec<(&str, Vec<u8>, FormatTag)> = vec![
        ("a.txt", b"hello\nworld".to_vec(), FormatTag::Pdf),
        ("a.txt", b"hello".to_vec(), FormatTag::Docx),
        ("a.md", b"# Title\n\n| a | b |\n|---|---|\n| 1 | 2 |".to_vec(), FormatTag::Pdf),
        ("a.csv", b"a,b\n1,2".to_vec(), FormatTag::Xlsx),
        ("a.docx", docx.clone(), FormatTag::Pdf),
        ("a.docx", docx, FormatTag::Pptx),
        ("a.png", fixtures::png(8, 8), FormatTag::Pdf),
    ];

    for (name, bytes, target) in cases {
        let first = convert(name, bytes.clone(), target).await.unwrap().into_artifact();
        let second = convert(name, bytes, target).await.unwrap().into_artifact();
        assert_eq!(first.bytes, second.bytes, "{} -> {}", name, target);
    }
}

#[tokio::test]
async fn markdown_renders_tables_and_breaks() {
    let md = "# Plan\n\nline one\nline two\n\n| k | v |\n|---|---|\n| a | 1 |\n";
    let html = convert("plan.md", md, FormatTag::Html).await.unwrap().into_artifact();
    let html = String::from_utf8(html.bytes).unwrap();
    assert!(html.contains("<h1>Plan</h1>"));
    assert!(html.contains("<br"));
    assert!(html.contains("<table>"));
    assert!(html.contains("<title>plan</title>"));
}

#[tokio::test]
async fn xml_to_json() {
    let xml = "<items><item>1</item><item>two</item></items>";
    let json = convert("items.xml", xml, FormatTag::Json).await.unwrap().into_artifact();
    let value: Value = serde_json::from_slice(&json.bytes).unwrap();
    assert_eq!(value, serde_json::json!({"items": {"item": [1, "two"]}}));
}

#[tokio::test]
async fn xlsx_to_csv() {
    let xlsx = fixtures::xlsx(&[&["city", "pop"], &["Oslo", "709000"]]);
    let csv = convert("cities.xlsx", xlsx, FormatTag::Csv).await.unwrap().into_artifact();
    assert_eq!(csv.bytes, b"city,pop\r\nOslo,709000\r\n");
}

#[tokio::test]
async fn content_type_never_overrides_extension() {
    let file = SourceFile::new("data.csv", "a,b\n1,2").with_content_type("application/pdf");
    let delivery = engine().convert_single(file, FormatTag::Json).await.unwrap();
    assert_eq!(delivery.artifact().file_name, "data.json");
}

#[test]
fn every_capability_edge_has_a_strategy() {
    let registry = StrategyRegistry::with_defaults(&ConverterConfig::default());
    assert!(registry.missing_edges().is_empty());
    assert_eq!(registry.len(), CapabilityRegistry::edges().count());
}

#[test]
fn error_report_serialization() {
    let report = tokio_test::block_on(convert("setup.exe", "MZ", FormatTag::Pdf)).unwrap_err();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["file_name"], "setup.exe");
    assert!(value["message"].as_str().unwrap().contains("exe"));

    let general = serde_json::to_value(ErrorReport::general("No files selected")).unwrap();
    assert!(general.get("file_name").is_none());
}
