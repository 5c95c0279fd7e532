//! Integration tests for instruction-file text extraction.
//!
//! Well-formed PDF, DOCX, CSV and plain-text samples must yield their text;
//! corrupt or unsupported files must degrade to an empty string.

use std::path::Path;
use std::process::Command;

use rule_profiler::extract::{self, MIME_CSV, MIME_DOCX, MIME_PDF, MIME_TEXT};
use tempfile::TempDir;

const PHRASE: &str = "Transaction Amount must be non-negative";

/// Minimal single-page PDF showing `phrase` in Helvetica, with a correct xref table.
fn minimal_pdf_with_text(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Minimal DOCX: a ZIP holding only `word/document.xml` with two paragraphs.
fn minimal_docx_with_paragraphs(first: &str, second: &str) -> Vec<u8> {
    use std::io::Write;
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            first, second
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[tokio::test]
async fn pdf_text_is_extracted() {
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "rules.pdf", &minimal_pdf_with_text(PHRASE));
    let text = extract::extract(&path, MIME_PDF).await;
    assert!(text.contains(PHRASE), "got: {:?}", text);
}

#[tokio::test]
async fn docx_paragraphs_are_extracted_as_lines() {
    let tmp = TempDir::new().unwrap();
    let path = write(
        tmp.path(),
        "rules.docx",
        &minimal_docx_with_paragraphs(PHRASE, "Currency must be ISO 4217"),
    );
    let text = extract::extract(&path, MIME_DOCX).await;
    assert_eq!(text, format!("{}\nCurrency must be ISO 4217", PHRASE));
}

#[tokio::test]
async fn csv_and_text_are_extracted() {
    let tmp = TempDir::new().unwrap();
    let csv = write(tmp.path(), "rules.csv", b"field,rule\namount,\">= 0\"\n");
    let text = extract::extract(&csv, MIME_CSV).await;
    assert!(text.starts_with("field,rule\n"));
    assert!(text.contains(">= 0"));

    let txt = write(tmp.path(), "rules.txt", PHRASE.as_bytes());
    assert_eq!(
        extract::extract(&txt, "text/plain; charset=utf-8").await,
        PHRASE
    );
}

#[tokio::test]
async fn corrupt_and_unsupported_files_degrade_to_empty() {
    let tmp = TempDir::new().unwrap();
    let bad_pdf = write(tmp.path(), "bad.pdf", b"%PDF-1.4 this is not really a pdf");
    assert_eq!(extract::extract(&bad_pdf, MIME_PDF).await, "");

    let bad_docx = write(tmp.path(), "bad.docx", b"PK not a zip");
    assert_eq!(extract::extract(&bad_docx, MIME_DOCX).await, "");

    let no_body = {
        use std::io::Write;
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("docProps/app.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        buf
    };
    let docx_without_body = write(tmp.path(), "empty.docx", &no_body);
    assert_eq!(extract::extract(&docx_without_body, MIME_DOCX).await, "");

    let binary = write(tmp.path(), "blob.bin", &[0u8, 1, 2, 3]);
    assert_eq!(
        extract::extract(&binary, "application/octet-stream").await,
        ""
    );
    assert_eq!(extract::extract(&binary, MIME_TEXT).await, "\u{0}\u{1}\u{2}\u{3}");
}

#[test]
fn cli_extract_prints_document_text() {
    let tmp = TempDir::new().unwrap();
    let path = write(
        tmp.path(),
        "rules.docx",
        &minimal_docx_with_paragraphs(PHRASE, "Second rule"),
    );

    let output = Command::new(env!("CARGO_BIN_EXE_rprof"))
        .arg("extract")
        .arg(&path)
        .output()
        .expect("failed to run rprof");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(PHRASE));
    assert!(stdout.contains("Second rule"));
}

#[test]
fn cli_extract_requires_known_type() {
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "rules.unknown", b"text");
    let output = Command::new(env!("CARGO_BIN_EXE_rprof"))
        .arg("extract")
        .arg(&path)
        .output()
        .expect("failed to run rprof");
    assert!(!output.status.success());
}

#[test]
fn cli_extract_fails_on_corrupt_file() {
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "broken.docx", b"PK not a zip");
    let output = Command::new(env!("CARGO_BIN_EXE_rprof"))
        .arg("extract")
        .arg(&path)
        .output()
        .expect("failed to run rprof");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to extract text"), "stderr: {}", stderr);
}
