//! Text extraction for uploaded instruction documents.
//!
//! [`extract_text`] is the strict, byte-level extractor: it returns a typed
//! error for unsupported or corrupt input. [`extract`] is what the upload flow
//! calls; it never fails and degrades to an empty string with a logged warning,
//! so a bad document still reaches the LLM (which then usually yields no rules).

use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_TEXT: &str = "text/plain";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    #[error("CSV extraction failed: {0}")]
    Csv(String),
    #[error("text is not valid UTF-8: {0}")]
    Text(String),
}

/// Strips MIME parameters and case: `Text/Plain; charset=utf-8` → `text/plain`.
pub fn normalize_content_type(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Content type implied by a file extension, for uploads sent without a
/// usable `Content-Type`.
pub fn content_type_for_name(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "docx" => Some(MIME_DOCX),
        "csv" => Some(MIME_CSV),
        "txt" | "text" => Some(MIME_TEXT),
        _ => None,
    }
}

/// Extracts plain text from document bytes of the given content type.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match normalize_content_type(content_type).as_str() {
        MIME_PDF => extract_pdf(bytes),
        MIME_DOCX => extract_docx(bytes),
        MIME_CSV => extract_csv(bytes),
        MIME_TEXT => String::from_utf8(bytes.to_vec()).map_err(|e| ExtractError::Text(e.to_string())),
        other => Err(ExtractError::UnsupportedContentType(other.to_string())),
    }
}

/// Reads `path` and extracts its text, returning `""` on any failure.
///
/// Parsing runs on the blocking pool; a panic inside a parser is caught there
/// and treated like any other extraction failure.
pub async fn extract(path: &Path, declared_content_type: &str) -> String {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read upload for extraction");
            return String::new();
        }
    };

    let content_type = declared_content_type.to_string();
    let result = tokio::task::spawn_blocking(move || extract_text(&bytes, &content_type)).await;

    match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(path = %path.display(), error = %e, "text extraction degraded to empty text");
            String::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "text extractor aborted");
            String::new()
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    extract_w_t_elements(&doc_xml)
}

/// Collects `w:t` runs; `w:p` ends a line, `w:tab` and `w:br` map to whitespace.
fn extract_w_t_elements(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

/// Re-serializes spreadsheet content as normalized CSV text.
fn extract_csv(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::Csv(e.to_string()))?;
        writer
            .write_record(&record)
            .map_err(|e| ExtractError::Csv(e.to_string()))?;
    }
    let out = writer
        .into_inner()
        .map_err(|e| ExtractError::Csv(e.to_string()))?;
    String::from_utf8(out).map_err(|e| ExtractError::Csv(e.to_string()))
}
