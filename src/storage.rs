//! Scratch file storage for uploads, archived LLM replies, scripts and reports.
//!
//! Upload placement is a lookup table from multipart field name to a
//! [`Destination`]. Built-in entries cover the instruction and dataset fields;
//! `[[storage.destinations]]` entries in the config add or override fields
//! without touching code. Unknown fields land in the storage root.
//!
//! ```text
//! <root>/
//!   instructions/           instructionsFile uploads
//!   datasets/               datasetFile and profiling uploads
//!   instructions-response/  archived raw rule arrays
//!   scripts/                generated validation scripts
//!   reports/                profiling reports (deleted after download)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;

pub const FIELD_INSTRUCTIONS: &str = "instructionsFile";
pub const FIELD_DATASET: &str = "datasetFile";
pub const FIELD_PROFILE_DATASET: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Directory relative to the storage root; empty means the root itself.
    pub dir: String,
    pub prefix: String,
}

impl Destination {
    fn new(dir: &str, prefix: &str) -> Self {
        Self {
            dir: dir.to_string(),
            prefix: prefix.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    destinations: HashMap<String, Destination>,
    fallback: Destination,
}

impl FileStorage {
    pub fn new(config: &StorageConfig) -> Self {
        let mut destinations = HashMap::from([
            (
                FIELD_INSTRUCTIONS.to_string(),
                Destination::new("instructions", "instructions"),
            ),
            (
                FIELD_DATASET.to_string(),
                Destination::new("datasets", "dataset"),
            ),
            (
                FIELD_PROFILE_DATASET.to_string(),
                Destination::new("datasets", "dataset"),
            ),
        ]);
        for d in &config.destinations {
            destinations.insert(d.field.clone(), Destination::new(&d.dir, &d.prefix));
        }

        Self {
            root: config.root.clone(),
            destinations,
            fallback: Destination::new("", "file"),
        }
    }

    pub fn destination_for(&self, field: &str) -> &Destination {
        self.destinations.get(field).unwrap_or(&self.fallback)
    }

    /// Writes an uploaded file to its field's directory under a unique name.
    pub async fn save_upload(
        &self,
        field: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let dest = self.destination_for(field);
        let dir = self.root.join(&dest.dir);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(unique_file_name(&dest.prefix, original_name));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("instructions-response")
    }

    /// Deterministic per document, so a regenerated script replaces the previous one.
    pub fn script_path(&self, document_id: &str, extension: &str) -> PathBuf {
        self.root.join("scripts").join(format!(
            "temp_script_{}.{}",
            sanitize_file_name(document_id),
            extension
        ))
    }

    pub fn report_path(&self, document_id: &str) -> PathBuf {
        self.root.join("reports").join(format!(
            "{}-{}.csv",
            sanitize_file_name(document_id),
            chrono::Utc::now().timestamp_millis()
        ))
    }
}

/// Whitespace becomes `_`; anything outside `[A-Za-z0-9_.-]` is dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// `<prefix>-<unix millis>-<8 hex chars>-<sanitized name>`.
pub fn unique_file_name(prefix: &str, original_name: &str) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}-{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        &nonce[..8],
        sanitize_file_name(original_name)
    )
}
