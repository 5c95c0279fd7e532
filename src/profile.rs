//! Dataset profiling: rules → generated script → executed report.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ProfilingConfig;
use crate::dataset;
use crate::error::PipelineError;
use crate::models::Document;
use crate::runner::{RunRequest, ScriptRunner};
use crate::script_gen::ScriptGenerator;
use crate::storage::FileStorage;

#[derive(Clone)]
pub struct Profiler {
    generator: ScriptGenerator,
    runner: ScriptRunner,
    storage: FileStorage,
    extension: String,
    max_retries: u32,
    /// Runs for one document share its script path, so they are serialized.
    running: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Profiler {
    pub fn new(generator: ScriptGenerator, storage: FileStorage, config: &ProfilingConfig) -> Self {
        let runner = ScriptRunner::new(
            config.interpreter.clone(),
            Duration::from_secs(config.timeout_secs),
            generator.clone(),
        );
        Self {
            generator,
            runner,
            storage,
            extension: config.script_extension.clone(),
            max_retries: config.max_retries,
            running: Arc::default(),
        }
    }

    /// Profiles `dataset` against the document's rules and returns the report bytes.
    ///
    /// The uploaded dataset, the generated script and the report are removed
    /// afterwards whether or not profiling succeeded.
    pub async fn profile(&self, document: &Document, dataset: &Path) -> Result<Vec<u8>, PipelineError> {
        let lock = self.document_lock(&document.id);
        let result = {
            let _running = lock.lock().await;
            self.profile_exclusive(document, dataset).await
        };
        self.release_document_lock(&document.id, lock);
        result
    }

    fn document_lock(&self, document_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        running.entry(document_id.to_string()).or_default().clone()
    }

    fn release_document_lock(&self, document_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        // The map holds one reference and `lock` the other; anything more is a waiter.
        if Arc::strong_count(&lock) <= 2 {
            running.remove(document_id);
        }
    }

    async fn profile_exclusive(&self, document: &Document, dataset: &Path) -> Result<Vec<u8>, PipelineError> {
        let script = self.storage.script_path(&document.id, &self.extension);
        let report = self.storage.report_path(&document.id);

        let result = self.run(document, dataset, &report).await;

        for path in [script.as_path(), report.as_path(), dataset] {
            remove_quietly(path).await;
        }
        result
    }

    async fn run(&self, document: &Document, dataset: &Path, report: &Path) -> Result<Vec<u8>, PipelineError> {
        if document.extracted_rules.is_empty() {
            return Err(PipelineError::NoRules);
        }

        let csv_headers = read_headers(dataset).await;
        if let Some(parent) = report.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let script = self
            .generator
            .generate_script(&document.extracted_rules, &csv_headers, &document.id)
            .await?;

        let request = RunRequest {
            input: dataset,
            output: report,
            rules: &document.extracted_rules,
            csv_headers: &csv_headers,
            document_id: &document.id,
        };
        let outcome = self.runner.run(&script, request, self.max_retries).await?;

        match tokio::fs::read(report).await {
            Ok(bytes) => {
                info!(
                    document_id = %document.id,
                    attempts = outcome.attempts,
                    bytes = bytes.len(),
                    "profiling report ready"
                );
                Ok(bytes)
            }
            Err(e) => Err(PipelineError::ScriptExecutionFailed {
                attempts: outcome.attempts,
                last_error: format!("script exited cleanly but wrote no report: {e}"),
            }),
        }
    }
}

/// Unreadable headers still produce a prompt; the model just sees none.
async fn read_headers(dataset: &Path) -> String {
    let owned = dataset.to_path_buf();
    match tokio::task::spawn_blocking(move || dataset::read_sample(&owned)).await {
        Ok(Ok(sample)) => sample.header_line(),
        Ok(Err(e)) => {
            warn!(path = %dataset.display(), error = %e, "could not read dataset headers");
            String::new()
        }
        Err(e) => {
            warn!(path = %dataset.display(), error = %e, "dataset header reader aborted");
            String::new()
        }
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove scratch file"),
    }
}
