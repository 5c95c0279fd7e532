//! LLM synthesis of standalone validation scripts.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::llm::LlmClient;
use crate::models::Rule;
use crate::parse;
use crate::prompts;
use crate::storage::FileStorage;

#[derive(Clone)]
pub struct ScriptGenerator {
    llm: Arc<dyn LlmClient>,
    storage: FileStorage,
    language: String,
    extension: String,
}

impl ScriptGenerator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        storage: FileStorage,
        language: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            storage,
            language: language.into(),
            extension: extension.into(),
        }
    }

    /// Asks the model for a script validating `rules` and writes it to the
    /// document's scratch script path, replacing any earlier version.
    ///
    /// The script is invoked as `<interpreter> <script> <input.csv> <output.csv>`.
    pub async fn generate_script(
        &self,
        rules: &[Rule],
        csv_headers: &str,
        document_id: &str,
    ) -> Result<PathBuf, PipelineError> {
        let rules_json = serde_json::to_string(rules).map_err(PipelineError::generation)?;
        let prompt = prompts::script_generation(&rules_json, csv_headers, &self.language);
        debug!(document_id, prompt_len = prompt.len(), "requesting validation script");

        let reply = self
            .llm
            .complete(&prompt)
            .await
            .map_err(PipelineError::generation)?;

        let code = parse::extract_code_block(&reply);
        if code.is_empty() {
            return Err(PipelineError::generation("model returned no code"));
        }

        let path = self.storage.script_path(document_id, &self.extension);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, code).await?;
        info!(document_id, path = %path.display(), "wrote validation script");
        Ok(path)
    }
}
