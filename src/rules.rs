//! Rule extraction and rule updates through the LLM.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::dataset::{self, DatasetSample};
use crate::error::PipelineError;
use crate::llm::LlmClient;
use crate::models::Rule;
use crate::parse;
use crate::prompts;
use crate::storage::sanitize_file_name;

/// Derives and revises rule-sets. Cheap to clone; shares the process-wide LLM client.
#[derive(Clone)]
pub struct RuleExtractor {
    llm: Arc<dyn LlmClient>,
    archive_dir: PathBuf,
}

impl RuleExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            llm,
            archive_dir: archive_dir.into(),
        }
    }

    /// Turns instruction text into a rule-set.
    ///
    /// Fails with [`PipelineError::RuleExtractionFailed`] when the LLM call
    /// fails or its reply holds no parseable array; callers must then not
    /// persist a document. On success the raw array text is archived.
    pub async fn extract_rules(
        &self,
        document_text: &str,
        dataset_sample: Option<&Path>,
        document_name: &str,
    ) -> Result<Vec<Rule>, PipelineError> {
        let sample = match dataset_sample {
            Some(path) => load_sample(path).await,
            None => None,
        };

        let prompt = prompts::rule_extraction(document_text, sample.as_ref());
        let reply = self
            .llm
            .complete(&prompt)
            .await
            .map_err(PipelineError::extraction)?;

        let parsed = parse::parse_rule_array(&reply).map_err(|e| {
            warn!(document = document_name, error = %e, "LLM reply held no usable rule array");
            PipelineError::extraction(e)
        })?;

        self.archive(document_name, &parsed.raw).await;
        info!(
            document = document_name,
            rules = parsed.rules.len(),
            model = self.llm.model_name(),
            "extracted rules"
        );
        Ok(parsed.rules)
    }

    /// Applies a free-text change to an existing rule-set.
    ///
    /// Returns an empty vector when the call or the parse fails. An empty
    /// result means "no change applied": never store it over existing rules.
    pub async fn update_rules(&self, existing_rules_json: &str, instruction: &str) -> Vec<Rule> {
        let prompt = prompts::rule_update(existing_rules_json, instruction);
        let reply = match self.llm.complete(&prompt).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "rule update call failed");
                return Vec::new();
            }
        };

        match parse::parse_rule_array(&reply) {
            Ok(parsed) => parsed.rules,
            Err(e) => {
                warn!(error = %e, "rule update reply held no usable rule array");
                Vec::new()
            }
        }
    }

    /// Best effort: a failed archive write is logged and ignored.
    async fn archive(&self, document_name: &str, raw: &str) {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
        let path = self
            .archive_dir
            .join(format!("{}-{}.txt", sanitize_file_name(document_name), timestamp));

        let result = async {
            tokio::fs::create_dir_all(&self.archive_dir).await?;
            tokio::fs::write(&path, raw).await
        }
        .await;

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "could not archive rule extraction reply");
        }
    }
}

/// A sample that cannot be read only costs the prompt its dataset hint.
async fn load_sample(path: &Path) -> Option<DatasetSample> {
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || dataset::read_sample(&owned)).await {
        Ok(Ok(sample)) => Some(sample),
        Ok(Err(e)) => {
            warn!(path = %path.display(), error = %e, "could not read dataset sample");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "dataset sample reader aborted");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedReply {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedReply {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for FixedReply {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|_| LlmError::Communication("connection refused".to_string()))
        }
    }

    const REPLY: &str = "```json\n[{\"field_name\":\"Transaction Amount\",\"rule_name\":\"Non-Negative Amount\",\"description\":\"Amounts cannot be negative\",\"data_type\":\"float\",\"validation_logic\":\"amount >= 0\",\"error_message\":\"Transaction Amount must be non-negative\",\"allowable_values\":\">= 0\"}]\n```";

    #[tokio::test]
    async fn extraction_archives_raw_array() {
        let tmp = TempDir::new().unwrap();
        let llm = FixedReply::ok(REPLY);
        let extractor = RuleExtractor::new(llm.clone(), tmp.path().join("archive"));

        let rules = extractor
            .extract_rules("Transaction Amount must be non-negative", None, "My Doc")
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].data_type, "float");

        let archived: Vec<_> = std::fs::read_dir(tmp.path().join("archive"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(archived.len(), 1);
        let name = archived[0].file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("My_Doc-"), "{}", name);
        let content = std::fs::read_to_string(&archived[0]).unwrap();
        assert!(content.starts_with('[') && content.ends_with(']'));
        assert!(!content.contains('`'));
    }

    #[tokio::test]
    async fn extraction_prompt_includes_dataset_sample() {
        let tmp = TempDir::new().unwrap();
        let sample = tmp.path().join("sample.csv");
        std::fs::write(&sample, "amount,currency\n12.5,USD\n").unwrap();
        let llm = FixedReply::ok(REPLY);
        let extractor = RuleExtractor::new(llm.clone(), tmp.path().join("archive"));

        extractor
            .extract_rules("text", Some(&sample), "doc")
            .await
            .unwrap();
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("header (amount,currency) and data something like (12.5,USD)"));
    }

    #[tokio::test]
    async fn unreadable_sample_still_extracts() {
        let tmp = TempDir::new().unwrap();
        let extractor = RuleExtractor::new(FixedReply::ok(REPLY), tmp.path().join("archive"));
        let rules = extractor
            .extract_rules("text", Some(Path::new("/no/such.csv")), "doc")
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[tokio::test]
    async fn unparseable_reply_fails_without_archive() {
        let tmp = TempDir::new().unwrap();
        let extractor =
            RuleExtractor::new(FixedReply::ok("Sorry, no rules here."), tmp.path().join("archive"));
        let err = extractor.extract_rules("text", None, "doc").await.unwrap_err();
        assert!(matches!(err, PipelineError::RuleExtractionFailed(_)));
        assert!(!tmp.path().join("archive").exists());
    }

    #[tokio::test]
    async fn llm_failure_fails_extraction() {
        let tmp = TempDir::new().unwrap();
        let extractor = RuleExtractor::new(FixedReply::failing(), tmp.path());
        let err = extractor.extract_rules("text", None, "doc").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn update_embeds_rules_and_returns_new_set() {
        let tmp = TempDir::new().unwrap();
        let llm = FixedReply::ok(
            r#"[{"rule_name":"first"},{"rule_name":"second","data_type":"integer"}]"#,
        );
        let extractor = RuleExtractor::new(llm.clone(), tmp.path());
        let rules = extractor
            .update_rules(r#"[{"rule_name":"first"}]"#, "add an integer rule")
            .await;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].rule_name, "second");
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains(r#"[{"rule_name":"first"}]"#));
        assert!(prompts[0].contains("add an integer rule"));
    }

    #[tokio::test]
    async fn update_failures_return_empty() {
        let tmp = TempDir::new().unwrap();
        let malformed = RuleExtractor::new(FixedReply::ok("[{oops}]"), tmp.path());
        assert!(malformed.update_rules("[]", "x").await.is_empty());

        let failing = RuleExtractor::new(FixedReply::failing(), tmp.path());
        assert!(failing.update_rules("[]", "x").await.is_empty());
    }
}
