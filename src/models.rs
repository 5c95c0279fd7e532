//! Core data models: rules, documents and user accounts.
//!
//! A [`Rule`] is an opaque payload produced by the LLM. The backend never
//! interprets `validation_logic`; it stores the rule-set and hands it back to
//! the model for updates and script generation.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One validation constraint derived from regulatory instructions.
///
/// Field names match the snake_case keys the prompts ask the model to emit.
/// Deserialization is lenient: missing text fields become `""`, non-string
/// scalars are kept as their JSON text, and unknown keys survive in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, deserialize_with = "lenient_string")]
    pub field_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rule_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub validation_logic: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error_message: String,
    /// Ranges, code lists or free text; shape varies by model output.
    #[serde(default)]
    pub allowable_values: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Persisted record: uploaded instruction metadata plus its rule-set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source_file_name: String,
    pub source_file_path: String,
    pub owner_id: String,
    /// Unix milliseconds.
    pub created_at: i64,
    pub extracted_rules: Vec<Rule>,
}

/// A registered account. Deliberately not `Serialize`: the hash never leaves the store.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: i64,
}
