//! Prompt templates for the three LLM calls.
//!
//! All three describe the same seven-field rule shape so that a rule-set can
//! travel from extraction to update to script generation unchanged.

use crate::dataset::DatasetSample;

const RULE_FIELDS: &str = r#"    #field_name: The name of the field being validated (e.g., "Transaction Amount", "Account Balance").

    #rule_name: A short name for the validation rule (e.g., "Amount Match", "Non-Negative Balance").

    #description: A detailed explanation of the rule based on the instruction.

    #data_type: The expected data type for the field (e.g., "float", "string", "date").

    #validation_logic: The logic or expression used for validation (e.g., "amount == reported_amount", "amount >= 0").

    #error_message: A message that will be displayed if the validation fails (e.g., "Transaction amount must match the reported amount").

    #allowable_values: Any predefined allowable values (e.g., ranges, specific country codes, or other predefined values)."#;

/// Prompt that turns regulatory instruction text into a JSON array of rules.
///
/// The dataset line is only included when both the header and a sample row exist.
pub fn rule_extraction(text: &str, sample: Option<&DatasetSample>) -> String {
    let dataset_line = sample
        .and_then(|s| {
            let row = s.first_row_line()?;
            (!s.headers.is_empty()).then(|| {
                format!(
                    "Transaction data csv to validate against those rules will have header ({}) and data something like ({})",
                    s.header_line(),
                    row
                )
            })
        })
        .unwrap_or_default();

    format!(
        r#"As a Data Analyst, I need to profile the transaction data. The following regulatory reporting instructions outline validation requirements for various transaction fields. The text below could contain varying types of instructions, descriptions, or conditions, which I need to interpret and automatically generate corresponding profiling rules in JSON format.

{text}

{dataset_line}

Your task is to:

1. Extract the key validation requirements for each instruction (e.g., conditions on values, ranges, types).

2. Interpret the instructions to create a validation rule for each field or condition described.

3. Automatically generate a valid JSON array of rules based on the extracted data. Each rule should follow this structure:

{RULE_FIELDS}

If there are multiple conditions for a field (like thresholds or ranges), include them as separate rules in the JSON array. Ensure the output is structured as an array of JSON array objects.
"#
    )
}

/// Prompt that applies a free-text change instruction to an existing rule-set.
pub fn rule_update(existing_rules_json: &str, instruction: &str) -> String {
    format!(
        r#"Make sure to keep json intact. Update the json regulatory rules below as per the instructions that follow.

Current rules:
{existing_rules_json}

Instructions:
{instruction}

Ensure to return the output in same structured way as array of JSON array objects
{RULE_FIELDS}

Keep all other rules intact, just make the changes, where ever asked to make. Return the complete updated array.
"#
    )
}

/// Prompt that asks for a standalone validation script.
///
/// The execution contract is fixed: argv[1] is the input CSV path and
/// argv[2] the report path to create.
pub fn script_generation(rules_json: &str, csv_headers: &str, language: &str) -> String {
    format!(
        r#"Generate an executable {language} script (executed independently) that validates CSV rows based on these rules: {rules_json}
and flags incorrect rows.

CSV will be having first row with header ({csv_headers})

The script should:
    Perform Data Validation & Profiling:
        Validate each CSV row based on the given rules and flag non-conforming rows.

        Provide automated explanations for flagged transactions to assist auditors.

        Suggest remediation actions for flagged records.

    Implement Unsupervised Machine Learning for Consistency Checks:

        Use clustering and anomaly detection techniques to identify inconsistent patterns in the data.

        Detect potential outliers or irregularities beyond rule-based validation.

    Adaptive Risk Scoring:

        Develop a risk scoring mechanism that evolves over time based on past regulatory violations and transaction trends.

        Continuously refine risk assessment based on historical patterns.

What will be input of the script:

    argument 1 : A path of CSV file containing transactional data.
    argument 2 : A name of the CSV that has to be created.

Expected script output:
    A csv report with columns ({csv_headers}) flagging non-compliant rows with explanations and suggested remediation. A risk score for each transaction that adapts based on historical data.

    Machine learning insights highlighting potential anomalies.

Ensure to Return ONLY the {language} script without explanations or comments and also that the script is modular, efficient, and can be executed independently.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_embeds_text_and_sample() {
        let sample = DatasetSample {
            headers: vec!["id".into(), "amount".into()],
            first_row: Some(vec!["1".into(), "9.99".into()]),
        };
        let prompt = rule_extraction("Amount must be non-negative", Some(&sample));
        assert!(prompt.contains("Amount must be non-negative"));
        assert!(prompt.contains("header (id,amount) and data something like (1,9.99)"));
        assert!(prompt.contains("#allowable_values"));
    }

    #[test]
    fn extraction_prompt_omits_dataset_line_without_row() {
        let sample = DatasetSample {
            headers: vec!["id".into()],
            first_row: None,
        };
        let prompt = rule_extraction("text", Some(&sample));
        assert!(!prompt.contains("Transaction data csv"));
        assert!(!rule_extraction("text", None).contains("Transaction data csv"));
    }

    #[test]
    fn update_prompt_embeds_rules_and_instruction() {
        let prompt = rule_update(r#"[{"rule_name":"x"}]"#, "rename x to y");
        assert!(prompt.contains(r#"[{"rule_name":"x"}]"#));
        assert!(prompt.contains("rename x to y"));
    }

    #[test]
    fn script_prompt_names_language_and_headers() {
        let prompt = script_generation("[]", "id,amount", "Python");
        assert!(prompt.contains("executable Python script"));
        assert!(prompt.contains("columns (id,amount)"));
    }
}
