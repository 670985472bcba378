//! Renders vector matches into the context block handed back to the model.
//!
//! Each match becomes its auxiliary metadata as `key: value` lines, a blank
//! line, then the chunk text. Blocks are joined by a fixed rule and wrapped
//! in a template that labels them as retrieved context.

use serde_json::Value;

use super::store::{Metadata, RetrievalResult};

pub const CONTEXT_SEPARATOR: &str = "\n\n---------------------\n\n";

const TEXT_KEY: &str = "text";

pub fn build_context_prompt(results: &[RetrievalResult]) -> String {
    let context_str = results
        .iter()
        .map(|result| match &result.metadata {
            Some(metadata) => build_result_str(metadata),
            None => build_result_str(&Metadata::new()),
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!(
        "Retrieved context to answer the query is as follows:\n{}\n",
        context_str
    )
}

fn build_result_str(metadata: &Metadata) -> String {
    let text = metadata.get(TEXT_KEY).map(render_value).unwrap_or_default();
    let meta_str = metadata
        .iter()
        .filter(|(key, _)| key.as_str() != TEXT_KEY)
        .map(|(key, value)| format!("{}: {}", key, render_value(value)))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n\n{}", meta_str, text)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
