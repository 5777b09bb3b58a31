//! Prompt templating.

use serde_json::Value;

/// Replace `{{json}}` and then `{json}` placeholders with `json`.
pub fn render(template: &str, json: &str) -> String {
    template.replace("{{json}}", json).replace("{json}", json)
}

/// Parse `raw` and re-serialize it with 2-space indentation.
pub fn pretty_json(raw: &str) -> Result<String, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    serde_json::to_string_pretty(&value)
}

/// Length of a prompt in characters, not bytes.
pub fn prompt_length(prompt: &str) -> usize {
    prompt.chars().count()
}
