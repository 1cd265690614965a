use crate::utils::text::{first_text, truncate};
use serde_json::Value as JsonValue;

pub const MAX_CHARS_PER_ITEM: usize = 300;

const TEXT_FIELDS: [&str; 3] = ["text", "question", "body"];

pub struct ContextService;

impl ContextService {
    /// Numbered, tagged excerpt of reference items for the prompt. Pure.
    pub fn build_context_block(
        name: &str,
        docs: &[JsonValue],
        max_items: usize,
        max_chars: usize,
    ) -> String {
        let default_section = name.to_uppercase();
        let mut lines = vec![format!("{} referensutdrag:", name)];

        for (idx, doc) in docs.iter().take(max_items).enumerate() {
            let section = doc
                .get("section")
                .and_then(|s| s.as_str())
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(&default_section);
            let text = first_text(doc, &TEXT_FIELDS).unwrap_or("");
            lines.push(format!("{}. [{}] {}", idx + 1, section, truncate(text, max_chars)));
        }

        lines.join("\n")
    }
}
