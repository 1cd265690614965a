/// Cuts `s` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
        None => s.to_string(),
    }
}

/// First non-empty string among `fields` of a JSON object.
pub fn first_text<'a>(value: &'a serde_json::Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|f| value.get(*f))
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("åäö", 2), "åä...");
        assert_eq!(truncate("åäö", 3), "åäö");
        assert_eq!(truncate("", 5), "");
    }

    #[test]
    fn first_text_skips_blank_fields() {
        let item = json!({"text": "  ", "question": "Vad är 2+2?", "body": "x"});
        assert_eq!(first_text(&item, &["text", "question", "body"]), Some("Vad är 2+2?"));
        assert_eq!(first_text(&json!({"id": 1}), &["text"]), None);
    }
}
