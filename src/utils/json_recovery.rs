//! Turns noisy model output into a list of item-like JSON values.
//!
//! Already-valid JSON is returned as is. Otherwise the text goes through a
//! fixed sequence of repairs: fence stripping, longest bracket-matched span,
//! typographic quote folding, trailing comma removal and line-break collapse.
//! If the repaired span still does not parse, every balanced object that sits
//! directly inside an array (or at top level) is parsed on its own and the
//! survivors are returned as a partial list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::borrow::Cow;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_+-]*").expect("fence regex"));
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([\]}])").expect("trailing comma regex"));
static LINE_BREAK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ ]*[\r\n\t][\s]*").expect("whitespace regex"));

const RAW_PREVIEW_CHARS: usize = 2_000;

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("no JSON array or object found in model output")]
    NoJsonFound { raw: String },

    #[error("model output is not valid JSON even after repair: {source}")]
    Unparseable {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected top-level JSON shape: {kind}")]
    UnexpectedShape { kind: &'static str, raw: String },
}

impl RecoveryError {
    /// The original model text, kept for diagnostics.
    pub fn raw_text(&self) -> &str {
        match self {
            RecoveryError::NoJsonFound { raw }
            | RecoveryError::Unparseable { raw, .. }
            | RecoveryError::UnexpectedShape { raw, .. } => raw,
        }
    }

    pub fn raw_preview(&self) -> String {
        crate::utils::text::truncate(self.raw_text(), RAW_PREVIEW_CHARS)
    }
}

/// Parses model output and unwraps it into the list of items.
pub fn recover_items(raw: &str) -> Result<Vec<JsonValue>, RecoveryError> {
    let value = recover_value(raw)?;
    normalize_items(value, raw)
}

/// Parses model output into a JSON value, repairing it if needed.
pub fn recover_value(raw: &str) -> Result<JsonValue, RecoveryError> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
        return Ok(value);
    }

    let unfenced = strip_code_fences(trimmed);
    let candidate = match largest_json_span(&unfenced) {
        Some(span) => span,
        // An unterminated array still holds complete items worth salvaging.
        None => match unfenced.find(|c: char| c == '[' || c == '{') {
            Some(start) => &unfenced[start..],
            None => {
                return Err(RecoveryError::NoJsonFound {
                    raw: raw.to_string(),
                })
            }
        },
    };
    if let Ok(value) = serde_json::from_str::<JsonValue>(candidate) {
        tracing::debug!("Recovered JSON after fence stripping and span extraction");
        return Ok(value);
    }

    let quoted = normalize_quotes(candidate);
    let decomma = remove_trailing_commas(&quoted);
    let repaired = collapse_line_breaks(&decomma);

    match serde_json::from_str::<JsonValue>(&repaired) {
        Ok(value) => {
            tracing::debug!("Recovered JSON after text repair");
            Ok(value)
        }
        Err(source) => {
            let salvaged = salvage_objects(&repaired);
            if salvaged.is_empty() {
                return Err(RecoveryError::Unparseable {
                    raw: raw.to_string(),
                    source,
                });
            }
            tracing::warn!(
                salvaged = salvaged.len(),
                error = %source,
                "Strict parse failed, falling back to per-object extraction"
            );
            Ok(JsonValue::Array(salvaged))
        }
    }
}

/// Accepts a bare list or an object wrapping the list under `questions`/`items`.
pub fn normalize_items(value: JsonValue, raw: &str) -> Result<Vec<JsonValue>, RecoveryError> {
    match value {
        JsonValue::Array(items) => Ok(items),
        JsonValue::Object(mut map) => {
            for key in ["questions", "items"] {
                if let Some(JsonValue::Array(items)) = map.remove(key) {
                    return Ok(items);
                }
            }
            Err(RecoveryError::UnexpectedShape {
                kind: "object without a questions/items list",
                raw: raw.to_string(),
            })
        }
        JsonValue::Null => Err(RecoveryError::UnexpectedShape {
            kind: "null",
            raw: raw.to_string(),
        }),
        _ => Err(RecoveryError::UnexpectedShape {
            kind: "scalar",
            raw: raw.to_string(),
        }),
    }
}

pub fn strip_code_fences(text: &str) -> Cow<'_, str> {
    if !text.contains("```") {
        return Cow::Borrowed(text);
    }
    Cow::Owned(FENCE.replace_all(text, "").trim().to_string())
}

/// Folds typographic quotes that stand in for JSON delimiters. Quotes inside
/// a string opened by a plain `"` are part of the value and stay.
pub fn normalize_quotes(text: &str) -> Cow<'_, str> {
    const DOUBLE: [char; 7] = [
        '\u{201C}', '\u{201D}', '\u{201E}', '\u{201F}', '\u{2033}', '\u{00AB}', '\u{00BB}',
    ];
    const SINGLE: [char; 4] = ['\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

    if !text.chars().any(|c| DOUBLE.contains(&c) || SINGLE.contains(&c)) {
        return Cow::Borrowed(text);
    }

    enum Literal {
        Outside,
        Plain,
        Typographic,
    }

    let mut out = String::with_capacity(text.len());
    let mut state = Literal::Outside;
    let mut escaped = false;
    for c in text.chars() {
        match state {
            Literal::Outside => {
                if c == '"' {
                    state = Literal::Plain;
                    out.push(c);
                } else if DOUBLE.contains(&c) {
                    state = Literal::Typographic;
                    out.push('"');
                } else if SINGLE.contains(&c) {
                    out.push('\'');
                } else {
                    out.push(c);
                }
            }
            _ if escaped => {
                escaped = false;
                out.push(c);
            }
            _ if c == '\\' => {
                escaped = true;
                out.push(c);
            }
            Literal::Plain => {
                if c == '"' {
                    state = Literal::Outside;
                }
                out.push(c);
            }
            Literal::Typographic => {
                if c == '"' || DOUBLE.contains(&c) {
                    state = Literal::Outside;
                    out.push('"');
                } else {
                    out.push(c);
                }
            }
        }
    }
    Cow::Owned(out)
}

pub fn remove_trailing_commas(text: &str) -> Cow<'_, str> {
    TRAILING_COMMA.replace_all(text, "$1")
}

/// Raw line breaks and tabs are never legal inside JSON strings, so runs of
/// whitespace containing them can be folded to one space.
pub fn collapse_line_breaks(text: &str) -> Cow<'_, str> {
    LINE_BREAK_RUN.replace_all(text, " ")
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    kind: char,
    depth: usize,
    parent: Option<char>,
}

impl Span {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Every balanced `[...]`/`{...}` container, string literals respected.
fn scan_containers(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if !stack.is_empty() => in_string = true,
            '[' | '{' => stack.push((c, idx)),
            ']' | '}' => {
                let opener = if c == ']' { '[' } else { '{' };
                if matches!(stack.last(), Some((open, _)) if *open == opener) {
                    if let Some((kind, start)) = stack.pop() {
                        spans.push(Span {
                            start,
                            end: idx + 1,
                            kind,
                            depth: stack.len(),
                            parent: stack.last().map(|(k, _)| *k),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    spans
}

/// Longest top-level bracket-matched span; the first wins a tie.
pub fn largest_json_span(text: &str) -> Option<&str> {
    let mut best: Option<Span> = None;
    for span in scan_containers(text).into_iter().filter(|s| s.depth == 0) {
        if best.map_or(true, |b| span.len() > b.len()) {
            best = Some(span);
        }
    }
    best.map(|s| &text[s.start..s.end])
}

/// Parses item-position objects one by one, skipping the ones that fail.
/// Objects nested inside an accepted object are not reported separately;
/// an accepted `questions`/`items` wrapper contributes its list instead.
pub fn salvage_objects(text: &str) -> Vec<JsonValue> {
    let mut candidates: Vec<Span> = scan_containers(text)
        .into_iter()
        .filter(|s| s.kind == '{' && (s.depth == 0 || s.parent == Some('[')))
        .collect();
    candidates.sort_by_key(|s| s.start);

    let mut accepted_until = 0usize;
    let mut out = Vec::new();
    for span in candidates {
        if span.start < accepted_until {
            continue;
        }
        match serde_json::from_str::<JsonValue>(&text[span.start..span.end]) {
            Ok(JsonValue::Object(mut map)) => {
                accepted_until = span.end;
                // A wrapper pushed below top level by stray prose brackets.
                let wrapped = ["questions", "items"].iter().find_map(|key| match map.remove(*key) {
                    Some(JsonValue::Array(items)) => Some(items),
                    Some(other) => {
                        map.insert(key.to_string(), other);
                        None
                    }
                    None => None,
                });
                match wrapped {
                    Some(items) => out.extend(items),
                    None => out.push(JsonValue::Object(map)),
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, start = span.start, "Discarding unparseable object"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_block_with_trailing_comma() {
        let items = recover_items("```json\n[{\"a\":1},]\n```").unwrap();
        assert_eq!(items, vec![json!({"a": 1})]);
    }

    #[test]
    fn picks_longest_candidate_span() {
        let text = r#"Example shape: [1, 2]. Final answer: [{"id": 1, "text": "x"}, {"id": 2, "text": "y"}] Thanks!"#;
        let items = recover_items(text).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["text"], "y");
    }

    #[test]
    fn unwraps_questions_key() {
        let items = recover_items(r#"{"questions": [{"id": "VCR_1"}]}"#).unwrap();
        assert_eq!(items, vec![json!({"id": "VCR_1"})]);
    }

    #[test]
    fn unwraps_items_key_after_prose() {
        let text = "Here you go:\n{\"items\": [{\"id\": 3}]}\nLet me know!";
        assert_eq!(recover_items(text).unwrap(), vec![json!({"id": 3})]);
    }

    #[test]
    fn smart_quotes_are_folded_when_needed() {
        let text = "[{\u{201C}id\u{201D}: 1, \u{201C}text\u{201D}: \u{201C}Vad är x?\u{201D}}]";
        let items = recover_items(text).unwrap();
        assert_eq!(items[0]["text"], "Vad är x?");
    }

    #[test]
    fn smart_quotes_inside_valid_json_survive() {
        let text = "[{\"text\": \"He said \u{201C}hi\u{201D}\"}]";
        let items = recover_items(text).unwrap();
        assert_eq!(items[0]["text"], "He said \u{201C}hi\u{201D}");
    }

    #[test]
    fn raw_line_breaks_inside_strings_are_collapsed() {
        let text = "[{\"text\": \"Kvantitet I: 4\n  Kvantitet II: 5\",}]";
        let items = recover_items(text).unwrap();
        assert_eq!(items[0]["text"], "Kvantitet I: 4 Kvantitet II: 5");
    }

    #[test]
    fn broken_item_is_dropped_and_rest_salvaged() {
        let text = r#"[{"id": 1, "options": {"A": "x"}}, {"id": 2, "text": "bad" "missing comma"}, {"id": 3}]"#;
        let items = recover_items(text).unwrap();
        assert_eq!(items, vec![json!({"id": 1, "options": {"A": "x"}}), json!({"id": 3})]);
    }

    #[test]
    fn truncated_array_keeps_complete_items() {
        let text = r#"[{"id": 1}, {"id": 2}, {"id": 3, "text": "cut off"#;
        let items = recover_items(text).unwrap();
        assert_eq!(items, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn brackets_inside_strings_do_not_split_spans() {
        let text = r#"noise [{"text": "solve [x] for } y"}] noise"#;
        let items = recover_items(text).unwrap();
        assert_eq!(items[0]["text"], "solve [x] for } y");
    }

    #[test]
    fn text_without_json_is_a_hard_failure() {
        let err = recover_items("I'm sorry, I cannot produce these questions.").unwrap_err();
        assert!(matches!(err, RecoveryError::NoJsonFound { .. }));
        assert!(err.raw_text().starts_with("I'm sorry"));
    }

    #[test]
    fn unsalvageable_span_reports_parser_error() {
        let err = recover_items("see [this, that] please").unwrap_err();
        assert!(matches!(err, RecoveryError::Unparseable { .. }));
    }

    #[test]
    fn scalar_or_unwrapped_object_is_rejected() {
        assert!(matches!(
            recover_items("42").unwrap_err(),
            RecoveryError::UnexpectedShape { kind: "scalar", .. }
        ));
        assert!(matches!(
            recover_items(r#"{"id": 1, "text": "single"}"#).unwrap_err(),
            RecoveryError::UnexpectedShape { .. }
        ));
    }

    #[test]
    fn valid_json_round_trips_unchanged() {
        let text = r#"[{"id": 1, "options": ["a", "b"], "answer": 0, "text": "  spaced  "}]"#;
        let first = recover_value(text).unwrap();
        let again = recover_value(&serde_json::to_string_pretty(&first).unwrap()).unwrap();
        assert_eq!(first, again);
        assert_eq!(first[0]["text"], "  spaced  ");
    }

    #[test]
    fn typographic_quotes_inside_values_survive_repair() {
        // The trailing comma forces the repair path.
        let text = "[{\"id\": 1, \"text\": \"Ordet \u{201D}kvot\u{201D} betyder resultat\"},]";
        let items = recover_items(text).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["text"], "Ordet \u{201D}kvot\u{201D} betyder resultat");
    }

    #[test]
    fn stray_prose_bracket_does_not_hide_wrapper() {
        let text = r#"Oops :-[ here they are: {"questions": [{"id": "VCR_1"}, {"id": "VCR_2"}]}"#;
        let items = recover_items(text).unwrap();
        assert_eq!(items, vec![json!({"id": "VCR_1"}), json!({"id": "VCR_2"})]);
    }
}
