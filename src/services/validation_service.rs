use crate::error::{Error, Result};
use crate::models::family::{AnswerStyle, Family, IdScheme};
use crate::models::item::{Answer, Item, ItemId};
use crate::models::schema::FamilySchema;
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// Post-hoc check of parsed model output against a family schema. Nothing is
/// repaired: the first violated rule is reported with the offending item.
pub struct ValidationService;

impl ValidationService {
    pub fn validate(schema: &FamilySchema, raw: &[JsonValue]) -> Result<Vec<Item>> {
        let family = schema.family;

        if raw.len() != schema.count {
            return Err(Error::violation(
                family,
                format!("exact count {} (got {})", schema.count, raw.len()),
                None,
            ));
        }

        let mut seen_ids = HashSet::new();
        let mut items = Vec::with_capacity(raw.len());
        for (position, value) in raw.iter().enumerate() {
            let item = Self::coerce_item(schema, position, value)?;
            if !seen_ids.insert(item.id.clone()) {
                return Err(Error::violation(family, format!("duplicate id {}", item.id), Some(value)));
            }
            items.push(item);
        }

        if schema.distinct_subtypes {
            Self::check_distinct_subtypes(family, &items, raw)?;
        }
        if let Some(bounds) = schema.passage_groups {
            let sizes = Self::passage_group_sizes(&items);
            if sizes.len() < bounds.min_groups || sizes.len() > bounds.max_groups {
                return Err(Error::violation(
                    family,
                    format!(
                        "{}-{} passage groups (got {})",
                        bounds.min_groups,
                        bounds.max_groups,
                        sizes.len()
                    ),
                    None,
                ));
            }
            if let Some(size) = sizes
                .iter()
                .find(|s| **s < bounds.min_size || **s > bounds.max_size)
            {
                return Err(Error::violation(
                    family,
                    format!(
                        "passage group size {}-{} (got {})",
                        bounds.min_size, bounds.max_size, size
                    ),
                    None,
                ));
            }
            Self::check_groups_contiguous(family, &items, raw)?;
        }

        Ok(items)
    }

    fn coerce_item(schema: &FamilySchema, position: usize, value: &JsonValue) -> Result<Item> {
        let family = schema.family;
        let violation = |rule: String| Error::violation(family, rule, Some(value));

        if !value.is_object() {
            return Err(violation(format!("item {} is not a JSON object", position + 1)));
        }
        for field in schema.required_fields {
            if value.get(*field).map_or(true, JsonValue::is_null) {
                return Err(violation(format!("missing required field '{}'", field)));
            }
        }

        let id = Self::coerce_id(family, &value["id"])
            .ok_or_else(|| violation("id has the wrong type".to_string()))?;
        let expected = schema.expected_id(position);
        if id.to_string() != expected {
            return Err(violation(format!(
                "contiguous ids: expected {} at position {}, got {}",
                expected,
                position + 1,
                id
            )));
        }

        let text = Self::non_empty(value, &[family.stem_field(), "text", "question"])
            .ok_or_else(|| violation("non-empty question stem".to_string()))?;
        let explanation = Self::non_empty(value, &[family.explanation_field(), "explanation", "solution"])
            .ok_or_else(|| violation("non-empty explanation".to_string()))?;

        let options = Self::coerce_options(schema, &value["options"]).map_err(violation)?;
        if let Some(canonical) = schema.canonical_options {
            if options.iter().map(String::as_str).ne(canonical.iter().copied()) {
                return Err(violation("canonical option wording".to_string()));
            }
        }

        let answer = Self::coerce_answer(family, &value["answer"])
            .ok_or_else(|| violation("answer has the wrong type".to_string()))?;
        if answer.position().map_or(true, |pos| pos >= options.len()) {
            return Err(violation(format!("answer {:?} out of range", answer)));
        }

        let passage = Self::non_empty(value, &["passage"]).map(str::to_string);
        if family == Family::ReadingComprehension && passage.is_none() {
            return Err(violation("passage repeated on every item".to_string()));
        }

        Ok(Item {
            id,
            family,
            text: text.to_string(),
            options,
            answer,
            explanation: explanation.to_string(),
            passage,
            subtype: Self::non_empty(value, &["subsubtopic"]).map(str::to_string),
            skill: Self::non_empty(value, &["skill"]).map(str::to_string),
            difficulty: Self::non_empty(value, &["difficulty"]).map(str::to_string),
        })
    }

    fn non_empty<'a>(value: &'a JsonValue, fields: &[&str]) -> Option<&'a str> {
        crate::utils::text::first_text(value, fields)
    }

    fn coerce_id(family: Family, value: &JsonValue) -> Option<ItemId> {
        match family.id_scheme() {
            IdScheme::Numeric { .. } => match value {
                JsonValue::Number(n) => n.as_i64().map(ItemId::Number),
                JsonValue::String(s) => s.trim().parse().ok().map(ItemId::Number),
                _ => None,
            },
            IdScheme::Prefixed { .. } => value.as_str().map(|s| ItemId::Token(s.trim().to_string())),
        }
    }

    /// Options arrive as a list or as a letter-keyed map; both come out in
    /// canonical order.
    fn coerce_options(schema: &FamilySchema, value: &JsonValue) -> std::result::Result<Vec<String>, String> {
        let n = schema.option_count;
        let options: Vec<String> = match value {
            JsonValue::Array(list) => list
                .iter()
                .map(|o| o.as_str().map(|s| s.trim().to_string()))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| "options must be strings".to_string())?,
            JsonValue::Object(map) => {
                if map.len() != n {
                    return Err(format!("option cardinality {} (got {})", n, map.len()));
                }
                schema
                    .option_letters()
                    .iter()
                    .map(|letter| {
                        map.get(&letter.to_string())
                            .or_else(|| map.get(&letter.to_ascii_lowercase().to_string()))
                            .and_then(|o| o.as_str())
                            .map(|s| s.trim().to_string())
                            .ok_or_else(|| format!("option {} missing", letter))
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            _ => return Err("options must be a list or a letter map".to_string()),
        };

        if options.len() != n {
            return Err(format!("option cardinality {} (got {})", n, options.len()));
        }
        if options.iter().any(|o| o.is_empty()) {
            return Err("options must be non-empty".to_string());
        }
        Ok(options)
    }

    fn coerce_answer(family: Family, value: &JsonValue) -> Option<Answer> {
        match family.answer_style() {
            AnswerStyle::Index => match value {
                JsonValue::Number(n) => n.as_u64().map(|i| Answer::Index(i as usize)),
                JsonValue::String(s) => s.trim().parse().ok().map(Answer::Index),
                _ => None,
            },
            AnswerStyle::Letter => {
                let s = value.as_str()?.trim();
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphabetic() => {
                        Some(Answer::Letter(c.to_ascii_uppercase()))
                    }
                    _ => None,
                }
            }
        }
    }

    fn check_distinct_subtypes(family: Family, items: &[Item], raw: &[JsonValue]) -> Result<()> {
        let mut seen = HashSet::new();
        for (item, value) in items.iter().zip(raw) {
            let subtype = item
                .subtype
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .ok_or_else(|| Error::violation(family, "subtype present", Some(value)))?;
            if !seen.insert(subtype.clone()) {
                return Err(Error::violation(
                    family,
                    format!("distinct subtypes ('{}' repeated)", subtype),
                    Some(value),
                ));
            }
        }
        Ok(())
    }

    /// Sizes of consecutive runs of items sharing one passage.
    pub fn passage_group_sizes(items: &[Item]) -> Vec<usize> {
        let mut sizes: Vec<usize> = Vec::new();
        let mut current: Option<&str> = None;
        for item in items {
            let passage = item.passage.as_deref();
            if sizes.is_empty() || passage != current {
                sizes.push(1);
                current = passage;
            } else if let Some(last) = sizes.last_mut() {
                *last += 1;
            }
        }
        sizes
    }

    fn check_groups_contiguous(family: Family, items: &[Item], raw: &[JsonValue]) -> Result<()> {
        let mut closed: HashSet<&str> = HashSet::new();
        let mut current: Option<&str> = None;
        for (item, value) in items.iter().zip(raw) {
            let passage = item.passage.as_deref().unwrap_or_default();
            if current != Some(passage) {
                if closed.contains(passage) {
                    return Err(Error::violation(
                        family,
                        "passage group items are consecutive",
                        Some(value),
                    ));
                }
                if let Some(prev) = current {
                    closed.insert(prev);
                }
                current = Some(passage);
            }
        }
        Ok(())
    }
}
