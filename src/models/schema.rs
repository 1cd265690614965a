use crate::models::family::{AnswerStyle, Family, IdScheme};
use serde_json::{json, Map, Value as JsonValue};

pub const KVA_OPTIONS: [&str; 4] = [
    "I är större än II",
    "II är större än I",
    "I är lika med II",
    "Informationen är otillräcklig",
];

pub const NOG_OPTIONS: [&str; 5] = [
    "i (1) men ej i (2)",
    "i (2) men ej i (1)",
    "i (1) tillsammans med (2)",
    "i (1) och (2) var för sig",
    "ej genom de båda påståendena",
];

pub const OPTION_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassageGroups {
    pub min_groups: usize,
    pub max_groups: usize,
    pub min_size: usize,
    pub max_size: usize,
}

/// Declarative constraints for one family. Sent to the model as a response
/// schema when supported and always used for post-hoc validation.
#[derive(Debug, Clone, Copy)]
pub struct FamilySchema {
    pub family: Family,
    pub count: usize,
    pub option_count: usize,
    pub required_fields: &'static [&'static str],
    pub canonical_options: Option<&'static [&'static str]>,
    pub distinct_subtypes: bool,
    pub passage_groups: Option<PassageGroups>,
}

const QUANT_FIELDS: &[&str] = &["id", "type", "text", "explanation", "answer", "options"];
const CR_FIELDS: &[&str] = &["id", "subsubtopic", "question", "options", "answer", "solution"];
const RC_FIELDS: &[&str] = &[
    "id",
    "subsubtopic",
    "passage",
    "question",
    "options",
    "answer",
    "solution",
];

impl FamilySchema {
    pub fn for_family(family: Family) -> Self {
        match family {
            Family::Quantitative => Self {
                family,
                count: 12,
                option_count: 4,
                required_fields: QUANT_FIELDS,
                canonical_options: None,
                distinct_subtypes: false,
                passage_groups: None,
            },
            Family::QuantityComparison => Self {
                family,
                count: 10,
                option_count: 4,
                required_fields: QUANT_FIELDS,
                canonical_options: Some(&KVA_OPTIONS),
                distinct_subtypes: false,
                passage_groups: None,
            },
            Family::DataSufficiency => Self {
                family,
                count: 6,
                option_count: 5,
                required_fields: QUANT_FIELDS,
                canonical_options: Some(&NOG_OPTIONS),
                distinct_subtypes: false,
                passage_groups: None,
            },
            Family::CriticalReasoning => Self {
                family,
                count: 6,
                option_count: 5,
                required_fields: CR_FIELDS,
                canonical_options: None,
                distinct_subtypes: true,
                passage_groups: None,
            },
            Family::ReadingComprehension => Self {
                family,
                count: 17,
                option_count: 5,
                required_fields: RC_FIELDS,
                canonical_options: None,
                distinct_subtypes: false,
                passage_groups: Some(PassageGroups {
                    min_groups: 3,
                    max_groups: 4,
                    min_size: 3,
                    max_size: 6,
                }),
            },
        }
    }

    /// Ids the family must carry, in order.
    pub fn expected_ids(&self) -> Vec<String> {
        (0..self.count).map(|pos| self.expected_id(pos)).collect()
    }

    pub fn expected_id(&self, position: usize) -> String {
        match self.family.id_scheme() {
            IdScheme::Numeric { offset } => (offset + position as i64).to_string(),
            IdScheme::Prefixed { prefix } => format!("{}{}", prefix, position + 1),
        }
    }

    pub fn option_letters(&self) -> &'static [char] {
        &OPTION_LETTERS[..self.option_count.min(OPTION_LETTERS.len())]
    }

    /// Response schema in the Gemini `responseSchema` dialect.
    pub fn response_schema(&self) -> JsonValue {
        let mut properties = Map::new();
        let string = json!({ "type": "STRING" });

        match self.family.id_scheme() {
            IdScheme::Numeric { .. } => properties.insert("id".into(), json!({ "type": "INTEGER" })),
            IdScheme::Prefixed { .. } => properties.insert("id".into(), string.clone()),
        };

        let options = match self.family.answer_style() {
            AnswerStyle::Index => {
                properties.insert("answer".into(), json!({ "type": "INTEGER" }));
                match self.canonical_options {
                    Some(canonical) => json!({
                        "type": "ARRAY",
                        "minItems": self.option_count,
                        "maxItems": self.option_count,
                        "items": { "type": "STRING", "enum": canonical },
                    }),
                    None => json!({
                        "type": "ARRAY",
                        "minItems": self.option_count,
                        "maxItems": self.option_count,
                        "items": string.clone(),
                    }),
                }
            }
            AnswerStyle::Letter => {
                let letters: Vec<String> =
                    self.option_letters().iter().map(|c| c.to_string()).collect();
                properties.insert(
                    "answer".into(),
                    json!({ "type": "STRING", "enum": letters }),
                );
                let letter_props: Map<String, JsonValue> = letters
                    .iter()
                    .map(|l| (l.clone(), string.clone()))
                    .collect();
                json!({
                    "type": "OBJECT",
                    "properties": letter_props,
                    "required": letters,
                })
            }
        };
        properties.insert("options".into(), options);

        for field in self.required_fields {
            properties.entry(field.to_string()).or_insert_with(|| string.clone());
        }
        if self.family.is_verbal() {
            for field in ["topic", "subtopic", "skill", "difficulty"] {
                properties.entry(field.to_string()).or_insert_with(|| string.clone());
            }
        }

        json!({
            "type": "ARRAY",
            "minItems": self.count,
            "maxItems": self.count,
            "items": {
                "type": "OBJECT",
                "properties": properties,
                "required": self.required_fields,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_ids_follow_family_scheme() {
        let kva = FamilySchema::for_family(Family::QuantityComparison).expected_ids();
        assert_eq!(kva.first().map(String::as_str), Some("13"));
        assert_eq!(kva.last().map(String::as_str), Some("22"));

        let rc = FamilySchema::for_family(Family::ReadingComprehension).expected_ids();
        assert_eq!(rc.len(), 17);
        assert_eq!(rc[16], "VRC_17");
    }

    #[test]
    fn response_schema_pins_exact_count_and_cardinality() {
        let schema = FamilySchema::for_family(Family::DataSufficiency).response_schema();
        assert_eq!(schema["minItems"], 6);
        assert_eq!(schema["maxItems"], 6);
        let options = &schema["items"]["properties"]["options"];
        assert_eq!(options["minItems"], 5);
        assert_eq!(options["items"]["enum"][4], "ej genom de båda påståendena");
    }

    #[test]
    fn verbal_schema_uses_letter_keyed_options() {
        let schema = FamilySchema::for_family(Family::CriticalReasoning).response_schema();
        let item = &schema["items"];
        assert_eq!(item["properties"]["options"]["type"], "OBJECT");
        assert_eq!(item["properties"]["answer"]["enum"][0], "A");
        assert!(item["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|f| f == "subsubtopic"));
    }
}
