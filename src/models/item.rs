use crate::models::family::Family;
use crate::models::schema::OPTION_LETTERS;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Token(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{}", n),
            ItemId::Token(t) => f.write_str(t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Index(usize),
    Letter(char),
}

impl Answer {
    pub fn position(self) -> Option<usize> {
        match self {
            Answer::Index(idx) => Some(idx),
            Answer::Letter(letter) => OPTION_LETTERS.iter().position(|l| *l == letter),
        }
    }
}

/// A validated item. Options are held in canonical order regardless of
/// whether the model sent them as a list or a letter map.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub family: Family,
    pub text: String,
    pub options: Vec<String>,
    pub answer: Answer,
    pub explanation: String,
    pub passage: Option<String>,
    pub subtype: Option<String>,
    pub skill: Option<String>,
    pub difficulty: Option<String>,
}

impl Item {
    pub fn correct_option(&self) -> Option<&str> {
        self.answer
            .position()
            .and_then(|pos| self.options.get(pos))
            .map(String::as_str)
    }

    /// Renders the item in its family's native artifact shape.
    pub fn to_json(&self) -> JsonValue {
        if !self.family.is_verbal() {
            let answer = match self.answer {
                Answer::Index(idx) => json!(idx),
                Answer::Letter(letter) => json!(letter.to_string()),
            };
            return json!({
                "id": self.id,
                "type": self.family.tag(),
                "text": self.text,
                "explanation": self.explanation,
                "answer": answer,
                "options": self.options,
            });
        }

        let options: Map<String, JsonValue> = OPTION_LETTERS
            .iter()
            .zip(self.options.iter())
            .map(|(letter, text)| (letter.to_string(), json!(text)))
            .collect();
        let answer = match self.answer {
            Answer::Letter(letter) => letter.to_string(),
            Answer::Index(idx) => OPTION_LETTERS
                .get(idx)
                .map(|l| l.to_string())
                .unwrap_or_default(),
        };

        let mut out = json!({
            "topic": self.family.topic(),
            "subtopic": self.family.subtopic(),
            "id": self.id,
            "subsubtopic": self.subtype,
            "skill": self.skill,
            "difficulty": self.difficulty,
            "question": self.text,
            "options": options,
            "answer": answer,
            "solution": self.explanation,
        });
        if self.family == Family::ReadingComprehension {
            out["passage"] = json!(self.passage);
        }
        out
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
