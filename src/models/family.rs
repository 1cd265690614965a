use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structural template of a generated item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    #[serde(rename = "XYZ")]
    Quantitative,
    #[serde(rename = "KVA")]
    QuantityComparison,
    #[serde(rename = "NOG")]
    DataSufficiency,
    #[serde(rename = "CR")]
    CriticalReasoning,
    #[serde(rename = "RC")]
    ReadingComprehension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    Numeric { offset: i64 },
    Prefixed { prefix: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStyle {
    Index,
    Letter,
}

impl Family {
    /// Run order; numeric id offsets chain through it.
    pub const ALL: [Family; 5] = [
        Family::Quantitative,
        Family::QuantityComparison,
        Family::DataSufficiency,
        Family::CriticalReasoning,
        Family::ReadingComprehension,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Family::Quantitative => "XYZ",
            Family::QuantityComparison => "KVA",
            Family::DataSufficiency => "NOG",
            Family::CriticalReasoning => "CR",
            Family::ReadingComprehension => "RC",
        }
    }

    pub fn topic(self) -> &'static str {
        if self.is_verbal() {
            "verbal"
        } else {
            "quantitative"
        }
    }

    pub fn subtopic(self) -> &'static str {
        match self {
            Family::Quantitative => "xyz",
            Family::QuantityComparison => "kva",
            Family::DataSufficiency => "nog",
            Family::CriticalReasoning => "critical_reasoning",
            Family::ReadingComprehension => "reading_comprehension",
        }
    }

    pub fn is_verbal(self) -> bool {
        matches!(self, Family::CriticalReasoning | Family::ReadingComprehension)
    }

    pub fn id_scheme(self) -> IdScheme {
        match self {
            Family::Quantitative => IdScheme::Numeric { offset: 1 },
            Family::QuantityComparison => IdScheme::Numeric { offset: 13 },
            Family::DataSufficiency => IdScheme::Numeric { offset: 23 },
            Family::CriticalReasoning => IdScheme::Prefixed { prefix: "VCR_" },
            Family::ReadingComprehension => IdScheme::Prefixed { prefix: "VRC_" },
        }
    }

    pub fn answer_style(self) -> AnswerStyle {
        if self.is_verbal() {
            AnswerStyle::Letter
        } else {
            AnswerStyle::Index
        }
    }

    /// Field carrying the question stem in this family's native shape.
    pub fn stem_field(self) -> &'static str {
        if self.is_verbal() {
            "question"
        } else {
            "text"
        }
    }

    pub fn explanation_field(self) -> &'static str {
        if self.is_verbal() {
            "solution"
        } else {
            "explanation"
        }
    }

    pub fn reference_file(self) -> String {
        format!("{}.json", self.tag().to_lowercase())
    }

    pub fn artifact_file(self) -> String {
        format!("{}_generated.json", self.tag())
    }

    /// Reference excerpt cap when building the prompt context.
    pub fn context_max_items(self) -> usize {
        match self {
            Family::Quantitative => 36,
            _ => 24,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xyz" | "quantitative" => Ok(Family::Quantitative),
            "kva" | "quantity_comparison" => Ok(Family::QuantityComparison),
            "nog" | "data_sufficiency" => Ok(Family::DataSufficiency),
            "cr" | "vcr" | "critical_reasoning" => Ok(Family::CriticalReasoning),
            "rc" | "vrc" | "reading_comprehension" => Ok(Family::ReadingComprehension),
            other => Err(format!("unknown family '{}'", other)),
        }
    }
}
