use crate::models::family::Family;

const SYSTEM_XYZ: &str = r#"Du är en uppgiftsmakare för Högskoleprovet. Skapa nya, originella frågor på svenska.

UTDATAFORMAT
- Returnera ENDAST en JSON-lista (array) av objekt. Ingen annan text, ingen markdown.
- Varje objekt har exakt fälten:
  - "id": heltal, börja på 1 och öka med 1
  - "type": "XYZ"
  - "text": fullständig frågetext
  - "explanation": kort lösning och motivering
  - "answer": heltal 0-3, index i "options"
  - "options": exakt 4 svarsalternativ, det rätta måste finnas med

MÄNGDKRAV
- Exakt 12 frågor av typen "XYZ", id 1..12 i ordning.

KVALITET
- Originella frågor i referensmaterialets stil och nivå, ingen ordagrann återanvändning.
- Endast en korrekt lösning per fråga; "answer" ska stämma med förklaringen.
- Variation: aritmetik, algebra, procent, geometri, tabell- och diagramtolkning.

VALIDERING FÖRE SVAR
- Räkna ut facit och kontrollera att det finns bland alternativen.
- Kontrollera antal och id-följd. All text på svenska, ingen känslig persondata."#;

const SYSTEM_KVA: &str = r#"Du är en uppgiftsmakare för Högskoleprovet. Skapa nya, originella frågor på svenska.

UTDATAFORMAT
- Returnera ENDAST en JSON-lista (array) av objekt. Ingen annan text, ingen markdown.
- Varje objekt har exakt fälten:
  - "id": heltal, börja på 13 och öka med 1
  - "type": "KVA"
  - "text": frågetext på formen "Kvantitet I: ..." och "Kvantitet II: ..."
  - "explanation": kort lösning och motivering
  - "answer": heltal 0-3, index i "options"
  - "options": exakt dessa fyra alternativ i denna ordning:
      0) "I är större än II"
      1) "II är större än I"
      2) "I är lika med II"
      3) "Informationen är otillräcklig"

MÄNGDKRAV
- Exakt 10 frågor av typen "KVA", id 13..22 i ordning.

KVALITET
- Originella frågor i referensmaterialets stil och nivå, ingen ordagrann återanvändning.
- Endast en korrekt lösning per fråga; "answer" ska stämma med förklaringen.

VALIDERING FÖRE SVAR
- Räkna ut facit. Kontrollera antal, id-följd och att alternativen är ordagranna.
- All text på svenska, ingen känslig persondata."#;

const SYSTEM_NOG: &str = r#"Du är en uppgiftsmakare för Högskoleprovet. Skapa nya, originella frågor på svenska.

UTDATAFORMAT
- Returnera ENDAST en JSON-lista (array) av objekt. Ingen annan text, ingen markdown.
- Varje objekt har exakt fälten:
  - "id": heltal, börja på 23 och öka med 1
  - "type": "NOG"
  - "text": en fråga följd av påståendena (1) och (2) och raden "Tillräcklig information erhålls" sist
  - "explanation": kort lösning och motivering
  - "answer": heltal 0-4, index i "options"
  - "options": exakt dessa fem alternativ i denna ordning:
      0) "i (1) men ej i (2)"
      1) "i (2) men ej i (1)"
      2) "i (1) tillsammans med (2)"
      3) "i (1) och (2) var för sig"
      4) "ej genom de båda påståendena"

MÄNGDKRAV
- Exakt 6 frågor av typen "NOG", id 23..28 i ordning.

KVALITET
- Originella frågor i referensmaterialets stil och nivå, ingen ordagrann återanvändning.
- Endast en korrekt lösning per fråga; "answer" ska stämma med förklaringen.

VALIDERING FÖRE SVAR
- Räkna ut facit. Kontrollera antal, id-följd och att alternativen är ordagranna.
- All text på svenska, ingen känslig persondata."#;

const SYSTEM_CR: &str = r#"You are an expert GMAT Critical Reasoning item writer.

Produce EXACTLY 6 Critical Reasoning questions, returned as a JSON list of 6 objects
(or {"questions": [...]}). Valid JSON only, no markdown.

Each object:
{
  "topic": "verbal",
  "subtopic": "critical_reasoning",
  "id": "VCR_x",
  "subsubtopic": "strengthen | weaken | assumption | inference | evaluate | flaw",
  "skill": "short description",
  "difficulty": "easy | medium | hard",
  "question": "argument followed by the question stem",
  "options": {"A": "...", "B": "...", "C": "...", "D": "...", "E": "..."},
  "answer": "A | B | C | D | E",
  "solution": "short explanation"
}

RULES
- ids VCR_1 through VCR_6, in order.
- Each of the six subtypes is used exactly once; no two questions share a subsubtopic.
- Exactly one correct answer per question.
- No politics, religion or other sensitive topics."#;

const SYSTEM_RC: &str = r#"You are an expert GMAT Reading Comprehension item writer.

Produce EXACTLY 17 Reading Comprehension questions grouped under 3 or 4 passages,
returned as a JSON list of 17 objects (or {"questions": [...]}). Valid JSON only, no markdown.

PASSAGES
- Each passage is 120-170 words, academic and neutral in tone.
- Each passage has between 3 and 6 questions; the group sizes sum to exactly 17.
- Questions of one passage are consecutive.
- Every question repeats its passage in full in "passage", identical for all
  questions of that passage. Never null, never empty.

Each object:
{
  "topic": "verbal",
  "subtopic": "reading_comprehension",
  "id": "VRC_x",
  "subsubtopic": "main idea | purpose | inference | detail | attitude | structure",
  "skill": "short description",
  "difficulty": "easy | medium | hard",
  "passage": "full passage text",
  "question": "...",
  "options": {"A": "...", "B": "...", "C": "...", "D": "...", "E": "..."},
  "answer": "A | B | C | D | E",
  "solution": "short explanation"
}

RULES
- ids VRC_1 through VRC_17, in order.
- Exactly one correct answer per question."#;

pub struct PromptService;

impl PromptService {
    pub fn system_instruction(family: Family) -> &'static str {
        match family {
            Family::Quantitative => SYSTEM_XYZ,
            Family::QuantityComparison => SYSTEM_KVA,
            Family::DataSufficiency => SYSTEM_NOG,
            Family::CriticalReasoning => SYSTEM_CR,
            Family::ReadingComprehension => SYSTEM_RC,
        }
    }

    /// Wraps the reference excerpt (if any) in the style-guide framing.
    pub fn user_message(family: Family, context_block: Option<&str>) -> String {
        if family.is_verbal() {
            let mut msg = String::new();
            if let Some(ctx) = context_block {
                msg.push_str(
                    "Reference material for the new questions.\n\
                     Use it as a style and difficulty guide. Do not copy text verbatim.\n\n",
                );
                msg.push_str(ctx);
                msg.push_str("\n\n");
            }
            msg.push_str(
                "Now write the questions as specified in the system instruction. \
                 Keep difficulty and style close to the references but make them new.",
            );
            return msg;
        }

        let mut msg = String::new();
        if let Some(ctx) = context_block {
            msg.push_str(
                "Relevant information för nyproducerade frågor.\n\
                 Använd som stil- och svårighetsguide. Kopiera inte text ordagrant.\n\n",
            );
            msg.push_str(ctx);
            msg.push('\n');
        }
        msg.push_str(
            "Skapa nu frågorna enligt systeminstruktionen. \
             Håll dem på liknande svårighet och stil som referensen men gör dem nya.",
        );
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::{FamilySchema, KVA_OPTIONS, NOG_OPTIONS};

    #[test]
    fn canonical_wording_appears_in_instructions() {
        for option in KVA_OPTIONS {
            assert!(PromptService::system_instruction(Family::QuantityComparison).contains(option));
        }
        for option in NOG_OPTIONS {
            assert!(PromptService::system_instruction(Family::DataSufficiency).contains(option));
        }
    }

    #[test]
    fn instructions_state_the_required_count() {
        for family in Family::ALL {
            let count = FamilySchema::for_family(family).count;
            assert!(
                PromptService::system_instruction(family).contains(&count.to_string()),
                "{} instruction misses its count",
                family
            );
        }
    }

    #[test]
    fn user_message_embeds_context_when_present() {
        let msg = PromptService::user_message(Family::Quantitative, Some("XYZ referensutdrag:\n1. [XYZ] a"));
        assert!(msg.contains("1. [XYZ] a"));
        assert!(msg.ends_with("gör dem nya."));

        let bare = PromptService::user_message(Family::CriticalReasoning, None);
        assert!(!bare.contains("Reference material"));
        assert!(bare.starts_with("Now write the questions"));
    }
}
