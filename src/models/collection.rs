use crate::models::family::Family;
use crate::models::item::Item;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

/// Validated items of one family, in id order.
#[derive(Debug, Clone)]
pub struct FamilyCollection {
    pub family: Family,
    pub items: Vec<Item>,
}

impl FamilyCollection {
    pub fn to_artifact(&self) -> JsonValue {
        json!({
            "topic": self.family.topic(),
            "subtopic": self.family.subtopic(),
            "questions": self.items,
        })
    }
}

/// The merged output of one run. Built once from finished family collections.
#[derive(Debug, Clone)]
pub struct GeneratedCollection {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub families: Vec<FamilyCollection>,
}

impl GeneratedCollection {
    pub fn new(mut families: Vec<FamilyCollection>) -> Self {
        families.sort_by_key(|c| c.family);
        Self {
            run_id: Uuid::new_v4(),
            generated_at: crate::utils::time::now(),
            families,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.families.iter().flat_map(|c| c.items.iter())
    }

    pub fn len(&self) -> usize {
        self.families.iter().map(|c| c.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_artifact(&self) -> JsonValue {
        let questions: Vec<&Item> = self.items().collect();
        json!({
            "topic": "exam",
            "subtopic": "all",
            "run_id": self.run_id,
            "generated_at": crate::utils::time::artifact_stamp(self.generated_at),
            "families": self.families.iter().map(|c| c.family.tag()).collect::<Vec<_>>(),
            "questions": questions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::{Answer, ItemId};

    fn collection(family: Family, ids: &[i64]) -> FamilyCollection {
        let items = ids
            .iter()
            .map(|id| Item {
                id: ItemId::Number(*id),
                family,
                text: format!("Fråga {}", id),
                options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
                answer: Answer::Index(0),
                explanation: "Se ovan.".into(),
                passage: None,
                subtype: None,
                skill: None,
                difficulty: None,
            })
            .collect();
        FamilyCollection { family, items }
    }

    #[test]
    fn merged_collection_is_in_family_order() {
        let merged = GeneratedCollection::new(vec![
            collection(Family::QuantityComparison, &[13, 14]),
            collection(Family::Quantitative, &[1, 2, 3]),
        ]);
        assert_eq!(merged.len(), 5);

        let artifact = merged.to_artifact();
        assert_eq!(artifact["families"], json!(["XYZ", "KVA"]));
        let ids: Vec<i64> = artifact["questions"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|q| q["id"].as_i64())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 13, 14]);
        assert!(artifact["generated_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn family_artifact_carries_topic_and_subtopic() {
        let artifact = collection(Family::DataSufficiency, &[23]).to_artifact();
        assert_eq!(artifact["topic"], "quantitative");
        assert_eq!(artifact["subtopic"], "nog");
        assert_eq!(artifact["questions"][0]["type"], "NOG");
    }
}
