use crate::error::{Error, Result};
use crate::models::collection::{FamilyCollection, GeneratedCollection};
use crate::services::generation_service::GenerationReport;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const MERGED_FILE: &str = "generated_questions.json";

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, Error)>,
}

impl ExportSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, path: PathBuf, result: Result<PathBuf>) {
        match result {
            Ok(written) => self.written.push(written),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to write artifact");
                self.failed.push((path, e));
            }
        }
    }
}

/// Writes collections as pretty-printed JSON artifacts.
#[derive(Clone)]
pub struct ExportService {
    output_dir: PathBuf,
}

impl ExportService {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Pretty JSON with non-ASCII text left as is.
    pub fn render(artifact: &JsonValue) -> Result<String> {
        let mut out = serde_json::to_string_pretty(artifact)?;
        out.push('\n');
        Ok(out)
    }

    pub async fn write_family(&self, collection: &FamilyCollection) -> Result<PathBuf> {
        let path = self.output_dir.join(collection.family.artifact_file());
        self.write_atomic(&path, &Self::render(&collection.to_artifact())?)
            .await?;
        tracing::info!(
            family = %collection.family,
            items = collection.items.len(),
            path = %path.display(),
            "Wrote family artifact"
        );
        Ok(path)
    }

    pub async fn write_merged(&self, collection: &GeneratedCollection) -> Result<PathBuf> {
        let path = self.output_dir.join(MERGED_FILE);
        self.write_atomic(&path, &Self::render(&collection.to_artifact())?)
            .await?;
        tracing::info!(
            run_id = %collection.run_id,
            items = collection.len(),
            path = %path.display(),
            "Wrote merged artifact"
        );
        Ok(path)
    }

    /// Per-family artifacts for every success; the merged artifact only when
    /// the whole run succeeded. A failed write does not stop the others.
    pub async fn persist(&self, report: &GenerationReport) -> ExportSummary {
        let mut summary = ExportSummary::default();
        for collection in &report.collections {
            let path = self.output_dir.join(collection.family.artifact_file());
            summary.record(path, self.write_family(collection).await);
        }
        match report.merged() {
            Some(merged) => {
                let path = self.output_dir.join(MERGED_FILE);
                summary.record(path, self.write_merged(&merged).await);
            }
            None => tracing::warn!(
                failed = report.failures.len(),
                "Skipping merged artifact, not every family succeeded"
            ),
        }
        summary
    }

    // Readers never observe a half-written artifact.
    async fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.output_dir).await?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::family::Family;
    use crate::models::item::{Answer, Item, ItemId};
    use crate::services::generation_service::FamilyFailure;

    fn collection(family: Family, n: usize) -> FamilyCollection {
        let items = (0..n)
            .map(|i| Item {
                id: ItemId::Number(23 + i as i64),
                family,
                text: "Är x större än noll?".into(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
                answer: Answer::Index(2),
                explanation: "Båda behövs.".into(),
                passage: None,
                subtype: None,
                skill: None,
                difficulty: None,
            })
            .collect();
        FamilyCollection { family, items }
    }

    #[test]
    fn render_keeps_non_ascii() {
        let out = ExportService::render(&serde_json::json!({"text": "Är å ö"})).unwrap();
        assert!(out.contains("Är å ö"));
        assert!(out.ends_with("}\n"));
    }

    #[tokio::test]
    async fn complete_report_writes_family_and_merged_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let export = ExportService::new(dir.path().join("out"));
        let report = GenerationReport {
            collections: vec![collection(Family::DataSufficiency, 2)],
            failures: vec![],
        };

        let summary = export.persist(&report).await;
        assert!(summary.is_clean());
        assert_eq!(summary.written.len(), 2);

        let merged: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("out").join(MERGED_FILE)).unwrap())
                .unwrap();
        assert_eq!(merged["topic"], "exam");
        assert_eq!(merged["subtopic"], "all");
        assert_eq!(merged["questions"].as_array().unwrap().len(), 2);

        let family: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("out/NOG_generated.json")).unwrap())
                .unwrap();
        assert_eq!(family["subtopic"], "nog");
        assert_eq!(family["questions"][1]["id"], 24);
    }

    #[tokio::test]
    async fn failed_family_suppresses_merged_artifact_only() {
        let dir = tempfile::tempdir().unwrap();
        let export = ExportService::new(dir.path());
        let report = GenerationReport {
            collections: vec![collection(Family::DataSufficiency, 1)],
            failures: vec![FamilyFailure {
                family: Family::Quantitative,
                attempts: 3,
                error: Error::Timeout(120),
            }],
        };

        let summary = export.persist(&report).await;
        assert!(summary.is_clean());
        assert!(dir.path().join("NOG_generated.json").exists());
        assert!(!dir.path().join(MERGED_FILE).exists());
        assert!(!dir.path().join("NOG_generated.json.tmp").exists());
    }

    #[tokio::test]
    async fn failed_write_does_not_stop_other_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the rename onto this path fail.
        std::fs::create_dir(dir.path().join("KVA_generated.json")).unwrap();
        let export = ExportService::new(dir.path());
        let report = GenerationReport {
            collections: vec![
                collection(Family::QuantityComparison, 1),
                collection(Family::DataSufficiency, 1),
            ],
            failures: vec![],
        };

        let summary = export.persist(&report).await;
        assert!(!summary.is_clean());
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, dir.path().join("KVA_generated.json"));
        assert!(matches!(summary.failed[0].1, Error::Io(_)));
        assert_eq!(summary.written.len(), 2);
        assert!(dir.path().join("NOG_generated.json").is_file());
        assert!(dir.path().join(MERGED_FILE).is_file());
        assert!(!dir.path().join("KVA_generated.json.tmp").exists());
    }
}
