use crate::models::family::Family;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Loads exemplar pools and draws the random half that steers each prompt.
/// Pools are advisory: any problem reading one yields an empty pool.
#[derive(Clone)]
pub struct ReferenceService {
    reference_dir: PathBuf,
}

impl ReferenceService {
    pub fn new(reference_dir: impl Into<PathBuf>) -> Self {
        Self {
            reference_dir: reference_dir.into(),
        }
    }

    pub fn pool_path(&self, family: Family) -> PathBuf {
        self.reference_dir.join(family.reference_file())
    }

    pub async fn load_pool(&self, family: Family) -> Vec<JsonValue> {
        let path = self.pool_path(family);
        match Self::read_pool(&path).await {
            Ok(pool) => {
                tracing::info!(family = %family, items = pool.len(), "Loaded reference pool");
                pool
            }
            Err(e) => {
                tracing::warn!(
                    family = %family,
                    path = %path.display(),
                    error = %e,
                    "Reference pool unavailable, continuing without context"
                );
                Vec::new()
            }
        }
    }

    async fn read_pool(path: &Path) -> anyhow::Result<Vec<JsonValue>> {
        let raw = fs::read_to_string(path).await?;
        let value: JsonValue = serde_json::from_str(&raw)?;
        Ok(Self::pool_from_value(value))
    }

    /// Accepts a bare list or a list wrapped under `items`/`questions`.
    pub fn pool_from_value(value: JsonValue) -> Vec<JsonValue> {
        match value {
            JsonValue::Array(items) => items,
            JsonValue::Object(mut map) => ["items", "questions"]
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(JsonValue::Array(items)) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Half the pool without replacement; pools of 0 or 1 return what they have.
    pub fn sample<R: Rng + ?Sized>(pool: &[JsonValue], rng: &mut R) -> Vec<JsonValue> {
        let k = if pool.len() <= 1 { pool.len() } else { pool.len() / 2 };
        pool.choose_multiple(rng, k).cloned().collect()
    }

    /// Seeded runs get one deterministic stream per family.
    pub fn rng_for(seed: Option<u64>, family: Family) -> StdRng {
        match seed {
            Some(seed) => {
                let salt = family
                    .tag()
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
                StdRng::seed_from_u64(seed ^ salt)
            }
            None => StdRng::from_entropy(),
        }
    }
}
