use crate::error::{Error, Result};
use crate::models::collection::{FamilyCollection, GeneratedCollection};
use crate::models::family::Family;
use crate::models::schema::FamilySchema;
use crate::services::ai_service::{GenerationRequest, TextGenerator};
use crate::services::context_service::{ContextService, MAX_CHARS_PER_ITEM};
use crate::services::prompt_service::PromptService;
use crate::services::reference_service::ReferenceService;
use crate::services::validation_service::ValidationService;
use crate::utils::json_recovery;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Result of one family run, successful or not.
#[derive(Debug)]
pub struct FamilyOutcome {
    pub family: Family,
    pub attempts: u32,
    pub result: Result<FamilyCollection>,
}

#[derive(Debug)]
pub struct FamilyFailure {
    pub family: Family,
    pub attempts: u32,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    pub collections: Vec<FamilyCollection>,
    pub failures: Vec<FamilyFailure>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Merged collection, only when no family failed.
    pub fn merged(&self) -> Option<GeneratedCollection> {
        self.is_complete()
            .then(|| GeneratedCollection::new(self.collections.clone()))
    }

    fn push(&mut self, outcome: FamilyOutcome) {
        match outcome.result {
            Ok(collection) => self.collections.push(collection),
            Err(error) => self.failures.push(FamilyFailure {
                family: outcome.family,
                attempts: outcome.attempts,
                error,
            }),
        }
    }
}

#[derive(Clone)]
pub struct GenerationService {
    generator: Arc<dyn TextGenerator>,
    references: ReferenceService,
    max_attempts: u32,
    max_concurrency: usize,
    sample_seed: Option<u64>,
    backoff: Duration,
}

impl GenerationService {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        references: ReferenceService,
        max_attempts: u32,
        max_concurrency: usize,
        sample_seed: Option<u64>,
    ) -> Self {
        Self {
            generator,
            references,
            max_attempts: max_attempts.max(1),
            max_concurrency: max_concurrency.max(1),
            sample_seed,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Base delay between attempts; attempt `n` waits `n * backoff`.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// The request for a family: sampled references rendered as context, plus
    /// the response schema when the backend enforces one.
    pub async fn build_request(&self, family: Family) -> GenerationRequest {
        let pool = self.references.load_pool(family).await;
        let sample = {
            let mut rng = ReferenceService::rng_for(self.sample_seed, family);
            ReferenceService::sample(&pool, &mut rng)
        };
        let context = (!sample.is_empty()).then(|| {
            ContextService::build_context_block(
                family.tag(),
                &sample,
                family.context_max_items(),
                MAX_CHARS_PER_ITEM,
            )
        });

        let schema = FamilySchema::for_family(family);
        GenerationRequest {
            system_instruction: PromptService::system_instruction(family).to_string(),
            user_content: PromptService::user_message(family, context.as_deref()),
            response_schema: self
                .generator
                .supports_schema()
                .then(|| schema.response_schema()),
        }
    }

    pub async fn generate_family(&self, family: Family) -> FamilyOutcome {
        let schema = FamilySchema::for_family(family);
        let request = self.build_request(family).await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.attempt(&schema, &request).await;
            match result {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        family = %family,
                        attempt,
                        error = %e,
                        "Generation attempt failed, retrying"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                result => {
                    return FamilyOutcome {
                        family,
                        attempts: attempt,
                        result: result.map(|items| FamilyCollection { family, items }),
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        schema: &FamilySchema,
        request: &GenerationRequest,
    ) -> Result<Vec<crate::models::item::Item>> {
        let raw = self.generator.generate(request).await?;
        let values = json_recovery::recover_items(&raw)?;
        ValidationService::validate(schema, &values)
    }

    /// Runs the requested families on a bounded pool and collects the
    /// outcomes in family order.
    pub async fn run(&self, families: &[Family]) -> GenerationReport {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set = JoinSet::new();
        let mut task_families: HashMap<task::Id, Family> = HashMap::with_capacity(families.len());

        for family in families.iter().copied() {
            let service = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let handle = join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return FamilyOutcome {
                            family,
                            attempts: 0,
                            result: Err(Error::Internal(e.to_string())),
                        }
                    }
                };
                tracing::info!(family = %family, "Generating family");
                service.generate_family(family).await
            });
            task_families.insert(handle.id(), family);
        }

        let mut outcomes = Vec::with_capacity(families.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => {
                    match &outcome.result {
                        Ok(collection) => tracing::info!(
                            family = %outcome.family,
                            items = collection.items.len(),
                            attempts = outcome.attempts,
                            "Family generated"
                        ),
                        Err(e) => tracing::error!(
                            family = %outcome.family,
                            attempts = outcome.attempts,
                            error = %e,
                            "Family failed"
                        ),
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    let Some(family) = task_families.get(&e.id()).copied() else {
                        tracing::error!(error = ?e, "Generation task for unknown family failed");
                        continue;
                    };
                    tracing::error!(family = %family, error = ?e, "Generation task panicked");
                    outcomes.push(FamilyOutcome {
                        family,
                        attempts: 0,
                        result: Err(Error::Internal(format!("generation task aborted: {}", e))),
                    });
                }
            }
        }

        outcomes.sort_by_key(|o| o.family);
        let mut report = GenerationReport::default();
        for outcome in outcomes {
            report.push(outcome);
        }
        report
    }
}
