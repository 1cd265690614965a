pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    ai_service::{GeminiService, TextGenerator},
    export_service::{ExportService, ExportSummary},
    generation_service::{GenerationReport, GenerationService},
    reference_service::ReferenceService,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Everything a run needs, built once from configuration.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub generation_service: GenerationService,
    pub export_service: ExportService,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let generator: Arc<dyn TextGenerator> = Arc::new(GeminiService::new(&config, http_client));
        Ok(Self::with_generator(config, generator))
    }

    /// Same wiring around any generation backend.
    pub fn with_generator(config: Config, generator: Arc<dyn TextGenerator>) -> Self {
        let generation_service = GenerationService::new(
            generator,
            ReferenceService::new(config.reference_dir.clone()),
            config.max_attempts,
            config.max_concurrency,
            config.sample_seed,
        );
        let export_service = ExportService::new(config.output_dir.clone());

        Self {
            config,
            generation_service,
            export_service,
        }
    }

    /// Generates the configured families and writes their artifacts.
    pub async fn run(&self) -> (GenerationReport, ExportSummary) {
        let report = self.generation_service.run(&self.config.families).await;
        let summary = self.export_service.persist(&report).await;
        (report, summary)
    }
}
