use exam_generator::{config::Config, AppContext};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    info!(
        model = %config.gemini_model,
        families = ?config.families,
        output_dir = %config.output_dir.display(),
        "Starting generation run"
    );

    let app = AppContext::new(config)?;
    let (report, export) = app.run().await;

    for path in &export.written {
        info!(path = %path.display(), "Artifact written");
    }
    for failure in &report.failures {
        tracing::error!(
            family = %failure.family,
            attempts = failure.attempts,
            error = %failure.error,
            "Family did not produce an artifact"
        );
        if let exam_generator::error::Error::MalformedOutput(e) = &failure.error {
            tracing::debug!(family = %failure.family, raw = %e.raw_preview(), "Raw model output");
        }
    }

    if !report.is_complete() {
        anyhow::bail!(
            "{} of {} families failed",
            report.failures.len(),
            report.failures.len() + report.collections.len()
        );
    }
    if !export.is_clean() {
        anyhow::bail!("{} artifact(s) could not be written", export.failed.len());
    }
    info!(
        items = report.collections.iter().map(|c| c.items.len()).sum::<usize>(),
        "Generation run complete"
    );
    Ok(())
}
