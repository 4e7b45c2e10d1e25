//! heartrisk: heart-disease severity assessment API.
//!
//! Main entry point for the HTTP server.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartrisk::adapters::sanitize::SanitizingMakeWriter;
use heartrisk::adapters::FsArtifactStore;
use heartrisk::api::{self, ApiContext};
use heartrisk::config::{LogMode, Settings};
use heartrisk::AssessmentService;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;

    let (writer, _guard) = match settings.log_mode {
        LogMode::File => {
            if let Some(parent) = settings.log_file.parent() {
                // Best-effort: the open below reports the real failure.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_file)
                .with_context(|| format!("cannot open log file {:?}", settings.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stdout => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting heartrisk {}...", heartrisk::config::APP_VERSION);

    // Artifacts are loaded once; any failure aborts startup.
    let store = FsArtifactStore::open(&settings.model_dir, settings.require_manifest)
        .context("cannot open model directory")?;
    let service = AssessmentService::load(&store).context("cannot load model artifacts")?;

    api::serve(&settings, ApiContext::new(service))
        .await
        .context("server error")?;

    tracing::info!("heartrisk shutdown complete.");
    Ok(())
}
