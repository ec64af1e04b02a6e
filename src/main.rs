use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use validate_docs::{
    AsciidocLoader, Cli, ConfigManager, DirectiveIncludes, ExtensionRegistry, LoadContext,
    Reporter, ValidationEngine, normalize_path,
};

/// Exit code for configuration and startup errors
const EXIT_STARTUP_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // RUST_LOG takes precedence over -v/--debug
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_STARTUP_ERROR)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = ConfigManager::load_config(&cli)
        .await
        .context("invalid configuration")?;

    let registry = ExtensionRegistry::from_names(&config.extensions.enabled)
        .context("invalid extension selection")?;

    if cli.list_extensions {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let content_dir = config.documents.content_dir.clone();
    let engine = ValidationEngine::new(
        Arc::new(AsciidocLoader::new()),
        LoadContext::new(content_dir.clone()),
        registry,
        config.engine_config(),
    )?;

    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; remaining documents will not be started");
            cancel.cancel();
        }
    });

    let (results, entry) = if cli.files.is_empty() {
        let index = &config.documents.index_file;
        let results = engine
            .check_index(index, &DirectiveIncludes)
            .await
            .with_context(|| {
                format!(
                    "cannot read index document {}",
                    content_dir.join(index).display()
                )
            })?;
        (results, Some(normalize_path(index)))
    } else {
        (engine.check_documents(&cli.files).await?, None)
    };

    let mut reporter = Reporter::new(config.report.ci, config.report.threshold)
        .with_format(config.report.format);
    if let Some(entry) = entry {
        reporter = reporter.with_entry_document(entry, config.report.include_entry_document);
    }
    reporter.report(&results)?;

    tracing::info!(
        documents = results.documents_checked(),
        issues = results.total_issues(),
        failed = results.failures.len(),
        loads = engine.cache().loads(),
        "validation finished"
    );

    Ok(if results.has_issues() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
