//! CLI entrypoint for parley
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use parley_application::{ChatController, ChatLogger};
use parley_domain::ModelId;
use parley_infrastructure::{ConfigLoader, JsonlChatLogger, OllamaBackend};
use parley_presentation::{ChatRepl, Cli, ConsoleFormatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    // Load configuration
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };
    config.validate()?;

    // CLI model flag overrides the configured default
    let model = cli
        .model
        .clone()
        .map(ModelId::new)
        .unwrap_or_else(|| config.default_model());

    info!("Starting parley with model {}", model);

    // === Dependency Injection ===
    let mut backend = OllamaBackend::with_command(&config.backend.command);
    if let Some(secs) = config.backend.timeout_seconds {
        backend = backend.with_timeout(Duration::from_secs(secs));
    }

    let mut controller = ChatController::new(Arc::new(backend), model);
    if config.chat.log_transcript
        && let Some(logger) = transcript_logger()
    {
        info!("Recording transcript to {}", logger.path().display());
        controller = controller.with_logger(Arc::new(logger) as Arc<dyn ChatLogger>);
    }
    let controller = Arc::new(controller);

    // Advisory only: the backend may still come up later
    if !controller.backend_ready().await {
        eprintln!(
            "{} {} is not in the local model list. Pull it with: ollama pull {}",
            "Warning:".yellow().bold(),
            controller.active_model(),
            controller.active_model(),
        );
    }

    // Chat mode
    if cli.chat {
        let repl = ChatRepl::new(controller)
            .with_progress(!cli.quiet && config.repl.show_progress)
            .with_streaming(cli.stream || config.chat.stream_replies)
            .with_history_file(config.repl.history_file.clone().map(PathBuf::from));

        repl.run().await?;
        return Ok(());
    }

    // One-shot mode - prompt is required
    let prompt = match cli.prompt {
        Some(p) => p,
        None => bail!("Prompt is required. Use --chat for interactive mode."),
    };

    if cli.stream || config.chat.stream_replies {
        let mut printed = String::new();
        controller
            .submit_prompt_streaming(&prompt, |snapshot| {
                if let Some(suffix) = snapshot.strip_prefix(printed.as_str()) {
                    print!("{suffix}");
                } else {
                    if !printed.is_empty() {
                        println!();
                    }
                    print!("{snapshot}");
                }
                use std::io::Write;
                let _ = std::io::stdout().flush();
                printed = snapshot.to_string();
            })
            .await?;
        println!();
    } else {
        let reply = controller.submit_prompt(&prompt).await?;
        println!("{}", reply);
    }

    if cli.verbose > 0 {
        eprintln!();
        eprintln!("{}", ConsoleFormatter::format_stats(&controller.stats()));
    }

    Ok(())
}

/// Transcript log under the user data directory, one file per run.
fn transcript_logger() -> Option<JsonlChatLogger> {
    let dir = dirs::data_dir()?.join("parley").join("transcripts");
    let filename = format!("{}.jsonl", chrono::Local::now().format("%Y%m%d-%H%M%S"));
    JsonlChatLogger::new(dir.join(filename))
}
