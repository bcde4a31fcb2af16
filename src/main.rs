use anyhow::Context;
use std::sync::Arc;
use subot::{
    api::routes::create_app,
    cli::{
        init::{self, InitConfig, InitResult},
        output::Output,
        Cli, Commands, IndexCommands,
    },
    rag::embeddings::create_embedder,
    AppState, ConfigManager, IndexManager, StartupOutcome, SubotConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            provider,
            web_search,
            host,
            port,
        }) => {
            let result = init::run(
                InitConfig {
                    path,
                    force,
                    provider,
                    web_search,
                    host,
                    port,
                },
                &output,
            );
            match result {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => Err(anyhow::anyhow!(e)),
            }
        }
        Some(Commands::Config { full, validate }) => show_config(&cli.config, full, validate, &output),
        command => {
            let config_manager = ConfigManager::load_or_default(&cli.config)
                .with_context(|| format!("loading {}", cli.config.display()))?;
            init_tracing(&config_manager.config(), cli.verbose);

            match command {
                Some(Commands::Ask { query }) => ask(config_manager, &query, &output).await,
                Some(Commands::Chat) => chat(config_manager, &output).await,
                Some(Commands::Index(IndexCommands::Rebuild)) => {
                    rebuild_index(&config_manager.config(), &output).await
                }
                Some(Commands::Index(IndexCommands::Stats)) => {
                    index_stats(&config_manager.config(), &output).await
                }
                Some(Commands::Serve { host, port }) => serve(config_manager, host, port).await,
                _ => serve(config_manager, None, None).await,
            }
        }
    }
}

/// `RUST_LOG` wins over `server.log_level`; `-v` forces debug for this crate.
fn init_tracing(config: &SubotConfig, verbose: bool) {
    let default_directive = if verbose {
        format!("{},subot=debug", config.server.log_level)
    } else {
        config.server.log_level.clone()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(filter);
    if config.server.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

async fn build_state(config_manager: ConfigManager) -> anyhow::Result<AppState> {
    let rebuild_on_start = config_manager.config().index.rebuild_on_start;
    let state = AppState::from_config(config_manager)?;
    match state.index_manager.load_or_rebuild(rebuild_on_start).await {
        StartupOutcome::Loaded(count) => tracing::info!(count, "Index ready"),
        StartupOutcome::Rebuilt(report) => {
            tracing::info!(segments = report.segments, "Index built from corpus")
        }
        StartupOutcome::Empty => {
            tracing::warn!("Index is empty; every question will go to web search")
        }
    }
    Ok(state)
}

async fn serve(
    config_manager: ConfigManager,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let config = config_manager.config();
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let state = build_state(config_manager).await?;
    let app = create_app(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("SU_BOT listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

async fn ask(config_manager: ConfigManager, query: &str, output: &Output) -> anyhow::Result<()> {
    let state = build_state(config_manager).await?;
    let (_, answer) = state.assistant.ask(None, query).await?;
    output.answer(&answer);
    Ok(())
}

async fn chat(config_manager: ConfigManager, output: &Output) -> anyhow::Result<()> {
    let state = build_state(config_manager).await?;
    output.banner();
    output.hint("Type a question, or 'exit' to quit");

    let mut session: Option<String> = None;
    while let Some(line) = output.prompt() {
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        match state.assistant.ask(session.as_deref(), &line).await {
            Ok((id, answer)) => {
                session = Some(id);
                output.answer(&answer);
            }
            Err(e) => output.error(&e.to_string()),
        }
    }
    Ok(())
}

fn index_manager(config: &SubotConfig) -> anyhow::Result<IndexManager> {
    let embedder = create_embedder(&config.embedding)?;
    Ok(IndexManager::new(config, embedder)?)
}

async fn rebuild_index(config: &Arc<SubotConfig>, output: &Output) -> anyhow::Result<()> {
    output.header("Rebuilding index");
    let manager = index_manager(config)?;
    let report = manager.rebuild().await?;

    output.kv("documents", &report.documents.to_string());
    output.kv("skipped", &report.skipped.to_string());
    output.kv("segments", &report.segments.to_string());
    output.kv("elapsed", &format!("{}ms", report.elapsed_ms));
    output.complete(&format!("Index written to {}", config.index.data_path.display()));
    Ok(())
}

async fn index_stats(config: &Arc<SubotConfig>, output: &Output) -> anyhow::Result<()> {
    let manager = index_manager(config)?;
    match manager.load().await {
        Ok(Some(_)) => {}
        Ok(None) => {
            output.warning("No persisted index found");
            output.command("subot index rebuild");
            return Ok(());
        }
        Err(e) => {
            output.error(&format!("Persisted index is unusable: {}", e));
            output.command("subot index rebuild");
            return Err(e.into());
        }
    }

    let stats = manager.stats();
    output.header("Index");
    output.kv("segments", &stats.count.to_string());
    output.kv("dimensions", &stats.dimensions.to_string());
    output.kv("metric", &stats.metric);
    output.kv("memory", &format!("{} bytes", stats.memory_bytes));
    output.kv("path", &config.index.data_path.display().to_string());
    output.kv("embedding model", manager.embedder().model_name());
    Ok(())
}

fn show_config(
    path: &std::path::Path,
    full: bool,
    validate: bool,
    output: &Output,
) -> anyhow::Result<()> {
    output.banner();

    let config = if path.exists() {
        SubotConfig::from_toml(&std::fs::read_to_string(path)?)?
    } else {
        output.warning(&format!("{} not found, showing defaults", path.display()));
        SubotConfig::default()
    };

    if validate {
        match config.validate() {
            Ok(()) => output.success("Configuration is valid"),
            Err(e) => {
                output.error(&format!("Configuration is invalid: {}", e));
                return Err(e.into());
            }
        }
    }

    if full {
        output.header("Configuration");
        println!("{}", toml::to_string_pretty(&config)?);
    } else {
        output.header("Summary");
        output.kv("server", &format!("{}:{}", config.server.host, config.server.port));
        output.kv("corpus", &config.corpus.dir.display().to_string());
        output.kv("index", &config.index.data_path.display().to_string());
        output.kv("embedding", &format!("{:?} ({})", config.embedding.backend, config.embedding.model));
        output.kv("web search", &format!("{:?}", config.web_search.provider));
        output.kv(
            "router",
            &format!(
                "high {} / low {}",
                config.router.high_confidence, config.router.low_confidence
            ),
        );
    }
    Ok(())
}
