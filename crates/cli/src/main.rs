use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    quickreply_auth::{AuthStore, SessionRecord},
    quickreply_common::ChannelOutbound,
    quickreply_config::QuickreplyConfig,
    quickreply_dispatch::{AnswerClient, RetryPolicy, TokioSleeper},
    quickreply_extract::{CaptionClient, ContentExtractor, TranscriptionClient, ensure_media_dirs},
    quickreply_pipeline::{Pipeline, PipelineOptions},
    quickreply_whatsapp::{SidecarClient, SidecarOutbound},
};

#[derive(Parser)]
#[command(name = "quickreply", about = "Quickreply — WhatsApp auto-responder gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file path (overrides the default discovery).
    #[arg(long, global = true, env = "QUICKREPLY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway (default when no subcommand is provided).
    Run,
    /// Persisted session record management.
    Creds {
        #[command(subcommand)]
        action: CredsAction,
    },
}

#[derive(Subcommand)]
enum CredsAction {
    /// Summarize the stored record without exposing key material.
    Show,
    /// Wipe the record; the next run pairs via QR again.
    Reset,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = match &cli.config {
        Some(path) => quickreply_config::load_config(path)?,
        None => quickreply_config::discover_and_load(),
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Creds { action } => creds(config, action).await,
    }
}

async fn run(config: QuickreplyConfig) -> anyhow::Result<()> {
    ensure_media_dirs(&config.media.dir)
        .await
        .context("failed to create media directories")?;

    // An unreachable store is fatal here: running without durable
    // credentials would force a fresh pairing on every restart.
    let store = Arc::new(
        AuthStore::init(&config.store.database_url)
            .await
            .context("session store must be reachable at startup")?,
    );

    let transcription = TranscriptionClient::new(
        config.openai.base_url.clone(),
        config.openai.api_key.clone(),
        config.openai.transcribe_model.clone(),
    );
    let caption = CaptionClient::new(
        config.openai.base_url.clone(),
        config.openai.api_key.clone(),
        config.openai.caption_model.clone(),
        config.openai.caption_prompt.clone(),
    );
    let extractor = ContentExtractor::new(
        transcription,
        caption,
        config.media.dir.clone(),
        config.openai.caption_preamble.clone(),
    );

    let dispatcher = Arc::new(AnswerClient::new(
        config.answer.endpoint.clone(),
        Duration::from_secs(config.answer.timeout_secs),
        RetryPolicy {
            max_attempts: config.answer.max_attempts,
            base_delay: Duration::from_millis(config.answer.backoff_base_ms),
        },
        Arc::new(TokioSleeper),
    )?);

    let outbound = SidecarOutbound::new();
    let pipeline = Arc::new(Pipeline::new(
        extractor,
        dispatcher,
        Arc::new(outbound.clone()) as Arc<dyn ChannelOutbound>,
        PipelineOptions {
            debounce_window: Duration::from_millis(config.pipeline.debounce_window_ms),
            suppress_empty_dispatch: config.pipeline.suppress_empty_dispatch,
            allowlist: config.pipeline.allowlist.clone(),
        },
    ));

    info!(
        endpoint = %config.answer.endpoint,
        sidecar = %config.sidecar.url,
        window_ms = config.pipeline.debounce_window_ms,
        "gateway starting"
    );

    let client = SidecarClient::new(
        config.sidecar.url.clone(),
        config.sidecar.connect_attempts,
        pipeline,
        Arc::clone(&store),
        outbound,
    );
    let result = client.run().await;
    store.close().await;
    result
}

async fn creds(config: QuickreplyConfig, action: CredsAction) -> anyhow::Result<()> {
    let store = AuthStore::init(&config.store.database_url)
        .await
        .context("session store must be reachable")?;

    match action {
        CredsAction::Show => {
            let record = store.snapshot().await?;
            println!("registered:  {}", record.is_registered());
            println!("keys:        {}", record.keys.len());
            let extra: Vec<&str> = record.extra.keys().map(String::as_str).collect();
            println!(
                "sub-records: {}",
                if extra.is_empty() {
                    "none".to_string()
                } else {
                    extra.join(", ")
                }
            );
        },
        CredsAction::Reset => {
            store.update(|record| *record = SessionRecord::default()).await?;
            println!("session record reset; the next run will pair via QR");
        },
    }

    store.close().await;
    Ok(())
}
