use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use troll::channels::{Messenger, TelegramChannel};
use troll::troll::{RateLimit, Troll};

#[derive(Parser)]
#[command(name = "troll")]
#[command(about = "Troll CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: TROLL_CONFIG_PATH or ~/.troll/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// React to messages from the configured contact until Ctrl+C.
    Run {
        /// Config file path (default: TROLL_CONFIG_PATH or ~/.troll/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Target contact (@username or numeric id); overrides target.address.
        #[arg(long, short)]
        target: Option<String>,

        /// Sticker set short name; overrides assets.collectionName.
        #[arg(long, short)]
        stickers: Option<String>,

        /// Do not run the presence loop.
        #[arg(long)]
        no_presence: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("troll {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run {
            config,
            target,
            stickers,
            no_presence,
        }) => {
            if let Err(e) = run(config, target, stickers, no_presence).await {
                log::error!("run failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(troll::config::default_config_path);
    let dir = troll::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run(
    config_path: Option<std::path::PathBuf>,
    target: Option<String>,
    stickers: Option<String>,
    no_presence: bool,
) -> anyhow::Result<()> {
    let (mut config, path) = troll::config::load_config(config_path)?;
    if let Some(t) = target {
        config.target.address = t;
    }
    if let Some(s) = stickers {
        config.assets.collection_name = s;
    }
    if no_presence {
        config.presence.enabled = false;
    }
    if config.target.address.trim().is_empty() {
        anyhow::bail!(
            "no target configured (set target.address in {} or pass --target)",
            path.display()
        );
    }
    if troll::config::resolve_telegram_token(&config).is_none() {
        anyhow::bail!("no bot token configured (set channels.telegram.botToken or TELEGRAM_BOT_TOKEN)");
    }

    let channel = Arc::new(
        TelegramChannel::new(
            troll::config::resolve_telegram_token(&config),
            troll::config::resolve_api_base(&config),
        )
        .with_own_chat(config.channels.telegram.own_chat_id),
    );
    let messenger: Arc<dyn Messenger> = channel.clone();
    let mut agent = Troll::new(
        config.target.address.clone(),
        config.assets.collection_name.clone(),
        messenger,
    )
    .with_presence_interval(config.presence.interval());
    if let Some(every) = config.reactor.rate_limit() {
        log::info!("reactor: rate limited to one reaction per {}s", every.as_secs());
        agent = agent.with_policy(RateLimit::every(every));
    }
    let agent = Arc::new(agent);

    let (updates_tx, updates_rx) = mpsc::channel(64);
    let poller = channel.clone().start_inbound(updates_tx);

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    log::info!("reacting to {}", config.target.address);
    let result = agent.serve(cancel, config.presence.enabled, updates_rx).await;

    channel.stop();
    poller.abort();
    result.map_err(anyhow::Error::from)
}

/// Cancel `cancel` on Ctrl+C or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("installing Ctrl+C handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("installing SIGTERM handler failed: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel.cancelled() => return,
    }
    log::info!("shutdown signal received, stopping");
    cancel.cancel();
}
