// ABOUTME: Main entry point for banter
// ABOUTME: Loads config, wires backend, transport, dispatcher, watchdog, and runs until Ctrl-C

use anyhow::{Context, Result};
use banter::platform::{ConsoleChannel, ConsolePlatform};
use banter_agent::BackendRegistry;
use banter_core::traits::{AgentChannels, MessagingPlatform, SharedChannel};
use banter_core::{
    Config, ConversationContext, InactivityWatchdog, Orchestrator, OrchestratorConfig,
    ResponseDispatcher,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long in-flight replies get to finish on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "banter")]
#[command(about = "Chat agents that keep a group conversation going", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to BANTER_CONFIG_PATH or ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Talk to the agents from this terminal instead of Telegram
    #[arg(long)]
    console: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Transport picked at startup
struct Transport {
    platform: Box<dyn MessagingPlatform>,
    channels: AgentChannels,
    channel_id: String,
}

fn console_transport(ctx: &ConversationContext) -> Transport {
    let primary: SharedChannel = Arc::new(ConsoleChannel::new("banter"));
    let channels = ctx.agents().into_iter().fold(AgentChannels::new(primary), |acc, agent| {
        acc.with_agent(agent.id.clone(), Arc::new(ConsoleChannel::new(agent.name)))
    });
    Transport {
        platform: Box::new(ConsolePlatform::stdin()),
        channels,
        channel_id: banter::platform::console::CONSOLE_CHANNEL.to_string(),
    }
}

#[cfg(feature = "telegram")]
async fn telegram_transport(config: &Config, ctx: &ConversationContext) -> Result<Transport> {
    use banter::platform::{TelegramChannel, TelegramPlatform};

    let (token, chat_id) = config.telegram_config()?;
    let platform = TelegramPlatform::new(token, chat_id).await?;

    let mut channels = AgentChannels::new(Arc::new(platform.channel()));
    for (agent_id, agent_token) in config.agent_tokens() {
        let label = ctx.agent(&agent_id).map(|a| a.name);
        tracing::info!(agent = %agent_id, "Agent speaks through its own Telegram bot");
        channels = channels.with_agent(
            agent_id,
            Arc::new(TelegramChannel::from_token(chat_id, &agent_token, label)),
        );
    }

    Ok(Transport {
        platform: Box::new(platform),
        channels,
        channel_id: chat_id.to_string(),
    })
}

#[cfg(not(feature = "telegram"))]
async fn telegram_transport(_config: &Config, _ctx: &ConversationContext) -> Result<Transport> {
    anyhow::bail!("banter was built without Telegram support; run with --console")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n╔══════════════════════════════════════════════════════════╗");
        eprintln!("║ PANIC! banter crashed with the following error:          ║");
        eprintln!("╚══════════════════════════════════════════════════════════╝\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    tracing::info!("Starting banter");

    dotenvy::dotenv().ok();
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(addr) = config.metrics_addr()? {
        banter_core::metrics::install_prometheus(addr)?;
    }

    let backend = BackendRegistry::default()
        .create_from_config(&config.backend)
        .context("Failed to create generation backend")?;
    tracing::info!(backend = %backend.name(), "Generation backend ready");

    let ctx = Arc::new(ConversationContext::new(
        config.settings(),
        config.resolved_agents(),
    ));
    for agent in ctx.agents() {
        tracing::info!(agent = %agent.id, name = %agent.name, model = %agent.model, "Agent loaded");
    }

    let transport = if cli.console {
        // Whoever sits at the terminal runs the show
        config
            .conversation
            .admin_users
            .push(banter::platform::console::CONSOLE_USER.to_string());
        console_transport(&ctx)
    } else {
        telegram_transport(&config, &ctx).await?
    };

    let dispatcher = ResponseDispatcher::new(Arc::clone(&ctx), backend, transport.channels);

    let orchestrator = Orchestrator::new(
        dispatcher.clone(),
        OrchestratorConfig {
            channel_id: Some(transport.channel_id),
            ignored_senders: vec![transport.platform.bot_user_id().to_string()],
            command_prefix: config.conversation.command_prefix.clone(),
            admin_users: config.conversation.admin_users.clone(),
        },
    );

    let watchdog = tokio::spawn(InactivityWatchdog::new(dispatcher.clone()).run());

    let events = transport.platform.event_stream().await?;
    tracing::info!(platform = transport.platform.platform_id(), "Listening for messages");

    tokio::select! {
        _ = orchestrator.run(events) => {
            tracing::info!("Event stream closed, shutting down");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Ctrl-C received, shutting down");
        }
    }

    watchdog.abort();
    if !dispatcher.shutdown(SHUTDOWN_GRACE).await {
        tracing::warn!(
            in_flight = dispatcher.in_flight(),
            "Replies still running after grace period"
        );
    }
    transport.platform.shutdown().await?;

    tracing::info!("banter stopped");
    Ok(())
}
