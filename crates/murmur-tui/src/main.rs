//! murmur terminal client entry point.
//!
//! # Usage
//!
//! ```bash
//! # Chat as alice in #general and #random with a demo peer
//! murmur-tui --user-id alice --rooms general,random --peer bob
//!
//! # Verbose logs (the terminal is taken, so logs go to a file)
//! RUST_LOG=murmur_client=debug murmur-tui --log-file murmur.log
//! ```

use std::{fs::File, path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};
use murmur_client::{HistoryFailurePolicy, ReactionPolicy, SessionConfig};
use murmur_tui::{DemoPeer, Runtime, SystemEnv, TerminalDriver, seed_backend};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// murmur terminal chat client
#[derive(Parser, Debug)]
#[command(name = "murmur-tui")]
#[command(about = "Terminal chat client with realtime room sessions")]
#[command(version)]
struct Args {
    /// Local user id
    #[arg(short, long, default_value = "alice")]
    user_id: String,

    /// Display name (defaults to the user id)
    #[arg(long)]
    username: Option<String>,

    /// Rooms to create, in sidebar order
    #[arg(short, long, value_delimiter = ',', default_value = "general,random")]
    rooms: Vec<String>,

    /// Simulated peer that chats in the rooms
    #[arg(long)]
    peer: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log file
    #[arg(long, default_value = "murmur.log")]
    log_file: PathBuf,

    /// Inactivity before "stopped typing" is announced, in milliseconds
    #[arg(long, default_value_t = 2000)]
    typing_timeout_ms: u64,

    /// Reaction uniqueness
    #[arg(long, value_enum, default_value_t = ReactionArg::AllowRepeats)]
    reaction_policy: ReactionArg,

    /// What a room shows when its history fails to load
    #[arg(long, value_enum, default_value_t = HistoryArg::Surface)]
    history_failure: HistoryArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReactionArg {
    AllowRepeats,
    OncePerUser,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HistoryArg {
    Surface,
    SilentEmpty,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            typing_idle_timeout: Duration::from_millis(self.typing_timeout_ms),
            reaction_policy: match self.reaction_policy {
                ReactionArg::AllowRepeats => ReactionPolicy::AllowRepeats,
                ReactionArg::OncePerUser => ReactionPolicy::OncePerUser,
            },
            history_failure: match self.history_failure {
                HistoryArg::Surface => HistoryFailurePolicy::Surface,
                HistoryArg::SilentEmpty => HistoryFailurePolicy::SilentEmpty,
            },
            ..SessionConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_file = File::create(&args.log_file)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Arc::new(log_file)).with_ansi(false))
        .with(filter)
        .init();

    let username = args.username.clone().unwrap_or_else(|| args.user_id.clone());
    tracing::info!(user_id = %args.user_id, %username, rooms = ?args.rooms, "murmur starting");

    let backend = seed_backend(&args.user_id, &username, &args.rooms);
    let env = SystemEnv::new();

    if let Some(peer) = &args.peer {
        let peer = DemoPeer::join(backend.clone(), peer, &args.rooms);
        tokio::spawn(peer.run(env));
    }

    let driver = TerminalDriver::new()?;
    let runtime = Runtime::new(
        driver,
        env,
        Arc::new(backend.connect()),
        args.user_id.as_str().into(),
        args.session_config(),
    );

    runtime.run().await?;
    tracing::info!("murmur stopped");
    Ok(())
}
