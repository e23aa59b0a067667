//! rps-lobby CLI - drive a shared rock-paper-scissors lobby from the shell.
//!
//! Every invocation is one execution context over a file-backed document, so
//! several shells pointed at the same `--state-dir` share one lobby.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use rps_lobby::Choice;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "warn,rps_lobby=info";

/// rps-lobby - a multi-context rock-paper-scissors lobby
#[derive(Parser, Debug)]
#[command(name = "rps-lobby")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the shared document
    #[arg(long, global = true, env = "RPS_LOBBY_DIR", default_value = ".rps-lobby")]
    state_dir: PathBuf,

    /// JSON config file (default: RPS_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, global = true, default_value = "text")]
    format: cli::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a player
    Join {
        /// Username to register
        username: String,
    },

    /// Remove a player and their queue entries
    Leave {
        /// Username to remove
        username: String,
    },

    /// List online players
    Players,

    /// Challenge another player (queues if they are in a game)
    Challenge {
        /// Challenging player
        challenger: String,
        /// Player being challenged
        challenged: String,
    },

    /// Accept a pending challenge and start a game
    Accept {
        /// Challenge id
        challenge_id: String,
        /// Player accepting (must be the one challenged)
        user: String,
    },

    /// Reject a pending challenge
    Reject {
        /// Challenge id
        challenge_id: String,
        /// Player rejecting (must be the one challenged)
        user: String,
    },

    /// List open challenges for a player
    Pending {
        /// Player whose challenges to list
        user: String,

        /// List challenges the player issued instead
        #[arg(long)]
        outgoing: bool,
    },

    /// Submit a choice in an active game
    Choose {
        /// Game session id
        session_id: String,
        /// Player choosing
        user: String,
        /// rock, paper or scissors
        choice: Choice,
    },

    /// Show a game session
    Session {
        /// Session id
        #[arg(required_unless_present = "player")]
        session_id: Option<String>,

        /// Show this player's active session instead
        #[arg(short, long, conflicts_with = "session_id")]
        player: Option<String>,
    },

    /// Show the leaderboard
    Leaderboard {
        /// Show only the top N entries
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Show the waiting queue
    Queue,

    /// Remove expired challenges and old completed sessions
    Sweep,

    /// Poll the lobby and print changes as they happen
    Watch {
        /// Also report when this player's game starts or ends
        #[arg(short, long)]
        player: Option<String>,

        /// Loop tick in milliseconds (default: shortest configured interval)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many polls
        #[arg(short, long)]
        count: Option<u64>,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    let format = args.format;

    let result = cli::open(&args.state_dir, args.config.as_deref()).and_then(|lobby| match args.command {
        Commands::Join { username } => cli::players::join(&lobby, &username, format),
        Commands::Leave { username } => cli::players::leave(&lobby, &username, format),
        Commands::Players => cli::players::list(&lobby, format),

        Commands::Challenge {
            challenger,
            challenged,
        } => cli::challenge::issue(&lobby, &challenger, &challenged, format),
        Commands::Accept { challenge_id, user } => {
            cli::challenge::accept(&lobby, &challenge_id, &user, format)
        }
        Commands::Reject { challenge_id, user } => {
            cli::challenge::reject(&lobby, &challenge_id, &user, format)
        }
        Commands::Pending { user, outgoing } => cli::challenge::pending(&lobby, &user, outgoing, format),

        Commands::Choose {
            session_id,
            user,
            choice,
        } => cli::play::choose(&lobby, &session_id, &user, choice, format),
        Commands::Session { session_id, player } => {
            cli::play::show(&lobby, session_id.as_deref(), player.as_deref(), format)
        }

        Commands::Leaderboard { top } => cli::board::leaderboard(&lobby, top, format),
        Commands::Queue => cli::board::queue(&lobby, format),
        Commands::Sweep => cli::board::sweep(&lobby, format),
        Commands::Watch {
            player,
            interval,
            count,
        } => cli::watch::execute(&lobby, player.as_deref(), interval, count, format),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
