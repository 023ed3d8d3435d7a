use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod bootstrap;
mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "circlet")]
#[command(about = "circlet - circle locations and chat from the command line", long_about = None)]
struct Cli {
    /// Use this directory for config, logs and credentials instead of the
    /// platform defaults
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the access token
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Show whether the stored session is still accepted
    Status,
    /// Clear this process's session; the stored token file is kept
    Logout,
    /// List circles
    Circles,
    /// Show one circle with members and locations
    Circle { circle_id: String },
    /// List members of a circle
    Members { circle_id: String },
    /// Show one member
    Member { circle_id: String, member_id: String },
    /// Select a circle and resolve the device id used for location updates
    Select { circle_id: String },
    /// Report a custom location for your device
    UpdateLocation(commands::LocationArgs),
    /// List chat threads
    Threads {
        /// Only threads of this circle
        #[arg(long)]
        circle: Option<String>,
    },
    /// Show recent messages of a thread
    Messages { circle_id: String, thread_id: String },
    /// Send a message to the other participants of a thread
    Send {
        circle_id: String,
        thread_id: String,
        text: String,
    },
    /// Poll the thread list until interrupted
    WatchThreads {
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
    /// Poll a thread and print new messages until interrupted
    WatchMessages {
        circle_id: String,
        thread_id: String,
        /// Seconds between polls
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
    /// Send a raw API request (developer mode)
    Request(commands::RequestArgs),
    /// Print the resolved file locations
    Paths,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app = bootstrap::AppBootstrap::init(cli.base_dir.as_deref()).await?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::login(&app, username, password).await?
        }
        Commands::Status => commands::status(&app).await?,
        Commands::Logout => commands::logout(&app).await?,
        Commands::Circles => commands::circles(&app).await?,
        Commands::Circle { circle_id } => commands::circle(&app, circle_id).await?,
        Commands::Members { circle_id } => commands::members(&app, circle_id).await?,
        Commands::Member {
            circle_id,
            member_id,
        } => commands::member(&app, circle_id, member_id).await?,
        Commands::Select { circle_id } => commands::select(&app, circle_id).await?,
        Commands::UpdateLocation(args) => commands::update_location(&app, args).await?,
        Commands::Threads { circle } => commands::threads(&app, circle).await?,
        Commands::Messages {
            circle_id,
            thread_id,
        } => commands::messages(&app, circle_id, thread_id).await?,
        Commands::Send {
            circle_id,
            thread_id,
            text,
        } => commands::send(&app, circle_id, thread_id, text).await?,
        Commands::WatchThreads { interval } => commands::watch_threads(&app, interval).await?,
        Commands::WatchMessages {
            circle_id,
            thread_id,
            interval,
        } => commands::watch_messages(&app, circle_id, thread_id, interval).await?,
        Commands::Request(args) => commands::request(&app, args).await?,
        Commands::Paths => commands::paths(&app)?,
    }

    Ok(())
}
