mod config_cmd;
mod follow_cmd;
mod output;
mod render_cmd;
mod tail;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agentline",
    version,
    about = "Reconcile agent event streams into a readable timeline"
)]
struct Cli {
    /// Config file (default: ~/.config/agentline/agentline.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a recorded event stream as a timeline
    Render(render_cmd::RenderArgs),

    /// Follow a growing event file and print new timeline entries
    Follow(follow_cmd::FollowArgs),

    /// Show or initialize configuration
    Config(config_cmd::ConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Render(args) => {
            let config = config_cmd::load_effective(explicit)?;
            render_cmd::run(args, &config.timeline)
        }
        Commands::Follow(args) => {
            let config = config_cmd::load_effective(explicit)?;
            follow_cmd::run(args, &config).await
        }
        Commands::Config(args) => config_cmd::run(args, explicit),
    }
}
