use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use avatar_gateway::api::ApiServer;
use avatar_gateway::canned::{INTRO, MISSING_API_KEY};
use avatar_gateway::Config;

/// Avatar - Chat and lip-sync backend for a talking avatar
#[derive(Parser)]
#[command(name = "avatar", version, about)]
struct Cli {
    /// Path to a TOML config file (default: ~/.config/avatar-gateway/config.toml)
    #[arg(short, long, env = "AVATAR_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check configuration, external tools and canned assets
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,avatar_gateway=info",
        1 => "info,avatar_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(Command::Check) = cli.command {
        return check(&config);
    }

    tracing::info!(
        port = config.server.port,
        audio_dir = %config.storage.audio_dir.display(),
        model = %config.llm.model,
        "starting avatar gateway"
    );

    config.ensure_dirs()?;

    let missing = INTRO.missing_assets(&config.storage.audio_dir);
    if !missing.is_empty() {
        tracing::warn!(?missing, "intro assets missing - empty messages will fail");
    }

    ApiServer::from_config(&config)?.run().await?;

    Ok(())
}

/// Report what the server needs at runtime without starting it
///
/// Only missing tools fail the check; without a key or canned assets the
/// server still starts but some replies fail.
fn check(config: &Config) -> anyhow::Result<()> {
    let mut missing_tools = 0;

    for (name, program) in [
        ("ffmpeg", &config.tools.ffmpeg),
        ("rhubarb", &config.tools.rhubarb),
    ] {
        match which::which(program) {
            Ok(path) => println!("ok       {name}: {}", path.display()),
            Err(e) => {
                println!("missing  {name}: {} ({e})", program.display());
                missing_tools += 1;
            }
        }
    }

    let key_set = config
        .provider
        .api_key
        .as_ref()
        .is_some_and(|key| !key.expose_secret().is_empty());
    if key_set {
        println!("ok       api key ({})", config.provider.base_url);
    } else {
        println!("warning  api key: OPENAI_API_KEY not set, canned replies only");
    }

    for reply in [&INTRO, &MISSING_API_KEY] {
        for path in reply.missing_assets(&config.storage.audio_dir) {
            println!("warning  asset missing: {}", path.display());
        }
    }

    if missing_tools > 0 {
        anyhow::bail!("{missing_tools} required tool(s) not found");
    }

    println!("required tools found");
    Ok(())
}
