//! AgentWorld host binary.
//!
//! `agentworld serve` runs the WorldViewer extension: it starts the host
//! update tick, binds the HTTP server, and shuts both down on ctrl-c.
//! `agentworld sign` prints HMAC headers for manual testing.

use agentworld_core::ExtensionIdentity;
use agentworld_viewer::WorldViewerExtension;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Default WorldViewer port.
const DEFAULT_PORT: u16 = 8900;

/// Host update tick cadence.
const TICK_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(name = "agentworld", version, about = "HTTP control plane for simulation-host extensions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the WorldViewer extension server.
    Serve {
        /// Port to listen on (overrides the version config default).
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Bind address.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory holding agent-world-http.json / agent-world-versions.json.
        #[arg(long)]
        config_dir: Option<PathBuf>,
    },

    /// Print HMAC auth headers for a request.
    Sign {
        /// HTTP method, e.g. GET.
        method: String,

        /// Request path, e.g. /health.
        path: String,

        /// Extension whose secret to use.
        #[arg(long, default_value = "worldviewer")]
        extension: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            port,
            host,
            config_dir,
        } => serve(port, &host, config_dir),
        Command::Sign {
            method,
            path,
            extension,
        } => sign(&method, &path, &extension),
    }
}

fn serve(port: u16, host: &str, config_dir: Option<PathBuf>) -> Result<()> {
    if let Some(env_file) = agentworld_config::load_dotenv() {
        info!(path = %env_file.display(), "Loaded project .env");
    }

    let config_dir = config_dir.unwrap_or_else(|| PathBuf::from("."));
    let http_config =
        agentworld_config::HttpConfig::load_from(&config_dir.join("agent-world-http.json"));
    let versions =
        agentworld_config::VersionConfig::load_from(&config_dir.join("agent-world-versions.json"));

    let identity = ExtensionIdentity {
        name: "worldviewer".into(),
        version: versions.version("worldviewer"),
        api_version: versions.api_version("worldviewer"),
        service_name: versions.service_name("worldviewer"),
        port,
    };

    let extension = WorldViewerExtension::new(identity);
    let mut ticker = extension.start_ticker(TICK_INTERVAL);
    let routes = extension.routes();

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let result = runtime.block_on(async {
        let server = agentworld_server::serve(extension.clone(), routes, http_config, host);
        tokio::select! {
            result = server => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    });

    extension.shutdown();
    ticker.stop();
    result.context("server error")
}

fn sign(method: &str, path: &str, extension: &str) -> Result<()> {
    let secrets = agentworld_security::SecretConfig::from_env(extension);
    let Some(secret) = secrets.hmac_secret else {
        bail!(
            "No HMAC secret configured - set AGENT_{}_HMAC_SECRET or AGENT_EXT_HMAC_SECRET",
            extension.to_uppercase()
        );
    };
    let (timestamp, signature) = agentworld_security::sign_request(
        &secret,
        &method.to_uppercase(),
        path,
    );
    println!("X-Timestamp: {timestamp}");
    println!("X-Signature: {signature}");
    Ok(())
}
