//! writer-bridge - socket command server for LibreOffice Writer documents

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use writer_bridge::{logging, Backend, Bridge, BridgeConfig};
use writer_office::{LibreOffice, MemoryOffice};

#[derive(Parser)]
#[command(name = "writer-bridge")]
#[command(author, version, about = "Edit Writer documents over a local JSON socket")]
struct Cli {
    /// TOML configuration file (default: ~/.config/writer-bridge/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Folder that relative document paths are resolved against
    #[arg(short, long)]
    document_root: Option<String>,

    /// Document engine
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    /// Per-command timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// LibreOffice URP port
    #[arg(long)]
    office_port: Option<u16>,

    /// Never start soffice; only connect to a running one
    #[arg(long)]
    no_launch: bool,

    /// Log filter when RUST_LOG is unset (e.g. "debug", "writer_office=trace")
    #[arg(long)]
    log_level: Option<String>,
}

fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("writer-bridge").join("config.toml");
    path.is_file().then_some(path)
}

fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = match cli.config.clone().or_else(default_config_path) {
        Some(path) => BridgeConfig::load(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => BridgeConfig::default(),
    };

    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(root) = &cli.document_root {
        config.document_root = root.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(timeout) = cli.timeout {
        config.command_timeout_secs = timeout;
    }
    if let Some(port) = cli.office_port {
        config.office.port = port;
    }
    if cli.no_launch {
        config.office.launch = false;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init(&config.log_level);

    let bridge = match config.backend {
        Backend::Libreoffice => {
            Bridge::start(LibreOffice::new(config.office.clone()), &config).await
        }
        Backend::Memory => Bridge::start(MemoryOffice::new(), &config).await,
    }
    .with_context(|| format!("failed to listen on {}", config.listen))?;

    tracing::info!(
        addr = %bridge.local_addr().context("listener has no address")?,
        backend = ?config.backend,
        document_root = %config.document_root,
        "writer-bridge ready"
    );
    bridge.run_until(shutdown_signal()).await;
    Ok(())
}
