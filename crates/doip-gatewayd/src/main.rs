//! `doip-gatewayd` — runs a configurable DoIP gateway server.
//!
//! ```bash
//! doip-gatewayd --gateway-config config/gateway.yaml
//! ```

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doip-gatewayd")]
#[command(author, version, about = "DoIP (ISO 13400-2) gateway server")]
struct Args {
    /// Path to the root gateway document.
    #[arg(long, env = "DOIP_GATEWAY_CONFIG")]
    gateway_config: String,

    /// Override the configured bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured maximum connection count.
    #[arg(long)]
    max_connections: Option<usize>,

    /// Enable debug logging for the gateway crates.
    #[arg(short, long)]
    verbose: bool,
}

const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_BIND_ERROR: u8 = 2;
const EXIT_INTERNAL_ERROR: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "doip_gatewayd=debug,doip_gateway=debug,doip_config=debug,doip_runtime=debug,doip_core=debug"
    } else {
        "doip_gatewayd=info,doip_gateway=info,doip_config=info,doip_runtime=info,doip_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let gateway = match doip_config::load_gateway(&args.gateway_config) {
        Ok(gateway) => apply_overrides(gateway, &args),
        Err(e) => {
            error!(error = %e, "failed to load gateway configuration");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!(name = gateway.name.as_str(), ecus = gateway.ecus.len(), "configuration loaded");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    match doip_gateway::run(gateway, shutdown).await {
        Ok(()) => ExitCode::from(0),
        Err(e) if is_bind_error(&e) => {
            error!(error = %e, "failed to bind listening sockets");
            ExitCode::from(EXIT_BIND_ERROR)
        }
        Err(e) => {
            error!(error = %e, "gateway exited with an error");
            ExitCode::from(EXIT_INTERNAL_ERROR)
        }
    }
}

fn apply_overrides(mut gateway: doip_config::Gateway, args: &Args) -> doip_config::Gateway {
    if let Some(host) = &args.host {
        gateway.host = host.clone();
    }
    if let Some(port) = args.port {
        gateway.port = port;
    }
    if let Some(max_connections) = args.max_connections {
        gateway.max_connections = max_connections;
    }
    gateway
}

fn is_bind_error(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::AddrInUse | std::io::ErrorKind::AddrNotAvailable | std::io::ErrorKind::PermissionDenied
    )
}
