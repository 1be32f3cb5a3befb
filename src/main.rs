//! Waypost server binary.
//!
//! Serves a directory of Rhai handler scripts as an HTTP site: routes
//! come from a TOML route list or from constants in the scripts, pages
//! render through Handlebars templates in the static root.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use waypost::observability;
use waypost::render::HandlebarsRenderer;
use waypost::{App, Mode, RouteOptions, ServerOptions};

/// Script-routed web server.
#[derive(Debug, Parser)]
#[command(name = "waypost", version, about)]
struct Cli {
    /// Route list (TOML); its directory becomes the discovery base
    #[arg(long)]
    conf: Option<PathBuf>,

    /// Handler discovery base directory
    #[arg(long)]
    include: Option<PathBuf>,

    /// Static asset root (default: <include>/public)
    #[arg(long)]
    static_root: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Prometheus exporter address (exporter disabled when unset)
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Force production behavior regardless of WAYPOST_ENV
    #[arg(long)]
    prod: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_logging();

    let cli = Cli::parse();

    tracing::info!("waypost v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = cli.metrics_addr {
        observability::metrics::init_metrics(addr);
    }

    let mode = if cli.prod {
        Mode::Production
    } else {
        Mode::from_env()
    };

    let routes = RouteOptions {
        conf: cli.conf,
        include: cli.include,
        static_root: cli.static_root,
        ..Default::default()
    };

    // Resolve once up front so the default renderer shares the same
    // static root the fallback serves from.
    let resolved = waypost::config::resolve_routes(&routes)?;
    let renderer = HandlebarsRenderer::new(resolved.static_root.clone(), mode);

    let app = App::build(ServerOptions {
        is_prod: Some(mode.is_prod()),
        routes,
        render: Some(Arc::new(renderer)),
    })?;

    tracing::info!(
        routes = app.route_count(),
        handlers = app.handlers().len(),
        orphans = app.handlers().orphans().count(),
        "Site assembled"
    );

    app.listen(cli.listen.as_str()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
