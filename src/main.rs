use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use anyhow::Context;
use axum::routing::get;
use clap::Parser;
use claw_history_viewer::{build_router, AppState, Args};
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let port = args.resolve_port()?;
    let host: IpAddr = args
        .host
        .trim()
        .parse()
        .context("invalid --host (expected an IP address)")?;
    let bind = SocketAddr::new(host, port);
    let paths = args.resolve_paths()?;

    let mut app = build_router(AppState::new(paths.clone()));

    let public_dir = PathBuf::from(&args.public_dir);
    let index_html = public_dir.join("index.html");
    if index_html.is_file() {
        let serve_dir = ServeDir::new(public_dir).not_found_service(ServeFile::new(index_html));
        app = app.fallback_service(serve_dir);
    } else {
        app = app.route(
            "/",
            get(|| async { "Web UI not found. Point --public-dir at the built viewer assets." }),
        );
    }

    info!("history viewer listening on http://{bind}");
    info!("openclaw dir: {}", paths.openclaw_dir.display());
    info!("agent: {}", paths.agent_name);
    info!("sessions: {}", paths.sessions_dir.display());

    axum::serve(tokio::net::TcpListener::bind(bind).await?, app).await?;
    Ok(())
}
