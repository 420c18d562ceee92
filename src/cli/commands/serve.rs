//! `serve`: HTTP API plus the background poller.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tokio::sync::mpsc;

use crate::adapters::http::{AppState, HttpServer, HttpServerConfig};
use crate::cli::AppContext;
use crate::services::{PollDaemon, PollDaemonConfig, PollEvent, PollHandle};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory holding the HTML pages (overrides server.static_dir)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Do not start the background poller
    #[arg(long)]
    pub no_poll: bool,
}

pub async fn execute(args: ServeArgs, context: AppContext, json_mode: bool) -> Result<()> {
    let mut server_config = HttpServerConfig::from(&context.config.server);
    if let Some(host) = args.host {
        server_config.host = host;
    }
    if let Some(port) = args.port {
        server_config.port = port;
    }
    if args.static_dir.is_some() {
        server_config.static_dir = args.static_dir;
    }

    let state = Arc::new(AppState::new(
        Arc::clone(&context.store),
        Arc::clone(&context.host),
        context.cache(),
    ));

    let poller = if context.config.poller.enabled && !args.no_poll {
        let daemon = PollDaemon::new(
            Arc::clone(&state.reconciler),
            Arc::clone(&context.store),
            PollDaemonConfig::from(&context.config.poller),
        );
        let handle = daemon.handle();
        let events = daemon.spawn();
        let reporter = tokio::spawn(report_events(events, json_mode));
        Some((handle, reporter))
    } else {
        tracing::info!("background poller disabled");
        None
    };

    if !json_mode {
        println!(
            "Homework tracker listening on http://{}:{}",
            server_config.host, server_config.port
        );
        println!("Press Ctrl+C to stop");
    }

    let server = HttpServer::new(state, server_config);
    let result = server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await;

    if let Some((handle, reporter)) = poller {
        stop_poller(&handle, reporter).await;
    }

    result.map_err(|e| anyhow::anyhow!("HTTP server failed: {e}"))
}

async fn stop_poller(handle: &PollHandle, reporter: tokio::task::JoinHandle<()>) {
    handle.stop();
    if let Err(e) = reporter.await {
        tracing::warn!(error = %e, "poll event reporter ended abnormally");
    }
    let status = handle.status().await;
    tracing::info!(
        total_runs = status.total_runs,
        failed_runs = status.failed_runs,
        "background poller stopped"
    );
}

async fn report_events(mut events: mpsc::Receiver<PollEvent>, json_mode: bool) {
    while let Some(event) = events.recv().await {
        match event {
            PollEvent::Started => {
                if !json_mode {
                    println!("Background poller started");
                }
            }
            PollEvent::PassCompleted {
                run_number,
                report,
                duration_ms,
            } => {
                if !json_mode && report.updated > 0 {
                    println!(
                        "Pass {run_number}: {} checked, {} updated ({duration_ms}ms)",
                        report.checked, report.updated
                    );
                }
            }
            PollEvent::PassFailed { run_number, error } => {
                if !json_mode {
                    println!("Pass {run_number} failed: {error}");
                }
            }
            PollEvent::Stopped => break,
        }
    }
}
