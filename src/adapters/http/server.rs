//! Homework tracker HTTP server.
//!
//! Serves the JSON API and, when a static directory is configured, the
//! HTML front-end pages.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::adapters::cache::ResponseCache;
use crate::adapters::json_store::JsonStore;
use crate::domain::models::ServerConfig;
use crate::domain::ports::RepoHost;
use crate::services::{Reconciler, RosterService, ViewService};

use super::handlers;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable CORS.
    pub enable_cors: bool,
    /// Directory with `homework.html`, `settings.html`, `leaderboard.html`
    /// and static assets.
    pub static_dir: Option<PathBuf>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for HttpServerConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            enable_cors: config.enable_cors,
            static_dir: config.static_dir.as_ref().map(PathBuf::from),
        }
    }
}

/// Shared state for request handlers.
pub struct AppState {
    pub roster: RosterService,
    pub views: ViewService,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Wire the services over one store, host and cache.
    pub fn new(store: Arc<JsonStore>, host: Arc<dyn RepoHost>, cache: ResponseCache) -> Self {
        Self {
            roster: RosterService::new(store.clone(), cache.clone()),
            views: ViewService::new(store.clone(), host.clone(), cache),
            reconciler: Arc::new(Reconciler::new(store, host)),
        }
    }
}

/// Homework tracker HTTP server.
pub struct HttpServer {
    config: HttpServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(state: Arc<AppState>, config: HttpServerConfig) -> Self {
        Self { config, state }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let api = Router::new()
            // Views
            .route("/api/list", get(handlers::list_students))
            .route("/api/leaderboard", get(handlers::leaderboard))
            .route("/api/export/csv", get(handlers::export_csv))
            // Reconciliation
            .route("/api/check", post(handlers::check_now))
            .route("/api/mark_viewed", post(handlers::mark_viewed))
            .route("/view/{*name}", get(handlers::view_repo))
            // Settings
            .route(
                "/api/settings",
                get(handlers::get_settings).post(handlers::save_settings),
            )
            // Roster
            .route("/api/students/import", post(handlers::import_students))
            .route("/api/students/add", post(handlers::add_student))
            .route("/api/students/update", post(handlers::update_student))
            .route("/api/students/delete", post(handlers::delete_student))
            .route("/api/students/score", post(handlers::set_score))
            .route("/api/students/{name}/details", get(handlers::student_details))
            .route(
                "/api/students/{name}/remarks",
                get(handlers::get_remarks).post(handlers::save_remarks),
            )
            // Health check
            .route("/health", get(handlers::health_check))
            .with_state(self.state.clone());

        let app = match &self.config.static_dir {
            Some(dir) => api
                .route_service("/", ServeFile::new(dir.join("homework.html")))
                .route_service("/settings", ServeFile::new(dir.join("settings.html")))
                .route_service("/leaderboard", ServeFile::new(dir.join("leaderboard.html")))
                .nest_service("/static", ServeDir::new(dir)),
            None => api,
        };

        if self.config.enable_cors {
            app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http())
        } else {
            app.layer(TraceLayer::new_for_http())
        }
    }

    fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.config.host, self.config.port).parse()
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.addr()?;
        let router = self.router();

        tracing::info!("Homework tracker listening on http://{}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
