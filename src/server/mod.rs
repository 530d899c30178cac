use crate::config::Config;
use crate::scanner::{FfprobeProbe, MetadataProbe, Reconciler, ScanOptions, ThumbnailStore};
use crate::state::ScanTracker;
use crate::streaming::StreamOptions;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use vidshelf_av::FrameGrab;
use vidshelf_common::SettingKey;
use vidshelf_db::{
    models::LibrarySettings,
    pool::{get_conn, DbPool, PooledConnection},
    queries::settings,
};

mod error;
pub mod routes_scan;
pub mod routes_settings;
pub mod routes_videos;

pub use error::ApiError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Database connection pool
    pub db: DbPool,
    pub reconciler: Reconciler,
    /// Tracker of the latest reconciliation run, if any
    pub current_scan: Arc<RwLock<Option<ScanTracker>>>,
    pub streaming: StreamOptions,
    pub frame_grab: FrameGrab,
}

impl AppContext {
    /// Build a context probing with ffprobe.
    pub fn new(config: Config, db: DbPool) -> Self {
        let probe = Arc::new(FfprobeProbe::new(config.tools.ffprobe()));
        Self::with_probe(config, db, probe)
    }

    /// Build a context with a custom metadata probe.
    pub fn with_probe(config: Config, db: DbPool, probe: Arc<dyn MetadataProbe>) -> Self {
        let reconciler = Reconciler::new(
            db.clone(),
            probe,
            ThumbnailStore::new(config.thumbnail_dir()),
            ScanOptions::new(config.scan.batch_size, config.scan.workers),
        );
        let frame_grab = FrameGrab {
            ffmpeg: config.tools.ffmpeg(),
            ..FrameGrab::default()
        };

        Self {
            streaming: StreamOptions::from(&config.streaming),
            config: Arc::new(config),
            db,
            reconciler,
            current_scan: Arc::new(RwLock::new(None)),
            frame_grab,
        }
    }

    /// Get a pooled database connection.
    pub fn conn(&self) -> std::result::Result<PooledConnection, ApiError> {
        Ok(get_conn(&self.db)?)
    }

    pub fn thumbnails(&self) -> &ThumbnailStore {
        self.reconciler.thumbnails()
    }

    pub fn library_settings(&self) -> std::result::Result<LibrarySettings, ApiError> {
        let conn = self.conn()?;
        Ok(settings::load_library_settings(&conn)?)
    }

    /// Start a reconciliation run unless one is in progress. Returns the
    /// tracker of the active run and whether it was started by this call.
    pub fn start_scan(&self, root: Option<PathBuf>) -> (ScanTracker, bool) {
        let mut current = self.current_scan.write();
        if let Some(tracker) = current.as_ref() {
            if !tracker.is_completed() {
                return (tracker.clone(), false);
            }
        }

        let handle = self.reconciler.spawn(root);
        let tracker = handle.progress();
        *current = Some(tracker.clone());
        (tracker, true)
    }

    /// Progress of the latest run.
    pub fn scan_tracker(&self) -> Option<ScanTracker> {
        self.current_scan.read().clone()
    }
}

/// Write configured library defaults into the settings table where it has
/// no value yet.
pub fn seed_settings(config: &Config, db: &DbPool) -> Result<()> {
    let conn = get_conn(db)?;

    if let Some(root) = &config.library.root_dir {
        if settings::get_setting(&conn, SettingKey::RootDirectory)?.is_none() {
            settings::set_setting(&conn, SettingKey::RootDirectory, &root.to_string_lossy())?;
            tracing::info!(root = %root.display(), "Seeded root directory from config");
        }
    }

    if settings::get_setting(&conn, SettingKey::ShortVideoDuration)?.is_none() {
        settings::set_setting(
            &conn,
            SettingKey::ShortVideoDuration,
            &config.library.short_video_minutes.to_string(),
        )?;
    }

    Ok(())
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    let mut app = Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Serve static files if directory is provided
    // Uses SPA fallback: serves index.html for any route that doesn't match a file
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}

fn api_routes() -> Router<AppContext> {
    routes_scan::scan_routes()
        .merge(routes_videos::video_routes())
        .merge(routes_settings::settings_routes())
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config, db: DbPool) -> Result<()> {
    start_server_with_options(config, db, None).await
}

/// Start the HTTP server with an optional custom metadata probe
pub async fn start_server_with_options(
    config: Config,
    db: DbPool,
    probe: Option<Arc<dyn MetadataProbe>>,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    seed_settings(&config, &db)?;

    let static_dir = config.server.static_dir.clone();
    let ctx = match probe {
        Some(probe) => AppContext::with_probe(config, db, probe),
        None => AppContext::new(config, db),
    };

    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
