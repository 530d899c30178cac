//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates a temporary data directory with a
//! file-backed database, a library root, a stub metadata probe, and a full
//! [`AppContext`]. [`TestHarness::with_server`] starts Axum on a random port
//! for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use vidshelf::config::Config;
use vidshelf::scanner::MetadataProbe;
use vidshelf::server::{create_router, seed_settings, AppContext};
use vidshelf::state::ScanProgress;
use vidshelf_common::{Error, VideoId};
use vidshelf_db::models::Video;
use vidshelf_db::pool::{get_conn, init_pool, DbPool, PooledConnection};
use vidshelf_db::queries::videos;

/// Duration every probeable file reports.
pub const STUB_DURATION: f64 = 120.0;

/// Probe that never shells out. Files whose name contains `corrupt` fail.
pub struct StubProbe;

impl MetadataProbe for StubProbe {
    fn duration(&self, path: &Path) -> vidshelf_common::Result<f64> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.contains("corrupt") {
            Err(Error::probe_failed(format!("cannot parse {}", name)))
        } else {
            Ok(STUB_DURATION)
        }
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// temporary database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub root: PathBuf,
    pub thumbnails: PathBuf,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration. Data and library
    /// directories always live in a fresh temporary directory.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = dir.path().join("library");
        std::fs::create_dir_all(&root).expect("failed to create library root");

        config.server.data_dir = Some(dir.path().join("data"));
        config.library.root_dir = Some(root.clone());
        config.streaming.retry_delay_ms = 10;
        std::fs::create_dir_all(config.data_dir()).expect("failed to create data dir");

        let db_path = config.database_path();
        let db = init_pool(&db_path.to_string_lossy()).expect("failed to create pool");
        seed_settings(&config, &db).expect("failed to seed settings");

        let thumbnails = config.thumbnail_dir();
        let ctx = AppContext::with_probe(config, db.clone(), Arc::new(StubProbe));

        Self {
            ctx,
            db,
            root,
            thumbnails,
            _dir: dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = create_router(harness.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> PooledConnection {
        get_conn(&self.db).expect("failed to get db connection")
    }

    /// Write a file under the library root, creating parent directories.
    pub fn write_file(&self, relative: &str, data: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, data).unwrap();
        path
    }

    /// Write a file and catalog it directly, bypassing the reconciler.
    pub fn add_video(&self, relative: &str, data: &[u8], duration: f64) -> Video {
        self.write_file(relative, data);
        let filename = relative.rsplit('/').next().unwrap();
        videos::create_video(
            &self.conn(),
            filename,
            relative,
            data.len() as f64 / 1_048_576.0,
            duration,
        )
        .unwrap()
    }

    pub fn video(&self, id: VideoId) -> Option<Video> {
        videos::get_video(&self.conn(), id).unwrap()
    }

    pub fn all_videos(&self) -> Vec<Video> {
        videos::list_all_videos(&self.conn()).unwrap()
    }

    /// Poll the progress route until the current scan completes.
    pub async fn wait_for_scan(addr: SocketAddr) -> ScanProgress {
        let client = reqwest::Client::new();
        for _ in 0..500 {
            let progress: ScanProgress = client
                .get(format!("http://{addr}/api/videos/scan/progress"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if progress.completed {
                return progress;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("scan did not complete");
    }

    /// Start a scan over HTTP and wait for it to finish.
    pub async fn scan(addr: SocketAddr) -> ScanProgress {
        let resp = reqwest::get(format!("http://{addr}/api/videos/scan"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        Self::wait_for_scan(addr).await
    }
}
