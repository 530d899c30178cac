mod cli;

use vidshelf::{
    config,
    scanner::{FfprobeProbe, Reconciler, ScanOptions, ThumbnailStore},
    server,
    state::ScanTracker,
};
use vidshelf_db::{
    pool::{get_conn, init_pool, DbPool},
    queries::settings,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Open the database under the configured data directory, creating it if
/// needed.
fn open_database(config: &config::Config) -> Result<DbPool> {
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    let db_path = config.database_path();
    let db_path_str = db_path.to_string_lossy();
    tracing::info!("Initializing database at {}", db_path_str);
    Ok(init_pool(&db_path_str)?)
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting vidshelf server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let db_pool = open_database(&config)?;
    server::start_server(config, db_pool).await
}

async fn scan_once(root: Option<PathBuf>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let db_pool = open_database(&config)?;
    server::seed_settings(&config, &db_pool)?;

    let root = match root {
        Some(root) => Some(root),
        None => {
            let conn = get_conn(&db_pool)?;
            settings::load_library_settings(&conn)?.root_directory
        }
    };

    let reconciler = Reconciler::new(
        db_pool,
        Arc::new(FfprobeProbe::new(config.tools.ffprobe())),
        ThumbnailStore::new(config.thumbnail_dir()),
        ScanOptions::new(config.scan.batch_size, config.scan.workers),
    );

    let tracker = ScanTracker::new();
    let summary = reconciler.run(root.as_deref(), &tracker).await;
    let progress = tracker.snapshot();

    println!("{}", progress.status);
    println!("  Found:      {}", summary.files_found);
    println!("  Added:      {}", summary.added);
    println!("  Updated:    {}", summary.updated);
    println!("  Unchanged:  {}", summary.skipped);
    println!("  Removed:    {}", summary.pruned);
    println!("  Failed:     {}", summary.failed);
    if summary.probe_failures > 0 {
        println!("  Unknown duration: {}", summary.probe_failures);
    }
    if summary.thumbnails_removed > 0 {
        println!(
            "  Orphaned thumbnails removed: {} ({} bytes)",
            summary.thumbnails_removed, summary.thumbnail_bytes_removed
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidshelf=trace,vidshelf_db=debug,vidshelf_av=debug,tower_http=debug".to_string()
        } else {
            "vidshelf=info,vidshelf_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Scan { root } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(scan_once(root, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => probe_file(&file, json, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidshelf {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let media_info = vidshelf_av::Ffprobe::new(config.tools.ffprobe()).probe(file)?;

    if json {
        let json_str = serde_json::to_string_pretty(&media_info)?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("File: {}", media_info.file_path.display());
    println!("Container: {}", media_info.container);
    println!("Size: {} bytes", media_info.file_size);
    match media_info.duration_secs() {
        Some(secs) => {
            let secs = secs.round() as u64;
            let mins = secs / 60;
            let hours = mins / 60;
            println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
        }
        None => println!("Duration: unknown"),
    }

    println!("\nVideo Tracks: {}", media_info.video_tracks.len());
    for (i, track) in media_info.video_tracks.iter().enumerate() {
        print!("  [{}] {} {}x{}", i, track.codec, track.width, track.height);
        if let Some(fps) = track.frame_rate {
            print!(", {:.3} fps", fps);
        }
        println!();
    }

    println!("\nAudio Tracks: {}", media_info.audio_tracks.len());
    for (i, track) in media_info.audio_tracks.iter().enumerate() {
        print!("  [{}] {} {}ch", i, track.codec, track.channels);
        if let Some(ref lang) = track.language {
            print!(" ({})", lang);
        }
        println!();
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = vidshelf_av::check_tools(&config.tools.ffprobe(), &config.tools.ffmpeg());
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Scans record unknown durations without ffprobe, and thumbnails need ffmpeg.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Database: {}", config.database_path().display());
            println!("  Thumbnails: {}", config.thumbnail_dir().display());
            match &config.library.root_dir {
                Some(root) => println!("  Root directory: {}", root.display()),
                None => println!("  Root directory: (from settings)"),
            }
            println!(
                "  Scan: batch size {}, {} workers",
                config.scan.batch_size, config.scan.workers
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
