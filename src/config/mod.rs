mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Find the first existing config file among the default locations
pub fn find_config_file() -> Option<PathBuf> {
    let default_paths = [
        "./config.toml",
        "./vidshelf.toml",
        "~/.config/vidshelf/config.toml",
        "/etc/vidshelf/config.toml",
    ];

    default_paths
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    match find_config_file() {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.scan.batch_size == 0 {
        anyhow::bail!("Scan batch_size must be at least 1");
    }

    if config.scan.workers == 0 {
        anyhow::bail!("Scan workers must be at least 1");
    }

    let minutes = config.library.short_video_minutes;
    if minutes.is_nan() || minutes <= 0.0 {
        anyhow::bail!("Library short_video_minutes must be positive");
    }

    if config.streaming.inactivity_timeout_secs == 0 {
        anyhow::bail!("Streaming inactivity_timeout_secs cannot be 0");
    }

    if let Some(root) = &config.library.root_dir {
        if !root.exists() {
            tracing::warn!("Library root does not exist: {:?}", root);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.scan.batch_size, 10);
        assert_eq!(config.streaming.inactivity_timeout_secs, 60);
        assert_eq!(config.streaming.max_retries, 3);
        assert_eq!(config.library.short_video_minutes, 5.0);
        assert_eq!(config.tools.ffprobe(), PathBuf::from("ffprobe"));
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [library]
            root_dir = "/media/videos"

            [scan]
            workers = 2

            [tools]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.library.root_dir, Some(PathBuf::from("/media/videos")));
        assert_eq!(config.scan.workers, 2);
        assert_eq!(config.scan.batch_size, 10);
        assert_eq!(config.tools.ffmpeg(), PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scan.batch_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.library.short_video_minutes = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vidshelf.toml");
        std::fs::write(&path, "[streaming]\nmax_retries = 5\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.streaming.max_retries, 5);

        std::fs::write(&path, "[scan]\nbatch_size = \"ten\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
