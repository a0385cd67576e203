mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory the config file lives in: `<platform config dir>/automail/`
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("automail");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load the configuration, never failing startup over it.
///
/// On first run the default config is written out so there is a file to
/// edit. A file that cannot be read, parsed, or validated is reported and
/// replaced by defaults for this run; a broken config should cost a warning,
/// not the telemetry loop.
pub fn load_config() -> AppConfig {
    match config_path() {
        Ok(path) => load_from(&path),
        Err(e) => {
            warn!(error = %e, "No usable config location, using defaults");
            AppConfig::default()
        }
    }
}

fn load_from(path: &Path) -> AppConfig {
    if !path.exists() {
        let config = AppConfig::default();
        info!(?path, "No config found, writing defaults");
        if let Err(e) = save_to(path, &config) {
            warn!(error = %e, "Could not write default config");
        }
        return config;
    }

    let parsed = std::fs::read_to_string(path)
        .context("reading config file")
        .and_then(|contents| toml::from_str::<AppConfig>(&contents).context("parsing config file"));

    match parsed {
        Ok(config) => match config.validate() {
            Ok(()) => {
                info!(?path, "Loaded config");
                config
            }
            Err(reason) => {
                warn!(?path, reason, "Config failed validation, using defaults");
                AppConfig::default()
            }
        },
        Err(e) => {
            warn!(?path, error = %e, "Could not load config, using defaults");
            AppConfig::default()
        }
    }
}

fn save_to(path: &Path, config: &AppConfig) -> Result<()> {
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Per-test scratch path under the OS temp dir; removed on drop.
    struct ScratchFile(PathBuf);

    impl ScratchFile {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "automail-config-{}-{}.toml",
                std::process::id(),
                name
            ));
            let _ = std::fs::remove_file(&path);
            Self(path)
        }
    }

    impl Drop for ScratchFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn first_run_writes_defaults_to_disk() {
        let scratch = ScratchFile::new("first-run");
        let config = load_from(&scratch.0);
        assert_eq!(config.transport.baud_rate, 115_200);
        // The file now exists and loads back to the same settings.
        let reloaded = load_from(&scratch.0);
        assert_eq!(reloaded.window_seconds, config.window_seconds);
        assert_eq!(reloaded.transport.udp_port, config.transport.udp_port);
    }

    #[test]
    fn saved_config_round_trips() {
        let scratch = ScratchFile::new("round-trip");
        let mut config = AppConfig::default();
        config.transport.mode = TransportMode::Net;
        config.transport.udp_port = 6001;
        config.window_seconds = 0.5;
        save_to(&scratch.0, &config).unwrap();
        let back = load_from(&scratch.0);
        assert_eq!(back.transport.mode, TransportMode::Net);
        assert_eq!(back.transport.udp_port, 6001);
        assert_eq!(back.window_seconds, 0.5);
    }

    #[test]
    fn unparseable_file_falls_back_to_defaults() {
        let scratch = ScratchFile::new("garbage");
        std::fs::write(&scratch.0, "not = [valid").unwrap();
        let config = load_from(&scratch.0);
        assert_eq!(config.transport.baud_rate, 115_200);
        assert_eq!(config.window_seconds, 1.0);
    }

    #[test]
    fn invalid_settings_fall_back_to_defaults() {
        let scratch = ScratchFile::new("invalid");
        let mut config = AppConfig::default();
        config.window_seconds = -2.0;
        save_to(&scratch.0, &config).unwrap();
        let loaded = load_from(&scratch.0);
        assert_eq!(loaded.window_seconds, 1.0);
    }
}
