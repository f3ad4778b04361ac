//! Loading of `config.toml` from the user's config directory.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::{sanitize_config, Config};

const CONFIG_DIR_NAME: &str = "camelot-renamer";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default location of the config file, if the platform has a config dir.
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Reads the config file, creating it with defaults when it does not exist.
///
/// An unparsable file is left untouched and defaults are used instead.
pub fn load_or_create_config(config_file: &Path) -> Result<Config, String> {
    if !config_file.exists() {
        if let Some(config_root) = config_file.parent() {
            std::fs::create_dir_all(config_root).map_err(|err| {
                format!(
                    "Failed to create config directory {}: {}",
                    config_root.display(),
                    err
                )
            })?;
        }
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        let default_text = toml::to_string(&Config::default())
            .map_err(|err| format!("Failed to serialize default config: {}", err))?;
        std::fs::write(config_file, default_text).map_err(|err| {
            format!(
                "Failed to write config file {}: {}",
                config_file.display(),
                err
            )
        })?;
    }

    let config_content = std::fs::read_to_string(config_file).map_err(|err| {
        format!(
            "Failed to read config file {}: {}",
            config_file.display(),
            err
        )
    })?;
    let config = match toml::from_str::<Config>(&config_content) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Invalid config file {}, using defaults: {}",
                config_file.display(),
                err
            );
            Config::default()
        }
    };
    Ok(sanitize_config(config))
}

#[cfg(test)]
mod tests {
    use super::load_or_create_config;
    use crate::config::{Config, SkipQuerySource};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_config_path(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir()
            .join(format!("camelot_renamer_{name}_{nonce}"))
            .join("config.toml")
    }

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let config_file = unique_config_path("create");

        let config = load_or_create_config(&config_file).expect("config should load");

        assert_eq!(config, Config::default());
        let written = std::fs::read_to_string(&config_file).expect("config should be written");
        assert!(written.contains("[search]"));
        if let Some(dir) = config_file.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_existing_config_is_read_and_sanitized() {
        let config_file = unique_config_path("existing");
        let dir = config_file.parent().expect("config path has a parent");
        std::fs::create_dir_all(dir).expect("config dir should be created");
        std::fs::write(
            &config_file,
            "[search]\ndebounce_ms = 1\n\n[queue]\nskip_query_source = \"live_query\"\n",
        )
        .expect("config should be written");

        let config = load_or_create_config(&config_file).expect("config should load");

        assert_eq!(config.search.debounce_ms, 50);
        assert_eq!(config.queue.skip_query_source, SkipQuerySource::LiveQuery);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults_without_overwriting() {
        let config_file = unique_config_path("invalid");
        let dir = config_file.parent().expect("config path has a parent");
        std::fs::create_dir_all(dir).expect("config dir should be created");
        std::fs::write(&config_file, "[search\nbroken").expect("config should be written");

        let config = load_or_create_config(&config_file).expect("config should load");

        assert_eq!(config, Config::default());
        assert_eq!(
            std::fs::read_to_string(&config_file).expect("config should remain"),
            "[search\nbroken"
        );
        let _ = std::fs::remove_dir_all(dir);
    }
}
