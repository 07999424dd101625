//! Config file discovery, loading, and saving.
//!
//! Resolution order:
//! 1. An explicit path (the CLI's `--config`)
//! 2. `$MYKO_CONFIG_DIR/myko.toml`
//! 3. `<platform config dir>/myko/myko.toml`
//!
//! A missing file is not an error: the defaults apply.

use std::path::{Path, PathBuf};

use crate::{ConfigError, MykoConfig, Result};

/// Config filename within the config directory.
pub const CONFIG_FILE: &str = "myko.toml";

/// Application name for platform directory resolution.
const APP_NAME: &str = "myko";

/// Environment variable to override the config directory.
pub const CONFIG_DIR_ENV: &str = "MYKO_CONFIG_DIR";

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The effective configuration.
    pub config: MykoConfig,
    /// Path that was checked, if any could be determined.
    pub path: Option<PathBuf>,
    /// Whether a file was found and read.
    pub loaded: bool,
    /// Warnings generated during loading (e.g., plaintext passwords).
    pub warnings: Vec<String>,
}

/// Discover and load the configuration.
///
/// `explicit` must exist when given. Otherwise the default location is
/// used if present. The result is validated.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => xdg_config_path(),
    };

    let (config, loaded) = match &path {
        Some(path) if explicit.is_some() || path.is_file() => (load_config_file(path)?, true),
        _ => (MykoConfig::default(), false),
    };

    config.validate()?;
    let warnings = config.warnings();

    Ok(LoadedConfig {
        config,
        path,
        loaded,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<MykoConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    MykoConfig::from_toml(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &MykoConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Default config file path.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(CONFIG_FILE))
}

/// Config directory for myko.
///
/// Checks `MYKO_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/myko` on Linux, `~/Library/Application Support/myko` on macOS).
pub fn xdg_config_dir() -> Option<PathBuf> {
    config_dir_from(std::env::var(CONFIG_DIR_ENV).ok())
}

fn config_dir_from(env_value: Option<String>) -> Option<PathBuf> {
    if let Some(dir) = env_value
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_dir_env_override() {
        let dir = config_dir_from(Some("/tmp/myko-test".to_string())).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/myko-test"));

        // Empty falls back to the platform default.
        if let Some(dir) = config_dir_from(Some(String::new())) {
            assert!(dir.ends_with("myko"));
        }
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[client]
base_url = "http://localhost:9000/v1"
max_connections = 4
"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.client.base_url, "http://localhost:9000/v1");
        assert_eq!(config.client.max_connections, 4);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/myko.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_explicit_path_is_validated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[retry]\nmax_attempts = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_explicit_path_with_warnings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[auth]\nusername = \"me\"\npassword = \"pw\"\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert!(loaded.loaded);
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.config.auth.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = MykoConfig::new();
        config.client.timeout_secs = 12;
        config.auth.username = Some("me@example.com".to_string());
        save_config(&config, &path).unwrap();

        assert!(path.is_file());
        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}
