//! Server configuration: TOML file, environment overrides, CLI overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Resolved configuration the server runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory holding `store.json` and `classes.json`.
    pub data_dir: PathBuf,
    /// Development switch that disables the route-level role checks.
    /// The deployed security posture depends on this staying off.
    pub auth_bypass: bool,
    /// Username of the bootstrap admin created on first run.
    pub admin_username: String,
    /// Password of the bootstrap admin; set this in production.
    pub admin_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            data_dir: PathBuf::from("data"),
            auth_bypass: false,
            admin_username: "admin@scuola.it".to_string(),
            admin_password: "admin".to_string(),
        }
    }
}

/// Optional fields as they appear in `merenda.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    auth_bypass: Option<bool>,
    admin_username: Option<String>,
    admin_password: Option<String>,
}

impl Config {
    /// Defaults, then the TOML file (if present), then `MERENDA_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("merenda.toml"));
        if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let file: FileConfig = toml::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?;
            config.apply_file(file);
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(data_dir) = file.data_dir {
            self.data_dir = data_dir;
        }
        if let Some(auth_bypass) = file.auth_bypass {
            self.auth_bypass = auth_bypass;
        }
        if let Some(admin_username) = file.admin_username {
            self.admin_username = admin_username;
        }
        if let Some(admin_password) = file.admin_password {
            self.admin_password = admin_password;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(port) = env::var("MERENDA_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!("ignoring invalid MERENDA_PORT: {}", e),
            }
        }
        if let Ok(data_dir) = env::var("MERENDA_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(bypass) = env::var("MERENDA_AUTH_BYPASS") {
            self.auth_bypass = bypass == "1" || bypass.eq_ignore_ascii_case("true");
        }
        if let Ok(admin_username) = env::var("MERENDA_ADMIN_USERNAME") {
            self.admin_username = admin_username;
        }
        if let Ok(admin_password) = env::var("MERENDA_ADMIN_PASSWORD") {
            self.admin_password = admin_password;
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    pub fn classes_path(&self) -> PathBuf {
        self.data_dir.join("classes.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert!(!config.auth_bypass);
        assert_eq!(config.store_path(), PathBuf::from("data/store.json"));
    }

    #[test]
    fn test_file_overrides() {
        let file: FileConfig = toml::from_str(
            r#"
            port = 8080
            auth_bypass = true
            "#,
        )
        .unwrap();
        let mut config = Config::default();
        config.apply_file(file);
        assert_eq!(config.port, 8080);
        assert!(config.auth_bypass);
        // Untouched fields keep their defaults.
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        assert!(toml::from_str::<FileConfig>("prot = 8080").is_err());
    }
}
