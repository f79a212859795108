use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "pctx.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Registered project roots, scanned by `pctx scan` and `pctx tree`.
    #[serde(default)]
    pub projects: Vec<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

impl Config {
    /// Configuration with defaults and no registered projects.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig::default(),
            projects: Vec::new(),
        }
    }

    /// Project roots to scan: the registered list, or the given fallback
    /// when nothing is registered.
    pub fn project_roots(&self, fallback: &Path) -> Vec<PathBuf> {
        if self.projects.is_empty() {
            vec![fallback.to_path_buf()]
        } else {
            self.projects.clone()
        }
    }

    /// Register a project root. Returns `false` if it was already present.
    pub fn add_project(&mut self, root: PathBuf) -> bool {
        if self.projects.contains(&root) {
            return false;
        }
        self.projects.push(root);
        true
    }

    /// Unregister a project root. Returns `false` if it was not present.
    pub fn remove_project(&mut self, root: &Path) -> bool {
        let before = self.projects.len();
        self.projects.retain(|p| p != root);
        self.projects.len() != before
    }
}

/// Loads configuration from a TOML file. A missing file is not an error:
/// the minimal configuration is returned so every command works out of the
/// box.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::minimal()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read config file: {}", path.display()))
        }
    };

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(config)
}

/// Writes configuration back to its TOML file. Used by the `projects`
/// subcommands.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(())
}
