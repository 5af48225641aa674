use crate::domain::{config::ProbeConfig, error::{ProbeError, ProbeResult}};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR: &str = "rancher-probe";
const PROJECT_DIR: &str = ".rancher-probe";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> ProbeResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Load configuration from files.
    ///
    /// A project file replaces the global one entirely; with neither the
    /// defaults are returned.
    pub fn load_config(&self) -> ProbeResult<ProbeConfig> {
        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                debug!("Using project configuration {}", project_path.display());
                return self.load_config_from_path(project_path);
            }
        }

        if self.global_config_path.exists() {
            debug!("Using global configuration {}", self.global_config_path.display());
            return self.load_config_from_path(&self.global_config_path);
        }

        Ok(ProbeConfig::default())
    }

    /// Get global configuration path
    fn get_global_config_path() -> ProbeResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ProbeError::config("Could not determine home directory"))?;

        Ok(home.join(".config").join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(PROJECT_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> ProbeResult<ProbeConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ProbeError::config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &ProbeConfig) -> ProbeResult<()> {
        let content = toml::to_string_pretty(config)
            .map_err(|e| ProbeError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProbeError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            ProbeError::config(format!("Failed to write config file {}: {}", path.display(), e))
        })
    }

    /// Write a starter configuration, refusing to overwrite an existing file
    pub fn init_config(&self, path: &Path) -> ProbeResult<()> {
        if path.exists() {
            return Err(ProbeError::config(format!(
                "Configuration already exists at {}",
                path.display()
            )));
        }

        let mut config = ProbeConfig::default();
        config.server.url = "https://rancher.example.internal".to_string();
        self.save_config_to_path(path, &config)
    }

    /// Project configuration file location under `dir`
    pub fn project_config_file(dir: &Path) -> PathBuf {
        dir.join(PROJECT_DIR).join(CONFIG_FILE)
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}
