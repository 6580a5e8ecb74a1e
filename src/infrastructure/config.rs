use crate::domain::{
    config::{BackendConfig, EnumConfig, LookupConfig},
    error::{EnumError, EnumResult},
};
use std::fs;
use std::path::{Path, PathBuf};
use toml::Table;

const CONFIG_DIR: &str = ".enumlookup";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> EnumResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Create a configuration manager over explicit paths
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files.
    ///
    /// The project file is layered over the global one key by key, so a
    /// project may override a single setting.
    pub fn load_config(&self) -> EnumResult<EnumConfig> {
        let mut merged = Table::new();

        if self.global_config_path.exists() {
            merged = self.read_table(&self.global_config_path)?;
        }

        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                let project = self.read_table(project_path)?;
                merge_tables(&mut merged, project);
            }
        }

        toml::Value::Table(merged).try_into().map_err(|e| EnumError::Config {
            message: format!("Invalid configuration: {}", e),
        })
    }

    /// Save configuration to the global file
    pub fn save_config(&self, config: &EnumConfig) -> EnumResult<()> {
        if let Some(parent) = self.global_config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| EnumError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        self.save_config_to_path(&self.global_config_path, config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> EnumResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| EnumError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("enumlookup").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    fn read_table(&self, path: &Path) -> EnumResult<Table> {
        let content = fs::read_to_string(path).map_err(|e| EnumError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        content.parse::<Table>().map_err(|e| EnumError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> EnumResult<EnumConfig> {
        let content = fs::read_to_string(path).map_err(|e| EnumError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| EnumError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &EnumConfig) -> EnumResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| EnumError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| EnumError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration under `path`
    pub fn init_project_config(&self, path: &Path) -> EnumResult<PathBuf> {
        let config_dir = path.join(CONFIG_DIR);
        let config_file = config_dir.join(CONFIG_FILE);

        if config_file.exists() {
            return Err(EnumError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| EnumError::Config {
            message: format!("Failed to create {} directory: {}", CONFIG_DIR, e),
        })?;

        let default_config = EnumConfig {
            lookup: LookupConfig {
                default_domains: vec![
                    ".e164.arpa".to_string(),
                    ".e164.org".to_string(),
                    ".nrenum.net".to_string(),
                ],
                services: Vec::new(),
            },
            backend: BackendConfig::default(),
            ..EnumConfig::default()
        };

        self.save_config_to_path(&config_file, &default_config)?;

        Ok(config_file)
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

/// Recursively merge `overlay` into `base`; overlay values win
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                // A different backend type replaces the section wholesale
                if existing.get("type") != incoming.get("type") && incoming.contains_key("type") {
                    *existing = incoming;
                } else {
                    merge_tables(existing, incoming);
                }
            }
            (Some(slot), value) => *slot = value,
            (None, value) => {
                base.insert(key, value);
            }
        }
    }
}
