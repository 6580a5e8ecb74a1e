use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// enumlookup configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Lookup defaults
    #[serde(default)]
    pub lookup: LookupConfig,
    /// Lookup backend
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-domain lookup timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// Lookup defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Domains queried when none are given on the command line
    #[serde(default = "default_domains")]
    pub default_domains: Vec<String>,
    /// Enumservice types reported as found (empty means every service)
    #[serde(default)]
    pub services: Vec<String>,
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    #[serde(rename = "dns")]
    Dns {
        /// Nameserver addresses; empty uses the system configuration
        #[serde(default)]
        nameservers: Vec<String>,
        #[serde(default = "default_dns_port")]
        port: u16,
        #[serde(default = "default_attempts")]
        attempts: usize,
        #[serde(default)]
        use_tcp: bool,
    },
    #[serde(rename = "script")]
    Script {
        script_path: PathBuf,
        #[serde(default)]
        module_dir: Option<PathBuf>,
        #[serde(default)]
        interpreter: Option<String>,
        #[serde(default)]
        interpreter_args: Vec<String>,
    },
}

impl BackendConfig {
    /// Short backend name used in logs and output
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Dns { .. } => "dns",
            BackendConfig::Script { .. } => "script",
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    5000
}

fn default_domains() -> Vec<String> {
    vec![".e164.arpa".to_string()]
}

fn default_dns_port() -> u16 {
    53
}

fn default_attempts() -> usize {
    2
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            timeout_ms: default_timeout(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            default_domains: default_domains(),
            services: Vec::new(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Dns {
            nameservers: Vec::new(),
            port: default_dns_port(),
            attempts: default_attempts(),
            use_tcp: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = EnumConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: EnumConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.lookup.default_domains, vec![".e164.arpa"]);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: EnumConfig = toml::from_str("").unwrap();
        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.global.timeout_ms, 5000);
        assert_eq!(config.backend.kind(), "dns");
        assert!(config.lookup.services.is_empty());
    }

    #[test]
    fn test_script_backend() {
        let toml_str = r#"
            [lookup]
            default_domains = ["e164.arpa", "nrenum.net"]

            [backend]
            type = "script"
            script_path = "/opt/enum/enum_query.pl"
            module_dir = "/opt/enum"
            interpreter = "perl"
            interpreter_args = ["-w"]
        "#;

        let config: EnumConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.lookup.default_domains.len(), 2);
        match config.backend {
            BackendConfig::Script { script_path, module_dir, interpreter, interpreter_args } => {
                assert_eq!(script_path, PathBuf::from("/opt/enum/enum_query.pl"));
                assert_eq!(module_dir, Some(PathBuf::from("/opt/enum")));
                assert_eq!(interpreter.as_deref(), Some("perl"));
                assert_eq!(interpreter_args, vec!["-w"]);
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_dns_backend_defaults() {
        let config: EnumConfig = toml::from_str(
            "[backend]\ntype = \"dns\"\nnameservers = [\"192.0.2.53\"]\n",
        )
        .unwrap();
        match config.backend {
            BackendConfig::Dns { nameservers, port, attempts, use_tcp } => {
                assert_eq!(nameservers, vec!["192.0.2.53"]);
                assert_eq!(port, 53);
                assert_eq!(attempts, 2);
                assert!(!use_tcp);
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }
}
