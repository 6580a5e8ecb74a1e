// Infrastructure module - External dependencies and adapters
pub mod config;
pub mod dns;
pub mod logging;
pub mod script;

use crate::core::backend::EnumBackend;
use crate::domain::config::{BackendConfig, EnumConfig};
use crate::domain::error::EnumResult;
use std::time::Duration;

/// Build the lookup backend selected by the configuration
pub fn create_backend(config: &EnumConfig) -> EnumResult<Box<dyn EnumBackend>> {
    match &config.backend {
        BackendConfig::Dns { nameservers, port, attempts, use_tcp } => {
            let settings = dns::DnsSettings::new(
                nameservers,
                *port,
                *attempts,
                *use_tcp,
                Duration::from_millis(config.global.timeout_ms),
            )?;
            Ok(Box::new(dns::DnsBackend::new(&settings)))
        }
        BackendConfig::Script { script_path, module_dir, interpreter, interpreter_args } => {
            let backend = script::ScriptBackend::new(script::ScriptOptions {
                script_path: Some(script_path.clone()),
                module_dir: module_dir.clone(),
                interpreter: interpreter.clone(),
                interpreter_args: interpreter_args.clone(),
            })?;
            Ok(Box::new(backend))
        }
    }
}
