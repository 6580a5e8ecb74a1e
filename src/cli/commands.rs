use crate::cli::args::{Args, BackendArg, Command, ConfigCommand, QueryArgs};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::number::{query_name, DomainSuffix, E164Number};
use crate::core::query::{EnumQuery, QueryOptions};
use crate::domain::config::{BackendConfig, EnumConfig};
use crate::domain::error::{EnumError, EnumResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::{create_backend, logging};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Execute CLI command, returning the process exit code
pub async fn execute_command(args: Args) -> EnumResult<i32> {
    let writer = ConsoleWriter::new(args.output);

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path.as_ref())?
    } else {
        config_manager.load_config()?
    };

    // Initialize logging
    if !args.quiet {
        logging::init_logging(&config.global.log_level, args.verbose)?;
    }
    if let Some(project) = config_manager.get_project_config_path() {
        debug!("Project configuration: {}", project.display());
    }

    match args.command {
        Command::Query(query_args) => execute_query_command(query_args, &writer, config).await,
        Command::Name { number, domain } => {
            let number = E164Number::parse(&number)?;
            let domain = DomainSuffix::parse(&domain)?;
            let name = query_name(&number, &domain);
            writer.write_query_name(number.as_str(), domain.as_str(), &name)?;
            Ok(0)
        }
        Command::Config(config_args) => {
            execute_config_command(config_args.command, &writer, &config, &config_manager)?;
            Ok(0)
        }
        Command::Version => {
            writer.write_message(&format!("enumlookup {}", env!("CARGO_PKG_VERSION")))?;
            Ok(0)
        }
    }
}

async fn execute_query_command(
    args: QueryArgs,
    writer: &ConsoleWriter,
    mut config: EnumConfig,
) -> EnumResult<i32> {
    apply_query_overrides(&args, &mut config)?;
    debug!("Using {} backend", config.backend.kind());

    let backend = create_backend(&config)?;
    let query = EnumQuery::new(backend, QueryOptions::from(&config));
    debug!(
        "Per-domain timeout {:?}, services {:?}",
        query.options().timeout,
        query.options().services
    );
    let report = query.query(&args.number, &args.domain_list()).await?;

    writer.write_report(&report)?;
    Ok(report.exit_code())
}

/// Apply command line overrides to the loaded configuration
pub fn apply_query_overrides(args: &QueryArgs, config: &mut EnumConfig) -> EnumResult<()> {
    if !args.services.is_empty() {
        config.lookup.services = args.services.clone();
    }
    if let Some(timeout) = args.timeout {
        config.global.timeout_ms = timeout;
    }

    let wants_script = args.backend == Some(BackendArg::Script) || args.script.is_some();
    let wants_dns = args.backend == Some(BackendArg::Dns) || !args.nameservers.is_empty();
    if wants_script && wants_dns {
        return Err(EnumError::Config {
            message: "Nameservers cannot be combined with the script backend".to_string(),
        });
    }

    if wants_dns {
        if !matches!(config.backend, BackendConfig::Dns { .. }) {
            config.backend = BackendConfig::default();
        }
        if let BackendConfig::Dns { nameservers, .. } = &mut config.backend {
            if !args.nameservers.is_empty() {
                *nameservers = args.nameservers.clone();
            }
        }
    }

    if wants_script {
        match (&mut config.backend, &args.script) {
            (BackendConfig::Script { script_path, .. }, Some(path)) => *script_path = path.clone(),
            (BackendConfig::Script { .. }, None) => {}
            (BackendConfig::Dns { .. }, Some(path)) => {
                config.backend = BackendConfig::Script {
                    script_path: path.clone(),
                    module_dir: None,
                    interpreter: None,
                    interpreter_args: Vec::new(),
                };
            }
            (BackendConfig::Dns { .. }, None) => {
                return Err(EnumError::Config {
                    message: "No script path specified - use --script or the 'script_path' option".to_string(),
                });
            }
        }
    }

    Ok(())
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &EnumConfig,
    config_manager: &ConfigManager,
) -> EnumResult<()> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
        }
        ConfigCommand::Validate { file } => {
            let config = match file {
                Some(file) => config_manager.load_config_from_path(Path::new(&file))?,
                None => config.clone(),
            };
            for domain in &config.lookup.default_domains {
                DomainSuffix::parse(domain)?;
            }
            create_backend(&config)?;
            writer.write_message("Configuration is valid")?;
        }
        ConfigCommand::Init { path, global } => {
            let created = if global {
                let path = config_manager.get_global_config_path_ref();
                if path.exists() {
                    return Err(EnumError::Config {
                        message: format!("Global configuration already exists at {}", path.display()),
                    });
                }
                config_manager.save_config(&EnumConfig::default())?;
                path.clone()
            } else {
                let dir = match path {
                    Some(path) => PathBuf::from(path),
                    None => std::env::current_dir()?,
                };
                config_manager.init_project_config(&dir)?
            };
            writer.write_message(&format!("Configuration written to {}", created.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn query_args(extra: &[&str]) -> QueryArgs {
        let mut argv = vec!["enumlookup", "query", "+1555"];
        argv.extend_from_slice(extra);
        match Args::parse_from(argv).command {
            Command::Query(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides_services_and_timeout() {
        let mut config = EnumConfig::default();
        apply_query_overrides(&query_args(&["-s", "sip", "-t", "250"]), &mut config).unwrap();
        assert_eq!(config.lookup.services, vec!["sip"]);
        assert_eq!(config.global.timeout_ms, 250);
    }

    #[test]
    fn test_nameserver_override() {
        let mut config = EnumConfig::default();
        apply_query_overrides(&query_args(&["-n", "192.0.2.53"]), &mut config).unwrap();
        match config.backend {
            BackendConfig::Dns { nameservers, .. } => assert_eq!(nameservers, vec!["192.0.2.53"]),
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_script_override() {
        let mut config = EnumConfig::default();
        apply_query_overrides(&query_args(&["--script", "/opt/enum_query.pl"]), &mut config).unwrap();
        assert!(matches!(
            config.backend,
            BackendConfig::Script { ref script_path, .. } if script_path == Path::new("/opt/enum_query.pl")
        ));
    }

    #[test]
    fn test_script_backend_needs_path() {
        let mut config = EnumConfig::default();
        let err = apply_query_overrides(&query_args(&["-b", "script"]), &mut config).unwrap_err();
        assert!(err.to_string().contains("No script path specified"));
    }

    #[test]
    fn test_dns_backend_replaces_script() {
        let mut config = EnumConfig {
            backend: BackendConfig::Script {
                script_path: PathBuf::from("/opt/enum_query.pl"),
                module_dir: None,
                interpreter: None,
                interpreter_args: Vec::new(),
            },
            ..EnumConfig::default()
        };
        apply_query_overrides(&query_args(&["-b", "dns"]), &mut config).unwrap();
        assert_eq!(config.backend.kind(), "dns");
    }

    #[test]
    fn test_conflicting_backends() {
        let mut config = EnumConfig::default();
        let result = apply_query_overrides(&query_args(&["--script", "/x", "-n", "192.0.2.1"]), &mut config);
        assert!(result.is_err());
    }
}
