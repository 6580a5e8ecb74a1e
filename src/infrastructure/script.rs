use crate::core::backend::EnumBackend;
use crate::core::naptr::Enumservice;
use crate::core::number::{DomainSuffix, E164Number};
use crate::core::record::{sort_records, EnumRecord};
use crate::domain::error::{EnumError, EnumResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Options of the external lookup script
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    pub script_path: Option<PathBuf>,
    pub module_dir: Option<PathBuf>,
    pub interpreter: Option<String>,
    pub interpreter_args: Vec<String>,
}

/// ENUM backend delegating each lookup to an external script.
///
/// The script receives the number and the domain as its last two arguments
/// and prints one `order|pref|service|servicefound|uri` line per record.
/// Exit status 1 means an invalid query and 2 means nothing was found.
#[derive(Debug)]
pub struct ScriptBackend {
    script_path: PathBuf,
    module_dir: Option<PathBuf>,
    interpreter: Option<String>,
    interpreter_args: Vec<String>,
}

impl ScriptBackend {
    /// Validate the options and create the backend
    pub fn new(options: ScriptOptions) -> EnumResult<Self> {
        let script_path = validate_script_path(options.script_path.as_deref())?;
        let module_dir = options
            .module_dir
            .as_deref()
            .map(validate_module_dir)
            .transpose()?;

        Ok(Self {
            script_path,
            module_dir,
            interpreter: options.interpreter.filter(|i| !i.trim().is_empty()),
            interpreter_args: options.interpreter_args,
        })
    }

    fn command(&self, number: &E164Number, domain: &DomainSuffix) -> Command {
        let mut command = match &self.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.args(&self.interpreter_args);
                if let Some(dir) = &self.module_dir {
                    let mut include = std::ffi::OsString::from("-I");
                    include.push(dir.as_os_str());
                    command.arg(include);
                }
                command.arg(&self.script_path);
                command
            }
            None => Command::new(&self.script_path),
        };
        command.arg(number.as_str()).arg(domain.as_str());
        command.kill_on_drop(true);
        command
    }
}

fn validate_script_path(path: Option<&Path>) -> EnumResult<PathBuf> {
    let path = match path {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => {
            return Err(EnumError::Config {
                message: "No script path specified - use the 'script_path' option".to_string(),
            })
        }
    };

    if !path.exists() {
        return Err(EnumError::Config {
            message: format!("Non-existent file '{}'", path.display()),
        });
    }
    if !path.is_file() || !is_executable(path) {
        return Err(EnumError::Config {
            message: format!("Invalid script file '{}'", path.display()),
        });
    }

    Ok(path.to_path_buf())
}

fn validate_module_dir(path: &Path) -> EnumResult<PathBuf> {
    if !path.is_dir() {
        return Err(EnumError::Config {
            message: format!("Invalid module directory '{}'", path.display()),
        });
    }
    Ok(path.to_path_buf())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[async_trait]
impl EnumBackend for ScriptBackend {
    fn name(&self) -> &'static str {
        "script"
    }

    async fn lookup(
        &self,
        number: &E164Number,
        domain: &DomainSuffix,
        services: &[String],
    ) -> EnumResult<Vec<EnumRecord>> {
        debug!("Running {} for {} {}", self.script_path.display(), number, domain);
        let output = self.command(number, domain).output().await.map_err(|e| EnumError::Script {
            message: format!("Failed to run '{}': {}", self.script_path.display(), e),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!("{}: {}", self.script_path.display(), stderr.trim());
        }

        match output.status.code() {
            Some(0) => {}
            Some(1) => {
                return Err(EnumError::InvalidQuery {
                    number: number.to_string(),
                    domain: domain.to_string(),
                })
            }
            Some(2) => {
                return Err(EnumError::NotFound {
                    number: number.to_string(),
                    domain: domain.to_string(),
                })
            }
            Some(code) => {
                return Err(EnumError::Script {
                    message: format!("'{}' exited with status {}", self.script_path.display(), code),
                })
            }
            None => {
                return Err(EnumError::Script {
                    message: format!("'{}' was terminated by a signal", self.script_path.display()),
                })
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut records = EnumRecord::parse_lines(&stdout)?;
        if !services.is_empty() {
            // The script does not know the wanted services; recompute the flag
            for record in &mut records {
                record.service_found = Enumservice::parse(&record.service)
                    .map_or(false, |service| service.matches(services));
            }
        }
        sort_records(&mut records);
        Ok(records)
    }
}
