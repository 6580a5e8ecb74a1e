use thiserror::Error;

/// enumlookup unified error type
#[derive(Error, Debug)]
pub enum EnumError {
    #[error("Invalid search string '{0}'")]
    InvalidSearchString(String),

    #[error("Invalid domain '{0}'")]
    InvalidDomain(String),

    #[error("Invalid query for number '{number}', domain '{domain}'")]
    InvalidQuery { number: String, domain: String },

    #[error("Not found - number '{number}', domain '{domain}'")]
    NotFound { number: String, domain: String },

    #[error("Resolver error: {0}")]
    Resolver(String),

    #[error("Script error: {message}")]
    Script { message: String },

    #[error("Malformed record: {0}")]
    Parse(String),

    #[error("Lookup timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Output(String),
}

impl EnumError {
    /// Process exit code for this error, following the lookup script contract
    /// (1 = invalid input, 2 = not found).
    pub fn exit_code(&self) -> i32 {
        match self {
            EnumError::InvalidSearchString(_)
            | EnumError::InvalidDomain(_)
            | EnumError::InvalidQuery { .. }
            | EnumError::Config { .. } => 1,
            EnumError::NotFound { .. } => 2,
            _ => 3,
        }
    }
}

pub type EnumResult<T> = Result<T, EnumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_script_contract() {
        let invalid = EnumError::InvalidQuery {
            number: "+420".to_string(),
            domain: ".e164.arpa".to_string(),
        };
        assert_eq!(
            invalid.to_string(),
            "Invalid query for number '+420', domain '.e164.arpa'"
        );

        let missing = EnumError::NotFound {
            number: "+420".to_string(),
            domain: ".e164.arpa".to_string(),
        };
        assert_eq!(
            missing.to_string(),
            "Not found - number '+420', domain '.e164.arpa'"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(EnumError::InvalidSearchString("x".into()).exit_code(), 1);
        assert_eq!(
            EnumError::NotFound { number: "+1".into(), domain: ".a".into() }.exit_code(),
            2
        );
        assert_eq!(EnumError::Resolver("boom".into()).exit_code(), 3);
        assert_eq!(EnumError::Timeout { timeout_ms: 10 }.exit_code(), 3);
    }
}
