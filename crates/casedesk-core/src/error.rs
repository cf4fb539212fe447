use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid credit amount: {0} (choose 5, 10 or 20)")]
    InvalidCreditAmount(i64),

    #[error("invalid export format '{0}': expected 'txt' or 'md'")]
    InvalidExportFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Why a session token was rejected.
///
/// The guard treats every variant identically; the distinction only exists
/// for logging and the `verify-token` command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no session token")]
    Missing,

    #[error("session token expired")]
    Expired,

    #[error("session token not yet valid")]
    Immature,

    #[error("invalid session token: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
