use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Record already exists: {0}")]
    Duplicate(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Container not registered: {0}")]
    NotRegistered(String),

    #[error("Invocation of {function} on {service} failed: {reason}")]
    DependencyInvocation {
        service: String,
        function: String,
        reason: String,
    },

    #[error("Operation on {key} partially applied (completed: {completed:?}, failed at {failed_step}): {reason}")]
    PartiallyApplied {
        key: String,
        completed: Vec<String>,
        failed_step: String,
        reason: String,
    },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ledger error: {0}")]
    LedgerIo(String),

    #[error("Contract not initialized: {0}")]
    Uninitialized(String),
}

impl Error {
    /// Stable tag for the error kind, exposed to remote callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Duplicate(_) => "duplicate",
            Error::NotFound(_) => "not_found",
            Error::NotRegistered(_) => "not_registered",
            Error::DependencyInvocation { .. } => "dependency_invocation",
            Error::PartiallyApplied { .. } => "partially_applied",
            Error::Serialization(_) => "serialization",
            Error::LedgerIo(_) => "ledger_io",
            Error::Uninitialized(_) => "uninitialized",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn dependency(service: &str, function: &str, err: &anyhow::Error) -> Self {
        Error::DependencyInvocation {
            service: service.to_string(),
            function: function.to_string(),
            reason: format!("{:#}", err),
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::LedgerIo(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
