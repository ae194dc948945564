use indicatif::style::TemplateError;
use thiserror::Error;

pub type StockGymResult<T> = Result<T, StockGymError>;

#[derive(Debug, Error)]
pub enum StockGymError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    System(#[from] SystemError),
}

/// Errors occurring within trader logic or execution.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Trader is incompatible with the stock: {0}")]
    Incompatible(String),

    #[error("Invalid trader hyper-parameter: {0}")]
    InvalidHyperParameter(String),

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Trader sampling failure: {0}")]
    Sampling(String),
}

/// Errors related to report building and parsing.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("History is inconsistent: {0}")]
    InconsistentHistory(String),
}

/// Errors related to the stock environment configuration and execution loop.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Invalid environment state: {0}")]
    InvalidState(String),

    #[error("Invalid environment configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid stochastic matrix '{name}': {msg}")]
    InvalidMatrix { name: String, msg: String },

    #[error("Progress bar error")]
    ProgressBar(#[from] TemplateError),

    #[error("Failed to encode configuration")]
    Encoding(#[from] postcard::Error),
}

/// Errors related to File I/O and serialization.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),
}

/// Errors related to internal invariants. Seeing one of these is a bug.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
