//! Error types for the CLI.

use std::path::PathBuf;

use ibkr_readonly::GatewayError;

/// All errors that can end a CLI run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("gateway session is not authenticated ({0})")]
    NotAuthenticated(String),

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotAuthenticated(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
