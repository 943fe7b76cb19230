use std::io;

use format_serde_error::SerdeError;
use rollup_common::logging::LoggingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("config: {0}")]
    MalformedConfig(#[from] SerdeError),

    #[error("logging: {0}")]
    Logging(#[from] LoggingError),
}
