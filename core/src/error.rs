//! Errors raised by IME session setup and configuration.

use thiserror::Error;

use crate::imm::ImmError;

/// Errors raised while setting up or configuring an IME session.
#[derive(Debug, Error)]
pub enum ImeError {
    /// The IME needs a window to attach its context to.
    #[error("window must be created before the IME")]
    NoWindow,

    #[error(transparent)]
    Imm(#[from] ImmError),

    #[error("invalid IME configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize IME configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
