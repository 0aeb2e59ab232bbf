//! Errors raised while building the schedule document.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The API token file does not exist.
    #[error("Please put your Pretalx token in the {} file.", .0.display())]
    MissingToken(PathBuf),

    /// The configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A slot carries a start or end that cannot be parsed.
    #[error("invalid slot time {value:?}: {source}")]
    InvalidSlot {
        value: String,
        source: chrono::ParseError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
