use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Converter from {from} to {to} is not implemented")]
    UnsupportedPair { from: String, to: String },

    #[error("Clock converter for {0} is not implemented")]
    UnsupportedClock(String),

    #[error("Unknown chip: {0}")]
    UnknownChip(String),

    #[error("Cannot find the chip {0} in the input")]
    MissingChip(String),

    #[error("Unknown variable: {0}")]
    UnknownOption(String),

    #[error("Missing value for {0}")]
    MissingOptionValue(String),

    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    InvalidOption {
        key: String,
        value: String,
        expected: String,
    },

    #[error("Voice table error: {0}")]
    VoiceTable(String),

    #[error("VGM parse error: {0}")]
    VgmParse(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
