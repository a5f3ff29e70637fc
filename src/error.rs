extern crate thiserror;

use std::io;

use qstream::{DispatchError, ErrorCode};
use thiserror::Error;

/// Error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] IoError),

    #[error("{0}")]
    Startup(#[from] StartupError),

    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Argument Error: {0}")]
    Arguments(#[from] clap::Error),
}

/// I/O errors.
#[derive(Debug, Error, PartialEq)]
pub enum IoError {
    #[error("File Error: {0}: {1}")]
    File(String, io::ErrorKind),

    #[error("Reader Error: {0}")]
    Reader(io::ErrorKind),

    #[error("Output Error: {0}")]
    Output(io::ErrorKind),
}

/// Errors that stop the harness before any query runs.
#[derive(Debug, Error, PartialEq)]
pub enum StartupError {
    #[error("Pointer Size: {0}.  Must be 8.")]
    PointerWidth(usize),

    #[error("Error {} while initializing shared files: {}", .0.get(), .0.explanation())]
    Initialize(ErrorCode),

    #[error("Unable to load engine library {0}: {1}")]
    Library(String, String),
}
