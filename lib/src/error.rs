extern crate thiserror;

use thiserror::Error;
use tokio::sync::AcquireError;

/// Dispatcher error.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Query streams closed: {0}")]
    Closed(#[from] AcquireError),

    #[error("Too many query streams: {0}")]
    Streams(usize),
}
