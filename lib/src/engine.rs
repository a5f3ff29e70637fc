use crate::code::{ErrorCode, Status};

/// Callback handed to the engine for one query. Called once per response.
pub type Respond = Box<dyn FnMut(String) + Send + 'static>;

/// A query engine with an explicit initialize / execute / deinitialize lifecycle.
///
/// Implementations must tolerate concurrent `execute` calls sharing one
/// environment; the harness never mutates the environment after `initialize`.
pub trait QueryEngine: Send + Sync + 'static {
    /// Opaque environment produced by `initialize`.
    type Env: Send + Sync + 'static;

    /// Loads the index and configuration files named in the comma-separated `files`.
    fn initialize(&self, files: &str) -> Result<Self::Env, ErrorCode>;

    /// Runs one query. Responses are delivered through `respond`; the return
    /// value is the engine's status for the call.
    fn execute(&self, env: &Self::Env, query: &str, respond: Respond) -> Status;

    fn deinitialize(&self, env: Self::Env);
}
