pub mod code;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod response;
pub mod session;
pub mod sink;
pub mod slot;
pub mod stats;
pub mod util;

pub use code::{ErrorCode, Status};
pub use dispatch::Dispatcher;
pub use engine::{QueryEngine, Respond};
pub use error::DispatchError;
pub use session::Session;
pub use sink::ResponseSink;
pub use stats::RunStats;
