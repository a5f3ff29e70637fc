pub mod cli;
pub mod error;
pub mod files;
pub mod harness;
pub mod logging;
pub mod native;
pub mod read;
