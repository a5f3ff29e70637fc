extern crate tokio;

use std::process::ExitCode;

use qstream_repo::{harness, logging};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    ExitCode::from(harness::start(std::env::args_os(), std::io::stdout()).await)
}
