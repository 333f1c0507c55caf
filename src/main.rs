//! Binary entrypoint for the chat relay server.

use std::process::ExitCode;

use chat_relay::start_relay;

/// Start the relay with configuration taken from `RELAY_*` variables.
fn main() -> ExitCode {
    start_relay::run()
}
