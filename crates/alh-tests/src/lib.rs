//! Integration tests for the ALH client family
//!
//! This crate contains end-to-end tests that exercise transports in
//! composition:
//!
//! - `proxy_terminal_test.rs` - proxy addressing a node through a
//!   coordinator on a scripted serial device
//! - `web_gateway_test.rs` - web client against a local HTTP server
//!   (busy polling, authentication, channel faults)
//!
//! All tests run fully in-process; no hardware or network access is
//! required.

/// Install a test subscriber honouring `RUST_LOG`, once per process.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
