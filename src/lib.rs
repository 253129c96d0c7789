use std::sync::Once;

pub mod app;
pub mod domain;
pub mod infra;
pub mod ui;
pub mod util;

static INIT: Once = Once::new();

/// Installs the `RUST_LOG`-driven logger once per process.
pub fn setup_logger() {
    INIT.call_once(|| {
        pretty_env_logger::init();
    });
}
