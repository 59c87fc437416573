pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

/// Install logging. `verbose` raises the default level when `RUST_LOG` is unset.
pub fn init(verbose: u8) {
    infra::logging::init(verbose);
}
