//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber, honoring `RUST_LOG`. Logs go to stderr so they never mix
/// with document text written to stdout.
pub fn init(verbose: u8) {
    let fallback = match verbose {
        0 => DEFAULT_FILTER,
        1 => "zge_assist=info",
        _ => "zge_assist=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
