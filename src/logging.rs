// 📜 Logging setup shared by both binaries
// Diagnostics go to stderr; stdout stays for user-facing output

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "registry_lens=info";

/// Install the global subscriber with the default filter.
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Install the global subscriber once. `RUST_LOG` overrides `default`.
pub fn init_with_default(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
