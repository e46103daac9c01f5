use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,season_projector=debug";

/// Installs the fmt subscriber. `RUST_LOG` overrides the default filter.
/// Output goes to stderr so tables on stdout stay clean.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
