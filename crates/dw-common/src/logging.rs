use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `info` directive. Returns `false` when a
/// subscriber was already installed (tests, embedding hosts).
pub fn init_logging(json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        builder.json().with_current_span(false).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
