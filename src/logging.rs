use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TICKETDESK_LOG";

/// Installs the stderr subscriber. `TICKETDESK_LOG` takes precedence over
/// `RUST_LOG`; `verbose` only changes the fallback level.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "ticketdesk=debug"
    } else {
        "ticketdesk=warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
