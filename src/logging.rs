use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging on stderr.
///
/// Only warnings are shown by default; `verbose` raises the crate's level to
/// debug. `RUST_LOG` directives are applied on top.
pub fn init_logging(verbose: bool) {
    let directive = if verbose { "funcfig=debug" } else { "funcfig=warn" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive(directive.parse().expect("Invalid log directive")),
        )
        .try_init();
}
