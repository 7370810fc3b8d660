pub mod app;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG` wins; otherwise `-v` raises the level to debug, `-vv` to trace.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "sqlbind=warn",
        1 => "sqlbind=debug",
        _ => "sqlbind=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
