//! Diagnostic logging for the CLI
//!
//! Operator output goes to stdout through `println!`; tracing output goes to
//! stderr so it never mixes with it.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "siquil=warn,siquil_migrations=warn",
        1 => "siquil=info,siquil_migrations=info",
        2 => "siquil=debug,siquil_migrations=debug",
        _ => "siquil=trace,siquil_migrations=trace,sqlx=debug",
    }
}

/// Initialize logging; `RUST_LOG` takes precedence over the verbosity flag
pub fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(Layer::new().with_writer(io::stderr).with_target(false))
        .try_init();
}
