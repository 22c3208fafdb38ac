//! `tracing` subscriber setup shared by the command-line tools.

use tracing_subscriber::EnvFilter;

/// Level for a `-v` count: none warns, `-v` info, `-vv` debug, more trace.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter directives that raise `bin` and this library to one level and
/// leave every other target at the subscriber default.
pub fn directives(bin: &str, verbosity: u8) -> String {
    let level = level_for(verbosity);
    format!("{bin}={level},{}={level}", env!("CARGO_CRATE_NAME"))
}

/// Install a stderr subscriber for `bin`. `RUST_LOG` wins over the `-v`
/// count when set.
pub fn init(bin: &str, verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(bin, verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
