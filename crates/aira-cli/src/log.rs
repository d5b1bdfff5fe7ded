use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize structured logging on stderr; stdout is reserved for command
/// output and the MCP JSON-RPC stream.
///
/// Log level can be controlled via RUST_LOG env var. Default level is "info".
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(false),
        )
        .with(filter)
        .init();
}
