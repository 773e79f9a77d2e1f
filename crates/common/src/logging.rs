use tracing_subscriber::EnvFilter;

/// Initializes the process-wide JSON tracing subscriber used by every
/// service binary. `default_directive` is used when `RUST_LOG` is unset,
/// e.g. `"info,coderun_identity=debug"`.
pub fn init(default_directive: &str) {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive.to_string())),
        )
        .with_current_span(true)
        .init();
}
