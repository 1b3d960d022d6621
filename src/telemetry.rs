use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::log_format::TargetFirstFormat;

/// Start Sentry error reporting when `SENTRY_DSN` is set.
/// The returned guard flushes pending events when dropped.
pub fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let environment = std::env::var("SKYTRACK_ENV").unwrap_or_else(|_| "development".to_string());
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(environment.into()),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Install the global subscriber: `RUST_LOG` filtering (default `info`),
/// the target-first formatter on stderr and, with Sentry enabled, a layer
/// forwarding errors to it.
pub fn init_tracing(sentry_enabled: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let sentry_layer = sentry_enabled.then(sentry_tracing::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .event_format(TargetFirstFormat::new())
                .with_writer(std::io::stderr),
        )
        .with(sentry_layer)
        .init();
}
