use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogConfig;

/// Initializes tracing/logging from `RUST_LOG`, falling back to the configured level.
///
/// sqlx logs every statement at `info`; those are capped at `warn` unless
/// `RUST_LOG` says otherwise since the pipeline already logs the generated SQL.
pub fn init_tracing(config: &LogConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", config.level)));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false);

    let result = if config.json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already initialized: {e}");
    }
}
