//! Logging setup for the effects demo.
//!
//! Installs a `tracing` subscriber with a console layer and, in debug builds,
//! a JSON file layer. Library crates log through the `log` facade, which the
//! subscriber picks up.

use nebula_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

/// Name of the JSON log written in debug builds.
pub const LOG_FILE_NAME: &str = "effects.log";

/// Filter directives for `config`.
///
/// A bare level such as `debug` keeps the graphics stack quiet; anything
/// containing its own directives is used as written.
pub fn filter_directives(config: Option<&Config>) -> String {
    let level = config.map(|c| c.debug.log_level.trim()).unwrap_or("");
    if level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("{level},wgpu=warn,naga=warn")
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `config`.
///
/// With `debug_build` and a `log_dir`, JSON records are also written to
/// `log_dir/effects.log`.
///
/// ```no_run
/// use nebula_config::Config;
/// use nebula_log::init_logging;
///
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&Config::default()));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let directives = filter_directives(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// An `EnvFilter` built from [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
