//! Log setup for the `sidesa` binary and its library crates.
//!
//! The configured level applies to this workspace's own crates. HTTP and
//! connection-pool internals stay at `warn` unless `RUST_LOG` says otherwise,
//! so `--verbose` shows backend requests without transport chatter. The
//! console only gets level and message because command output shares the
//! terminal; the file under the log directory keeps targets and source lines.

use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::SidResult;

/// File name prefix of the daily log files (`sidesa.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "sidesa.log";

const WORKSPACE_TARGETS: &[&str] = &["sidesa", "sid_core", "sid_models", "sid_api", "sid_services"];
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2", "r2d2"];
const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Filter directives for `level`. An unrecognized level means `info`.
pub fn directives(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    let level = if LEVELS.contains(&level.as_str()) { level.as_str() } else { "info" };

    let mut parts = vec!["warn".to_string()];
    parts.extend(WORKSPACE_TARGETS.iter().map(|t| format!("{t}={level}")));
    parts.extend(QUIET_TARGETS.iter().map(|t| format!("{t}=warn")));
    parts.join(",")
}

/// `RUST_LOG` wins when set and valid; otherwise the configured level.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)))
}

/// Install the global subscriber: a terse stderr layer plus a daily-rotated
/// file in `log_dir`, written as JSON lines when `json_output` is set.
///
/// Keep the returned guard alive for the whole run; dropping it flushes
/// the file writer.
pub fn init_logging(level: &str, log_dir: &Path, json_output: bool) -> SidResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact();

    let registry = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(console_layer);

    if json_output {
        registry
            .with(fmt::layer().with_writer(writer).json().with_file(true).with_line_number(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }

    tracing::debug!("log files under {} at level {level}", log_dir.display());
    Ok(LogGuard { _guard: guard })
}

/// Holds the file writer's worker thread.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}
