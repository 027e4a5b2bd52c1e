//! Tracing configuration and log routing.
//!
//! Both services log to stdout using a compact formatter and to a file. When `PDFVEC_LOG_FILE`
//! is set, logs are appended to that path; otherwise a file logger is created under
//! `logs/<service>.log`. A non‑blocking writer keeps file I/O off request paths.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Environment;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// How the service derives its default log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelPolicy {
    /// Production clamps logging to errors; development honours `LOG_LEVEL`.
    QuietInProduction,
    /// Development logs at debug; production honours `LOG_LEVEL`.
    VerboseInDevelopment,
}

/// Map a `LOG_LEVEL` value onto a tracing filter directive.
///
/// Accepts the Python-style names used by deployment manifests (`critical`, `warning`) as well as
/// `none`. Returns `None` for unknown values.
pub fn level_directive(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "critical" | "fatal" | "error" => Some("error"),
        "warning" | "warn" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        "none" | "off" => Some("off"),
        _ => None,
    }
}

/// Resolve the default filter directive for a service.
pub fn default_directive(log_level: &str, environment: Environment, policy: LevelPolicy) -> &'static str {
    match (policy, environment) {
        (LevelPolicy::QuietInProduction, Environment::Production) => "error",
        (LevelPolicy::VerboseInDevelopment, Environment::Development) => "debug",
        _ => level_directive(log_level).unwrap_or("info"),
    }
}

/// Configure tracing subscribers for stdout and file logging.
///
/// - Respects `RUST_LOG` for filtering; otherwise uses [`default_directive`].
/// - Installs a compact stdout layer and, when available, a file layer.
/// - Keeps the non‑blocking writer alive for the process lifetime through a global guard.
pub fn init_tracing(service: &str, log_level: &str, environment: Environment, policy: LevelPolicy) {
    let directive = default_directive(log_level, environment, policy);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer(service) {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }

    if level_directive(log_level).is_none() {
        tracing::warn!(log_level, "Invalid LOG_LEVEL; falling back to 'info'");
    }
}

/// Build a non‑blocking writer for file logging.
///
/// Returns `None` when the logs directory cannot be created or the target file cannot be opened.
fn configure_file_writer(service: &str) -> Option<NonBlocking> {
    if let Ok(path) = std::env::var("PDFVEC_LOG_FILE") {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                let _ = LOG_GUARD.set(guard);
                Some(non_blocking)
            }
            Err(err) => {
                eprintln!("Failed to open log file {path}: {err}");
                None
            }
        }
    } else {
        if let Err(err) = std::fs::create_dir_all("logs") {
            eprintln!("Failed to create logs directory: {err}");
            return None;
        }
        let file_appender = tracing_appender::rolling::never("logs", format!("{service}.log"));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(non_blocking)
    }
}
