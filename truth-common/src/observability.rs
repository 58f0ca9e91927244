//! Process-wide `tracing` setup.
//!
//! Every event lands in a daily-rotated file under the log directory and,
//! optionally, on stderr. [`init_logging`] installs the subscriber on first
//! use; later calls return the same file path without touching it.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type SinkLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

// Dropping the guard stops the background writer, so it lives for the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static ACTIVE_FILE: OnceLock<PathBuf> = OnceLock::new();

/// Line encoding shared by every sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Names the log file and the fallback data directory.
    pub app_name: &'static str,
    /// Lookup order: this field, `TRUTH_LOG_DIR`, then `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Directive used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "truth",
            log_dir: None,
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Installs the global subscriber and returns today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(active) = ACTIVE_FILE.get() {
        return Ok(active.clone());
    }

    let dir = log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let file_prefix = format!("{}.log", config.app_name);
    let dated = dir.join(format!("{file_prefix}.{}", Local::now().format("%Y-%m-%d")));

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &file_prefix));
    let _ = FILE_GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.as_str()));

    let mut sinks = vec![sink_layer(config.format, writer, false)];
    if config.emit_stderr {
        sinks.push(sink_layer(config.format, std::io::stderr, true));
    }
    tracing_subscriber::registry()
        .with(sinks)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    let _ = ACTIVE_FILE.set(dated.clone());
    Ok(dated)
}

/// One output stream in the configured encoding. ANSI colours only on terminals.
fn sink_layer<W>(format: LogFormat, writer: W, ansi: bool) -> SinkLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    let home = env::var_os("HOME").map(PathBuf::from);
    let chosen = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os("TRUTH_LOG_DIR").map(PathBuf::from));

    match (chosen, home) {
        (Some(dir), Some(home)) => match dir.strip_prefix("~") {
            Ok(rest) => home.join(rest),
            Err(_) => dir,
        },
        (Some(dir), None) => dir,
        (None, Some(home)) => home.join(".local/share").join(app_name),
        (None, None) => Path::new(".").join(app_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = log_dir("truth", Some(Path::new("/var/log/truth")));
        assert_eq!(dir, PathBuf::from("/var/log/truth"));
    }

    #[test]
    fn tilde_expands_against_home() {
        temp_env::with_var("HOME", Some("/home/ops"), || {
            let dir = log_dir("truth", Some(Path::new("~/logs")));
            assert_eq!(dir, PathBuf::from("/home/ops/logs"));
        });
    }

    #[test]
    fn log_format_parses_lowercase() {
        let fmt: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(fmt, LogFormat::Json);
    }
}
