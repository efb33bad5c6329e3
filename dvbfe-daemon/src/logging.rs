//! Console and daily-rotated file logging.
//!
//! Library code logs through the `log` facade; those records are bridged
//! into the tracing subscriber installed here.

use std::fs;
use std::io;
use std::path::Path;

use chrono::Local;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Base name of the log files; the appender adds a date suffix.
pub const LOG_FILE_NAME: &str = "dvbfe.log";

/// Initialize console and file output.
///
/// `verbose` forces debug level. Otherwise `RUST_LOG` wins over `level`,
/// which defaults to `info`.
pub fn init_logging(
    log_dir: &Path,
    retention_days: u64,
    verbose: bool,
    level: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(log_dir)?;
    clean_old_logs(log_dir, retention_days)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Flushes on drop; must live for the whole process.
    let _ = Box::leak(Box::new(guard));

    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")))
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stdout)
                .with_target(true)
                .with_level(true)
                .with_thread_names(true)
                .with_timer(LocalTimeTimer),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_timer(LocalTimeTimer),
        );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set default subscriber: {}", e))?;

    tracing_log::LogTracer::init().map_err(|e| format!("Failed to initialize LogTracer: {}", e))?;

    Ok(())
}

/// Remove our log files last modified more than `retention_days` ago.
/// Returns the number of files removed.
pub fn clean_old_logs(log_dir: &Path, retention_days: u64) -> io::Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Local::now() - chrono::Duration::days(retention_days as i64);
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let ours = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_NAME));
        if !ours {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        let modified: chrono::DateTime<Local> = modified.into();
        if modified < cutoff {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
            }
        }
    }

    Ok(removed)
}

/// Local time with microseconds.
#[derive(Debug, Clone, Copy)]
struct LocalTimeTimer;

impl fmt::time::FormatTime for LocalTimeTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dvbfe-logging-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_dir_is_not_an_error() {
        let dir = std::env::temp_dir().join("dvbfe-logging-does-not-exist");
        assert_eq!(clean_old_logs(&dir, 7).unwrap(), 0);
    }

    #[test]
    fn test_recent_logs_are_kept() {
        let dir = scratch_dir("recent");
        fs::write(dir.join("dvbfe.log.2026-10-15"), b"x").unwrap();

        assert_eq!(clean_old_logs(&dir, 7).unwrap(), 0);
        assert!(dir.join("dvbfe.log.2026-10-15").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_zero_retention_only_touches_our_files() {
        let dir = scratch_dir("zero");
        fs::write(dir.join("dvbfe.log.2026-10-15"), b"x").unwrap();
        fs::write(dir.join("other.log"), b"x").unwrap();
        thread::sleep(Duration::from_millis(20));

        assert_eq!(clean_old_logs(&dir, 0).unwrap(), 1);
        assert!(!dir.join("dvbfe.log.2026-10-15").exists());
        assert!(dir.join("other.log").exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
