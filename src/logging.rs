use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

use crate::error::{Error, Result};

/// Open session log. Dropping it flushes and closes the file, so keep it alive until exit.
#[must_use = "the log file is closed when the session log is dropped"]
pub struct SessionLog {
    path: PathBuf,
    _guard: WorkerGuard,
}

impl SessionLog {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

pub(crate) fn log_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("log-{}.txt", now.format("%Y%m%d-%H%M%S"))
}

/// Starts a per-session log file `log-YYYYMMDD-HHMMSS.txt` under `logs_dir`.
///
/// The level comes from `RUST_LOG` and defaults to `debug`.
pub fn init(logs_dir: &Path) -> Result<SessionLog> {
    std::fs::create_dir_all(logs_dir)?;
    let file_name = log_file_name(chrono::Local::now());
    let path = logs_dir.join(&file_name);

    let appender = tracing_appender::rolling::never(logs_dir, &file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_timer(LocalTime)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    Ok(SessionLog {
        path,
        _guard: guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_carries_timestamp() {
        let t = chrono::Local
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .single()
            .unwrap();
        assert_eq!(log_file_name(t), "log-20240309-070501.txt");
    }
}
