use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_DIR: &str = "./logs";
const LOG_FILE_PREFIX: &str = "mastery.log";

/// Keeps the non-blocking file writer alive; drop it last
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Where rolling log files go, if anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogSettings {
    pub dir: PathBuf,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

impl FileLogSettings {
    /// `None` unless `ENABLE_FILE_LOGS` is set; `LOG_DIR` and `LOG_ROTATION`
    /// (hourly, daily, never) refine it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let enabled = lookup("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if !enabled {
            return None;
        }

        let dir = lookup("LOG_DIR")
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());
        let rotation = match lookup("LOG_ROTATION").as_deref().map(str::trim) {
            Some("hourly") => LogRotation::Hourly,
            Some("never") => LogRotation::Never,
            _ => LogRotation::Daily,
        };

        Some(Self {
            dir: PathBuf::from(dir),
            rotation,
        })
    }
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let settings = FileLogSettings::from_lookup(|key| std::env::var(key).ok());
    let file_writer = settings.and_then(|settings| match std::fs::create_dir_all(&settings.dir) {
        Ok(()) => {
            let appender =
                RollingFileAppender::new(settings.rotation.into(), &settings.dir, LOG_FILE_PREFIX);
            Some(tracing_appender::non_blocking(appender))
        }
        Err(err) => {
            eprintln!("failed to create log directory {}: {err}", settings.dir.display());
            None
        }
    });

    match file_writer {
        Some((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .init();
            Some(FileLogGuard { _guard: guard })
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_file_logs_off_by_default() {
        assert_eq!(FileLogSettings::from_lookup(|_| None), None);
        assert_eq!(FileLogSettings::from_lookup(lookup(&[("ENABLE_FILE_LOGS", "no")])), None);
    }

    #[test]
    fn test_file_log_settings() {
        let settings = FileLogSettings::from_lookup(lookup(&[
            ("ENABLE_FILE_LOGS", "1"),
            ("LOG_DIR", "/var/log/mastery"),
            ("LOG_ROTATION", "hourly"),
        ]))
        .unwrap();
        assert_eq!(settings.dir, PathBuf::from("/var/log/mastery"));
        assert_eq!(settings.rotation, LogRotation::Hourly);

        let settings =
            FileLogSettings::from_lookup(lookup(&[("ENABLE_FILE_LOGS", "true")])).unwrap();
        assert_eq!(settings.dir, PathBuf::from(DEFAULT_LOG_DIR));
        assert_eq!(settings.rotation, LogRotation::Daily);
    }
}
