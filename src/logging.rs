use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::env_bool;

const LOG_FILE_PREFIX: &str = "elera.log";

/// Keeps the non-blocking file writer flushing until dropped at shutdown.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub filter: String,
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env(filter: &str) -> Self {
        let file_dir = env_bool("ENABLE_FILE_LOGS")
            .unwrap_or(false)
            .then(|| PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".into())));

        Self {
            filter: filter.to_string(),
            file_dir,
        }
    }
}

pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let file_parts = settings.file_dir.as_ref().and_then(|dir| {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("failed to create log directory {}: {err}", dir.display());
            return None;
        }
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        Some(tracing_appender::non_blocking(appender))
    });

    match file_parts {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
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
