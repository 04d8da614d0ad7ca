use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
};

use crate::error::{AppError, AppResult};

const DEFAULT_FILTER: &str = "info,movies_etl=debug,sqlx=warn";

pub struct LogGuards {
    _guards: [WorkerGuard; 2],
}

pub fn init(log_dir: &Path) -> AppResult<LogGuards> {
    std::fs::create_dir_all(log_dir)?;

    let (load_writer, load_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, "load.log"));
    let (upload_writer, upload_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, "upload.log"));

    let console_filter =
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(console_filter))
        .with(fmt::layer().with_ansi(false).with_writer(load_writer).with_filter(source_targets()))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(upload_writer)
                .with_filter(destination_targets()),
        )
        .try_init()
        .map_err(|e| AppError::Other(e.into()))?;

    Ok(LogGuards { _guards: [load_guard, upload_guard] })
}

fn source_targets() -> Targets {
    Targets::new().with_target("movies_etl::source", LevelFilter::TRACE)
}

fn destination_targets() -> Targets {
    Targets::new()
        .with_target("sqlx::query", LevelFilter::TRACE)
        .with_target("movies_etl::writer", LevelFilter::TRACE)
        .with_target("movies_etl::reconcile", LevelFilter::TRACE)
}
