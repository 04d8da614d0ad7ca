mod cache;
mod config;
mod db;
mod entities;
mod error;
mod logging;
mod models;
mod normalizer;
mod processor;
mod reconcile;
mod retry;
mod source;
#[cfg(test)]
mod test_support;
mod writer;

use crate::{
    config::Config, retry::RetryPolicy, source::SourceReader, writer::DestinationWriter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let _log_guards = logging::init(&config.log_dir)?;

    let source = db::connect_source(&config.source_database_url).await?;
    let destination =
        db::connect_destination(&config.destination_database_url, &config.destination_schema)
            .await?;

    let source = SourceReader::new(source);
    let writer = DestinationWriter::new(
        destination,
        RetryPolicy::new(config.retry_attempts, config.retry_base_delay),
    );

    if config.apply_schema {
        db::apply_schema(writer.db(), &config.destination_schema).await?;
    }

    let report = processor::run(&source, &writer, config.batch_size).await?;
    tracing::info!(
        started_at = %report.started_at,
        source_rows = report.source_rows,
        batches = report.batches,
        films = report.written.films,
        people = report.written.people + report.reconciled_people,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "done"
    );

    Ok(())
}
