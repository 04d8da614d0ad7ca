use std::time::Instant;

use tracing::{debug, info};

use crate::{
    cache::DedupCache,
    error::AppResult,
    models::{MigrationReport, WriteCounts},
    normalizer,
    reconcile,
    source::{LegacyTable, SourceReader},
    writer::DestinationWriter,
};

pub struct BatchOutcome {
    pub cache: DedupCache,
    pub fetched: usize,
    pub counts: WriteCounts,
}

pub async fn run(
    source: &SourceReader,
    writer: &DestinationWriter,
    batch_size: u64,
) -> AppResult<MigrationReport> {
    let started_at = jiff::Timestamp::now();
    let clock = Instant::now();
    let batch_size = batch_size.max(1);

    let total = source.count_movies().await?;
    info!(total, batch_size, "starting migration");

    let mut cache = DedupCache::new();
    let mut written = WriteCounts::default();
    let mut batches = 0;
    let mut offset = 0;

    while offset < total {
        let outcome = process_batch(source, writer, cache, batch_size, offset).await?;
        cache = outcome.cache;
        if outcome.fetched == 0 {
            debug!(offset, total, "source ran out of rows early");
            break;
        }

        batches += 1;
        written += outcome.counts;
        info!(
            batch = batches,
            offset,
            rows = outcome.fetched,
            films = outcome.counts.films,
            genres = outcome.counts.genres,
            people = outcome.counts.people,
            film_genres = outcome.counts.film_genres,
            film_people = outcome.counts.film_people,
            "batch written"
        );
        offset += batch_size;
    }

    let mut reconciled_people = 0;
    for table in LegacyTable::ALL {
        let added = reconcile::reconcile(source, writer, table).await?;
        cache.record_people(&added);
        reconciled_people += added.len() as u64;
    }

    let report = MigrationReport {
        started_at,
        elapsed: clock.elapsed(),
        source_rows: total,
        batches,
        written,
        reconciled_people,
    };
    info!(
        batches = report.batches,
        films = report.written.films,
        genres = report.written.genres,
        people = report.written.people,
        film_genres = report.written.film_genres,
        film_people = report.written.film_people,
        reconciled_people = report.reconciled_people,
        cached_genres = cache.genre_count(),
        cached_people = cache.person_count(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "migration finished"
    );
    Ok(report)
}

pub async fn process_batch(
    source: &SourceReader,
    writer: &DestinationWriter,
    mut cache: DedupCache,
    limit: u64,
    offset: u64,
) -> AppResult<BatchOutcome> {
    let records = source.fetch(limit, offset).await?;
    if records.is_empty() {
        return Ok(BatchOutcome { cache, fetched: 0, counts: WriteCounts::default() });
    }

    let batch = normalizer::normalize(&records, &cache);
    let counts = writer.write(&batch).await?;
    cache.record(&batch);

    Ok(BatchOutcome { cache, fetched: records.len(), counts })
}
