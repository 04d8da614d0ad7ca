use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;

use crate::{
    entities::person,
    error::AppResult,
    models::NOT_AVAILABLE,
    source::{LegacyTable, SourceReader},
    writer::DestinationWriter,
};

pub async fn reconcile(
    source: &SourceReader,
    writer: &DestinationWriter,
    table: LegacyTable,
) -> AppResult<Vec<person::Model>> {
    let legacy = source.legacy_names(table).await?;
    let legacy_count = legacy.len();
    let existing = writer.person_names().await?;

    let people: Vec<person::Model> = missing_names(legacy, &existing)
        .into_iter()
        .map(|full_name| person::Model { id: Uuid::new_v4(), full_name, birth_date: None })
        .collect();
    let inserted = writer.insert_people(&people).await?;

    info!(
        table = table.table_name(),
        legacy = legacy_count,
        existing = existing.len(),
        inserted,
        "reconciled legacy people"
    );
    Ok(people)
}

pub fn missing_names(
    legacy: impl IntoIterator<Item = String>,
    existing: &HashSet<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    legacy
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && name != NOT_AVAILABLE)
        .filter(|name| !existing.contains(name) && seen.insert(name.clone()))
        .collect()
}
