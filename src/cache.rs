use std::collections::HashMap;

use crate::{
    entities::{genre, person},
    models::NormalizedBatch,
};

/// Entries are only added for rows whose insert has been committed, so a lookup hit
/// always refers to an id the destination already holds.
#[derive(Clone, Debug, Default)]
pub struct DedupCache {
    genres: HashMap<String, genre::Model>,
    people: HashMap<String, person::Model>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_genre(&self, name: &str) -> Option<&genre::Model> {
        self.genres.get(name)
    }

    pub fn lookup_person(&self, full_name: &str) -> Option<&person::Model> {
        self.people.get(full_name)
    }

    pub fn record(&mut self, batch: &NormalizedBatch) {
        self.genres.extend(batch.genres.iter().map(|g| (g.name.clone(), g.clone())));
        self.record_people(&batch.people);
    }

    pub fn record_people(&mut self, people: &[person::Model]) {
        self.people.extend(people.iter().map(|p| (p.full_name.clone(), p.clone())));
    }

    pub fn genre_count(&self) -> usize {
        self.genres.len()
    }

    pub fn person_count(&self) -> usize {
        self.people.len()
    }
}
