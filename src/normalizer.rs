use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::{
    cache::DedupCache,
    entities::{
        film_work, genre, genre_film_work, person, person_film_work,
        sea_orm_active_enums::{FilmWorkType, PersonRole},
    },
    models::{MovieRecord, NOT_AVAILABLE, NormalizedBatch},
};

pub fn normalize(records: &[MovieRecord], cache: &DedupCache) -> NormalizedBatch {
    let mut working = WorkingSet::new(cache);

    for record in records {
        let film = film_work::Model {
            id: Uuid::new_v4(),
            title: record.title.clone(),
            kind: FilmWorkType::Movie,
            description: record.description.clone(),
            rating: parse_rating(record.rating.as_deref()),
            creation_date: None,
            certificate: None,
            file_path: None,
        };

        for name in split_names(record.genres.as_deref()) {
            let genre_id = working.resolve_genre(name);
            working.batch.film_genres.push(genre_film_work::Model {
                id: Uuid::new_v4(),
                film_work_id: film.id,
                genre_id,
            });
        }

        let director = record.director.as_deref().map(str::trim).filter(|n| is_value(n));
        let roles = [
            (PersonRole::Director, director.into_iter().collect::<Vec<_>>()),
            (PersonRole::Actor, split_names(record.actors.as_deref()).collect()),
            (PersonRole::Writer, split_names(record.writers.as_deref()).collect()),
        ];
        for (role, names) in roles {
            for name in names {
                let person_id = working.resolve_person(name);
                working.batch.film_people.push(person_film_work::Model {
                    id: Uuid::new_v4(),
                    film_work_id: film.id,
                    person_id,
                    role,
                });
            }
        }

        working.batch.films.push(film);
    }

    let batch = working.batch;
    debug!(
        records = records.len(),
        films = batch.films.len(),
        new_genres = batch.genres.len(),
        new_people = batch.people.len(),
        film_genres = batch.film_genres.len(),
        film_people = batch.film_people.len(),
        "normalized batch"
    );
    batch
}

pub fn parse_rating(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok()).filter(|r| r.is_finite())
}

pub fn split_names(list: Option<&str>) -> impl Iterator<Item = &str> {
    list.into_iter().flat_map(|s| s.split(',')).map(str::trim).filter(|n| is_value(n))
}

fn is_value(name: &str) -> bool {
    !name.is_empty() && name != NOT_AVAILABLE
}

struct WorkingSet<'a> {
    cache: &'a DedupCache,
    genres: HashMap<String, Uuid>,
    people: HashMap<String, Uuid>,
    batch: NormalizedBatch,
}

impl<'a> WorkingSet<'a> {
    fn new(cache: &'a DedupCache) -> Self {
        Self {
            cache,
            genres: HashMap::new(),
            people: HashMap::new(),
            batch: NormalizedBatch::default(),
        }
    }

    fn resolve_genre(&mut self, name: &str) -> Uuid {
        if let Some(existing) = self.cache.lookup_genre(name) {
            return existing.id;
        }
        if let Some(id) = self.genres.get(name) {
            return *id;
        }
        let genre = genre::Model { id: Uuid::new_v4(), name: name.to_string(), description: None };
        self.genres.insert(genre.name.clone(), genre.id);
        let id = genre.id;
        self.batch.genres.push(genre);
        id
    }

    fn resolve_person(&mut self, full_name: &str) -> Uuid {
        if let Some(existing) = self.cache.lookup_person(full_name) {
            return existing.id;
        }
        if let Some(id) = self.people.get(full_name) {
            return *id;
        }
        let person =
            person::Model { id: Uuid::new_v4(), full_name: full_name.to_string(), birth_date: None };
        self.people.insert(person.full_name.clone(), person.id);
        let id = person.id;
        self.batch.people.push(person);
        id
    }
}
