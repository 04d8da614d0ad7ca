use std::{ops::AddAssign, time::Duration};

use crate::entities::{film_work, genre, genre_film_work, person, person_film_work};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieRecord {
    pub source_id: String,
    pub genres: Option<String>,
    pub director: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<String>,
    pub actors: Option<String>,
    pub writers: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NormalizedBatch {
    pub films: Vec<film_work::Model>,
    pub genres: Vec<genre::Model>,
    pub people: Vec<person::Model>,
    pub film_genres: Vec<genre_film_work::Model>,
    pub film_people: Vec<person_film_work::Model>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WriteCounts {
    pub films: u64,
    pub genres: u64,
    pub people: u64,
    pub film_genres: u64,
    pub film_people: u64,
}

impl AddAssign for WriteCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.films += rhs.films;
        self.genres += rhs.genres;
        self.people += rhs.people;
        self.film_genres += rhs.film_genres;
        self.film_people += rhs.film_people;
    }
}

#[derive(Clone, Debug)]
pub struct MigrationReport {
    pub started_at: jiff::Timestamp,
    pub elapsed: Duration,
    pub source_rows: u64,
    pub batches: u64,
    pub written: WriteCounts,
    pub reconciled_people: u64,
}
