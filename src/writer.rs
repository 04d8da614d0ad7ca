use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QuerySelect, TransactionTrait, sea_query::OnConflict,
};
use tracing::{debug, warn};

use crate::{
    entities::{film_work, genre, genre_film_work, person, person_film_work},
    error::AppResult,
    models::{NormalizedBatch, WriteCounts},
    retry::RetryPolicy,
};

// Rows per INSERT statement, keeping bind parameters well under backend limits.
pub(crate) const INSERT_CHUNK_ROWS: usize = 1000;

#[derive(Clone)]
pub struct DestinationWriter {
    db: DatabaseConnection,
    retry: RetryPolicy,
}

impl DestinationWriter {
    pub fn new(db: DatabaseConnection, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn write(&self, batch: &NormalizedBatch) -> AppResult<WriteCounts> {
        let txn = self.begin("begin batch").await?;

        match write_groups(&txn, batch).await {
            Ok(counts) => {
                txn.commit().await?;
                debug!(?counts, "committed batch");
                Ok(counts)
            },
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "failed to roll back batch");
                }
                Err(err)
            },
        }
    }

    pub async fn person_names(&self) -> AppResult<HashSet<String>> {
        let names: Vec<String> = self
            .retry
            .run("load person names", || {
                person::Entity::find()
                    .select_only()
                    .column(person::Column::FullName)
                    .into_tuple::<String>()
                    .all(&self.db)
            })
            .await?;
        Ok(names.into_iter().collect())
    }

    pub async fn insert_people(&self, people: &[person::Model]) -> AppResult<u64> {
        if people.is_empty() {
            return Ok(0);
        }

        let txn = self.begin("begin person insert").await?;
        let rows: Vec<_> = people.iter().cloned().map(person::ActiveModel::from).collect();
        match insert_rows(&txn, "person", rows, None).await {
            Ok(inserted) => {
                txn.commit().await?;
                Ok(inserted)
            },
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "failed to roll back person insert");
                }
                Err(err)
            },
        }
    }

    async fn begin(&self, operation: &str) -> AppResult<DatabaseTransaction> {
        Ok(self.retry.run(operation, || self.db.begin()).await?)
    }
}

async fn write_groups(txn: &DatabaseTransaction, batch: &NormalizedBatch) -> AppResult<WriteCounts> {
    let films: Vec<_> = batch.films.iter().cloned().map(film_work::ActiveModel::from).collect();
    let genres: Vec<_> = batch.genres.iter().cloned().map(genre::ActiveModel::from).collect();
    let people: Vec<_> = batch.people.iter().cloned().map(person::ActiveModel::from).collect();
    let film_genres: Vec<_> =
        batch.film_genres.iter().cloned().map(genre_film_work::ActiveModel::from).collect();
    let film_people: Vec<_> =
        batch.film_people.iter().cloned().map(person_film_work::ActiveModel::from).collect();

    Ok(WriteCounts {
        films: insert_rows(txn, "film_work", films, None).await?,
        genres: insert_rows(txn, "genre", genres, None).await?,
        people: insert_rows(txn, "person", people, None).await?,
        film_genres: insert_rows(
            txn,
            "genre_film_work",
            film_genres,
            Some(
                OnConflict::columns([
                    genre_film_work::Column::FilmWorkId,
                    genre_film_work::Column::GenreId,
                ])
                .do_nothing()
                .to_owned(),
            ),
        )
        .await?,
        film_people: insert_rows(
            txn,
            "person_film_work",
            film_people,
            Some(
                OnConflict::columns([
                    person_film_work::Column::FilmWorkId,
                    person_film_work::Column::PersonId,
                    person_film_work::Column::Role,
                ])
                .do_nothing()
                .to_owned(),
            ),
        )
        .await?,
    })
}

async fn insert_rows<A, C>(
    conn: &C,
    table: &str,
    rows: Vec<A>,
    on_conflict: Option<OnConflict>,
) -> AppResult<u64>
where
    A: ActiveModelTrait + Clone + Send + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        let mut insert = <A::Entity as EntityTrait>::insert_many(chunk.iter().cloned());
        if let Some(on_conflict) = &on_conflict {
            insert = insert.on_conflict(on_conflict.clone());
        }
        let stored = insert.exec_without_returning(conn).await?;
        debug!(table, rows = chunk.len(), stored, "inserted rows");
        inserted += stored;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use sea_orm::{EntityTrait, PaginatorTrait};
    use uuid::Uuid;

    use super::*;
    use crate::{
        entities::sea_orm_active_enums::{FilmWorkType, PersonRole},
        test_support::destination_writer,
    };

    fn film(title: &str) -> film_work::Model {
        film_work::Model {
            id: Uuid::new_v4(),
            title: title.to_string(),
            kind: FilmWorkType::Movie,
            description: None,
            rating: Some(7.5),
            creation_date: None,
            certificate: None,
            file_path: None,
        }
    }

    fn genre_link(film: &film_work::Model, genre: &genre::Model) -> genre_film_work::Model {
        genre_film_work::Model { id: Uuid::new_v4(), film_work_id: film.id, genre_id: genre.id }
    }

    #[tokio::test]
    async fn writes_every_group() {
        let writer = destination_writer().await;
        let film = film("Heat");
        let drama = genre::Model { id: Uuid::new_v4(), name: "Drama".into(), description: None };
        let x = person::Model { id: Uuid::new_v4(), full_name: "X".into(), birth_date: None };
        let batch = NormalizedBatch {
            film_genres: vec![genre_link(&film, &drama)],
            film_people: vec![
                person_film_work::Model {
                    id: Uuid::new_v4(),
                    film_work_id: film.id,
                    person_id: x.id,
                    role: PersonRole::Actor,
                },
                person_film_work::Model {
                    id: Uuid::new_v4(),
                    film_work_id: film.id,
                    person_id: x.id,
                    role: PersonRole::Writer,
                },
            ],
            films: vec![film.clone()],
            genres: vec![drama],
            people: vec![x],
        };

        let counts = writer.write(&batch).await.unwrap();
        assert_eq!(
            counts,
            WriteCounts { films: 1, genres: 1, people: 1, film_genres: 1, film_people: 2 }
        );

        let stored = film_work::Entity::find_by_id(film.id).one(writer.db()).await.unwrap();
        assert_eq!(stored, Some(film));
        let roles: Vec<PersonRole> = person_film_work::Entity::find()
            .all(writer.db())
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.role)
            .collect();
        assert_eq!(roles.len(), 2);
        assert!(roles.contains(&PersonRole::Actor) && roles.contains(&PersonRole::Writer));
    }

    #[tokio::test]
    async fn join_rows_load_idempotently() {
        let writer = destination_writer().await;
        let film = film("Heat");
        let drama = genre::Model { id: Uuid::new_v4(), name: "Drama".into(), description: None };

        let first = NormalizedBatch {
            films: vec![film.clone()],
            genres: vec![drama.clone()],
            film_genres: vec![genre_link(&film, &drama), genre_link(&film, &drama)],
            ..Default::default()
        };
        let counts = writer.write(&first).await.unwrap();
        assert_eq!(counts.film_genres, 1);

        let again = NormalizedBatch {
            film_genres: vec![genre_link(&film, &drama)],
            ..Default::default()
        };
        let counts = writer.write(&again).await.unwrap();
        assert_eq!(counts.film_genres, 0);

        assert_eq!(genre_film_work::Entity::find().count(writer.db()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn entity_conflict_rolls_back_whole_batch() {
        let writer = destination_writer().await;
        let drama = genre::Model { id: Uuid::new_v4(), name: "Drama".into(), description: None };
        writer
            .write(&NormalizedBatch { genres: vec![drama], ..Default::default() })
            .await
            .unwrap();

        let duplicate = NormalizedBatch {
            films: vec![film("Ronin")],
            genres: vec![genre::Model {
                id: Uuid::new_v4(),
                name: "Drama".into(),
                description: None,
            }],
            ..Default::default()
        };
        assert!(writer.write(&duplicate).await.is_err());

        assert_eq!(film_work::Entity::find().count(writer.db()).await.unwrap(), 0);
        assert_eq!(genre::Entity::find().count(writer.db()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn people_roundtrip_through_name_set() {
        let writer = destination_writer().await;
        assert!(writer.person_names().await.unwrap().is_empty());
        assert_eq!(writer.insert_people(&[]).await.unwrap(), 0);

        let people: Vec<_> = ["A", "B"]
            .into_iter()
            .map(|n| person::Model { id: Uuid::new_v4(), full_name: n.into(), birth_date: None })
            .collect();
        assert_eq!(writer.insert_people(&people).await.unwrap(), 2);

        let names = writer.person_names().await.unwrap();
        assert_eq!(names, HashSet::from(["A".to_string(), "B".to_string()]));
    }
}
