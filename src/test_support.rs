use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};

use crate::{retry::RetryPolicy, writer::DestinationWriter};

const SOURCE_SCHEMA: &str = r#"
CREATE TABLE movies (
    id TEXT PRIMARY KEY,
    genre TEXT,
    director TEXT,
    writer TEXT,
    title TEXT,
    plot TEXT,
    ratings TEXT,
    imdb_rating TEXT,
    writers TEXT
);
CREATE TABLE actors (id INTEGER PRIMARY KEY, name TEXT);
CREATE TABLE writers (id TEXT PRIMARY KEY, name TEXT);
CREATE TABLE movie_actors (movie_id TEXT, actor_id INTEGER)
"#;

#[derive(Clone, Debug, Default)]
pub struct SourceMovie {
    pub id: &'static str,
    pub title: &'static str,
    pub genre: &'static str,
    pub director: &'static str,
    pub plot: &'static str,
    pub imdb_rating: &'static str,
    pub writer: &'static str,
    pub writers: &'static str,
    pub actor_ids: &'static [i64],
}

pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    Database::connect(opt).await.unwrap()
}

pub async fn destination_db() -> DatabaseConnection {
    let db = memory_db().await;
    Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn destination_writer() -> DestinationWriter {
    DestinationWriter::new(destination_db().await, RetryPolicy::new(1, Duration::ZERO))
}

pub async fn source_db(
    movies: &[SourceMovie],
    actors: &[(i64, &str)],
    writers: &[(&str, &str)],
) -> DatabaseConnection {
    let db = memory_db().await;
    for stmt in SOURCE_SCHEMA.split(';') {
        let stmt = stmt.trim();
        if stmt.is_empty() {
            continue;
        }
        db.execute_unprepared(stmt).await.unwrap();
    }

    for (id, name) in actors {
        exec(&db, "INSERT INTO actors (id, name) VALUES (?, ?)", vec![(*id).into(), (*name).into()])
            .await;
    }
    for (id, name) in writers {
        exec(&db, "INSERT INTO writers (id, name) VALUES (?, ?)", vec![(*id).into(), (*name).into()])
            .await;
    }
    for movie in movies {
        exec(
            &db,
            "INSERT INTO movies (id, genre, director, writer, title, plot, ratings, imdb_rating, writers) \
             VALUES (?, ?, ?, ?, ?, ?, '', ?, ?)",
            vec![
                movie.id.into(),
                movie.genre.into(),
                movie.director.into(),
                movie.writer.into(),
                movie.title.into(),
                movie.plot.into(),
                movie.imdb_rating.into(),
                movie.writers.into(),
            ],
        )
        .await;
        for actor_id in movie.actor_ids {
            exec(
                &db,
                "INSERT INTO movie_actors (movie_id, actor_id) VALUES (?, ?)",
                vec![movie.id.into(), (*actor_id).into()],
            )
            .await;
        }
    }

    db
}

async fn exec(db: &DatabaseConnection, sql: &str, values: Vec<sea_orm::Value>) {
    db.execute(Statement::from_sql_and_values(DbBackend::Sqlite, sql, values)).await.unwrap();
}
