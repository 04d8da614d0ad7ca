use std::collections::{HashMap, HashSet};

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult, Statement,
    sea_query::{Alias, Expr, Query},
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::AppResult,
    models::{MovieRecord, NOT_AVAILABLE},
    writer::INSERT_CHUNK_ROWS,
};

const MOVIES_PAGE_SQL: &str = r#"
SELECT
    CAST(m.id AS TEXT) AS source_id,
    m.genre AS genres,
    m.director AS director,
    COALESCE(m.title, '') AS title,
    m.plot AS plot,
    CAST(m.imdb_rating AS TEXT) AS rating,
    (
        SELECT group_concat(a.name, ', ')
        FROM movie_actors ma
        JOIN actors a ON a.id = ma.actor_id
        WHERE ma.movie_id = m.id
    ) AS actors,
    CAST(m.writer AS TEXT) AS writer,
    m.writers AS writers
FROM movies m
ORDER BY m.id
LIMIT ? OFFSET ?
"#;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LegacyTable {
    Actors,
    Writers,
}

impl LegacyTable {
    pub const ALL: [LegacyTable; 2] = [LegacyTable::Actors, LegacyTable::Writers];

    pub fn table_name(self) -> &'static str {
        match self {
            LegacyTable::Actors => "actors",
            LegacyTable::Writers => "writers",
        }
    }
}

#[derive(Clone)]
pub struct SourceReader {
    db: DatabaseConnection,
}

impl SourceReader {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn count_movies(&self) -> AppResult<u64> {
        let sql = "SELECT COUNT(*) AS total FROM movies";
        debug!(sql, "counting movies");
        let row = CountRow::find_by_statement(Statement::from_string(self.backend(), sql))
            .one(&self.db)
            .await?;
        Ok(row.map(|r| r.total.max(0) as u64).unwrap_or(0))
    }

    pub async fn fetch(&self, limit: u64, offset: u64) -> AppResult<Vec<MovieRecord>> {
        debug!(sql = MOVIES_PAGE_SQL, limit, offset, "fetching movies page");
        let rows = MovieRow::find_by_statement(Statement::from_sql_and_values(
            self.backend(),
            MOVIES_PAGE_SQL,
            [(limit as i64).into(), (offset as i64).into()],
        ))
        .all(&self.db)
        .await?;

        let ids_per_row: Vec<Vec<String>> =
            rows.iter().map(|r| writer_ids(r.writer.as_deref(), r.writers.as_deref())).collect();
        let names = self.writer_names(ids_per_row.iter().flatten()).await?;

        let records = rows
            .into_iter()
            .zip(ids_per_row)
            .map(|(row, ids)| {
                let writers: Vec<&str> =
                    ids.iter().filter_map(|id| names.get(id).map(String::as_str)).collect();
                MovieRecord {
                    source_id: row.source_id,
                    genres: row.genres,
                    director: row.director,
                    title: row.title,
                    description: row
                        .plot
                        .filter(|p| !p.trim().is_empty() && p.trim() != NOT_AVAILABLE),
                    rating: row.rating,
                    actors: row.actors,
                    writers: (!writers.is_empty()).then(|| writers.join(", ")),
                }
            })
            .collect::<Vec<_>>();

        debug!(limit, offset, fetched = records.len(), "fetched movies page");
        Ok(records)
    }

    pub async fn legacy_names(&self, table: LegacyTable) -> AppResult<Vec<String>> {
        let select = Query::select()
            .column(Alias::new("name"))
            .from(Alias::new(table.table_name()))
            .to_owned();
        let stmt = self.backend().build(&select);
        debug!(sql = %stmt, "fetching legacy names");

        let rows = NameRow::find_by_statement(stmt).all(&self.db).await?;
        Ok(rows.into_iter().filter_map(|r| r.name).collect())
    }

    async fn writer_names<'a>(
        &self,
        ids: impl Iterator<Item = &'a String>,
    ) -> AppResult<HashMap<String, String>> {
        let ids: Vec<&String> = ids.collect::<HashSet<_>>().into_iter().collect();
        let mut names = HashMap::new();

        for chunk in ids.chunks(INSERT_CHUNK_ROWS) {
            let select = Query::select()
                .expr_as(Expr::cust("CAST(id AS TEXT)"), Alias::new("id"))
                .column(Alias::new("name"))
                .from(Alias::new("writers"))
                .and_where(Expr::col(Alias::new("id")).is_in(chunk.iter().map(|id| id.as_str())))
                .to_owned();
            let stmt = self.backend().build(&select);
            debug!(sql = %stmt, ids = chunk.len(), "resolving writer names");

            let rows = WriterRow::find_by_statement(stmt).all(&self.db).await?;
            names.extend(rows.into_iter().filter_map(|r| Some((r.id?, r.name?))));
        }

        Ok(names)
    }

    fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }
}

/// Writer ids of a movie: the single `writer` reference when present, else the
/// serialized `writers` list. Duplicates are dropped keeping the first occurrence.
pub fn writer_ids(writer: Option<&str>, writers: Option<&str>) -> Vec<String> {
    if let Some(id) = writer.map(str::trim).filter(|w| !w.is_empty()) {
        return vec![id.to_string()];
    }

    let Some(raw) = writers.map(str::trim).filter(|w| !w.is_empty()) else {
        return Vec::new();
    };

    let refs: Vec<WriterRef> = match serde_json::from_str(raw) {
        Ok(refs) => refs,
        Err(err) => {
            warn!(writers = raw, error = %err, "unparseable writers list");
            return Vec::new();
        },
    };

    let mut seen = HashSet::new();
    refs.into_iter()
        .map(WriterRef::into_id)
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WriterRef {
    Object { id: String },
    Plain(String),
}

impl WriterRef {
    fn into_id(self) -> String {
        match self {
            WriterRef::Object { id } | WriterRef::Plain(id) => id.trim().to_string(),
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct MovieRow {
    source_id: String,
    genres: Option<String>,
    director: Option<String>,
    title: String,
    plot: Option<String>,
    rating: Option<String>,
    actors: Option<String>,
    writer: Option<String>,
    writers: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

#[derive(Debug, FromQueryResult)]
struct NameRow {
    name: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct WriterRow {
    id: Option<String>,
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{SourceMovie, source_db};

    #[test]
    fn writer_reference_forms() {
        assert_eq!(writer_ids(Some("w1"), Some(r#"[{"id": "w2"}]"#)), ["w1"]);
        assert_eq!(writer_ids(Some(""), Some(r#"[{"id": "w2"}, {"id": "w3"}]"#)), ["w2", "w3"]);
        assert_eq!(writer_ids(None, Some(r#"["w2", "w2", "w4"]"#)), ["w2", "w4"]);
        assert!(writer_ids(None, Some("not json")).is_empty());
        assert!(writer_ids(None, None).is_empty());
    }

    #[test]
    fn legacy_table_names() {
        let names: Vec<_> = LegacyTable::ALL.iter().map(|t| t.table_name()).collect();
        assert_eq!(names, ["actors", "writers"]);
    }

    #[tokio::test]
    async fn fetch_flattens_joined_lists() {
        let db = source_db(
            &[
                SourceMovie {
                    id: "m1",
                    title: "First",
                    genre: "Drama, Comedy",
                    director: "Z",
                    plot: "A plot",
                    imdb_rating: "7.5",
                    writer: "w1",
                    writers: "",
                    actor_ids: &[1, 2],
                },
                SourceMovie {
                    id: "m2",
                    title: "Second",
                    genre: "Drama",
                    director: "Z",
                    plot: "N/A",
                    imdb_rating: "N/A",
                    writer: "",
                    writers: r#"[{"id": "w2"}, {"id": "w1"}, {"id": "missing"}]"#,
                    actor_ids: &[2],
                },
            ],
            &[(1, "X"), (2, "Y")],
            &[("w1", "X"), ("w2", "Q")],
        )
        .await;
        let reader = SourceReader::new(db);

        assert_eq!(reader.count_movies().await.unwrap(), 2);

        let records = reader.fetch(10, 0).await.unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.source_id, "m1");
        assert_eq!(first.title, "First");
        assert_eq!(first.genres.as_deref(), Some("Drama, Comedy"));
        assert_eq!(first.director.as_deref(), Some("Z"));
        assert_eq!(first.description.as_deref(), Some("A plot"));
        assert_eq!(first.rating.as_deref(), Some("7.5"));
        let mut actors: Vec<_> = first.actors.as_deref().unwrap().split(", ").collect();
        actors.sort();
        assert_eq!(actors, ["X", "Y"]);
        assert_eq!(first.writers.as_deref(), Some("X"));

        let second = &records[1];
        assert_eq!(second.description, None);
        assert_eq!(second.actors.as_deref(), Some("Y"));
        assert_eq!(second.writers.as_deref(), Some("Q, X"));
    }

    #[tokio::test]
    async fn pages_follow_source_order() {
        let movies: Vec<SourceMovie> = ["c", "a", "b"]
            .into_iter()
            .map(|id| SourceMovie { id, title: id, ..SourceMovie::default() })
            .collect();
        let reader = SourceReader::new(source_db(&movies, &[], &[]).await);

        let first = reader.fetch(2, 0).await.unwrap();
        let rest = reader.fetch(2, 2).await.unwrap();
        let ids: Vec<_> = first.iter().chain(&rest).map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(reader.fetch(2, 4).await.unwrap().is_empty());

        assert!(first[0].actors.is_none());
        assert!(first[0].writers.is_none());
    }

    #[tokio::test]
    async fn legacy_names_lists_every_row() {
        let db = source_db(&[], &[(1, "A"), (2, "B"), (3, "B")], &[("w1", "C")]).await;
        let reader = SourceReader::new(db);

        let mut actors = reader.legacy_names(LegacyTable::Actors).await.unwrap();
        actors.sort();
        assert_eq!(actors, ["A", "B", "B"]);
        assert_eq!(reader.legacy_names(LegacyTable::Writers).await.unwrap(), ["C"]);
    }

    #[tokio::test]
    async fn writer_lists_larger_than_one_lookup_resolve_fully() {
        let db = source_db(&[], &[], &[]).await;
        let total = INSERT_CHUNK_ROWS * 2 + 500;
        db.execute_unprepared(&format!(
            "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < {total}) \
             INSERT INTO writers (id, name) SELECT 'w' || i, 'Writer ' || i FROM n"
        ))
        .await
        .unwrap();
        db.execute_unprepared(&format!(
            "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < {total}) \
             INSERT INTO movies (id, title, writer, writers) \
             SELECT 'm1', 'Crowded', '', '[' || group_concat('\"w' || i || '\"', ',') || ']' FROM n"
        ))
        .await
        .unwrap();
        let reader = SourceReader::new(db);

        let records = reader.fetch(10, 0).await.unwrap();

        let names: HashSet<_> = records[0].writers.as_deref().unwrap().split(", ").collect();
        assert_eq!(names.len(), total);
        assert!(names.contains("Writer 1") && names.contains(format!("Writer {total}").as_str()));
    }
}
