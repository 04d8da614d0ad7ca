use std::{path::PathBuf, time::Duration};

use crate::error::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Config {
    pub source_database_url: String,
    pub destination_database_url: String,
    pub destination_schema: String,
    pub batch_size: u64,
    pub apply_schema: bool,
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let source_database_url = var("SOURCE_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://db.sqlite?mode=ro".to_string());

        let destination_database_url = match var("DESTINATION_DATABASE_URL") {
            Some(url) => url,
            None => postgres_url(&var)?,
        };

        let destination_schema =
            var("DESTINATION_SCHEMA").unwrap_or_else(|| "content".to_string());
        if !is_identifier(&destination_schema) {
            return Err(AppError::config(format!(
                "DESTINATION_SCHEMA must be a plain identifier, got {destination_schema:?}"
            )));
        }

        let batch_size: u64 = parse_or(&var, "PACKAGE_SIZE", 100)?;
        if batch_size == 0 {
            return Err(AppError::config("PACKAGE_SIZE must be positive"));
        }

        let apply_schema: bool = parse_or(&var, "APPLY_SCHEMA", false)?;
        let retry_attempts: u32 = parse_or(&var, "RETRY_ATTEMPTS", 3)?;
        let retry_base_delay_ms: u64 = parse_or(&var, "RETRY_BASE_DELAY_MS", 200)?;
        let log_dir = var("LOG_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            source_database_url,
            destination_database_url,
            destination_schema,
            batch_size,
            apply_schema,
            retry_attempts,
            retry_base_delay: Duration::from_millis(retry_base_delay_ms),
            log_dir,
        })
    }
}

// Component variables carry a DB_ prefix; the old loader's DBNAME/USER/PASSWORD/HOST/PORT
// are not read, USER being the login shell's own variable.
fn postgres_url(var: &impl Fn(&str) -> Option<String>) -> AppResult<String> {
    let name = required(var, "DB_NAME", Some("DBNAME"))?;
    let user = required(var, "DB_USER", None)?;
    let password = var("DB_PASSWORD").unwrap_or_default();
    let host = var("DB_HOST").unwrap_or_else(|| "localhost".to_string());
    let port: u16 = parse_or(var, "DB_PORT", 5432)?;

    let credentials = if password.is_empty() {
        urlencoding::encode(&user).into_owned()
    } else {
        format!("{}:{}", urlencoding::encode(&user), urlencoding::encode(&password))
    };

    Ok(format!("postgres://{credentials}@{host}:{port}/{}", urlencoding::encode(&name)))
}

fn required(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    legacy_key: Option<&str>,
) -> AppResult<String> {
    var(key).ok_or_else(|| match legacy_key.filter(|legacy| var(legacy).is_some()) {
        Some(legacy) => AppError::config(format!("{key} is not set ({legacy} is no longer read)")),
        None => AppError::config(format!("{key} is not set")),
    })
}

fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> AppResult<T> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{key} has an invalid value: {raw:?}"))),
        None => Ok(default),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
