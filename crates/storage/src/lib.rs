use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    any::{install_default_drivers, AnyPoolOptions, AnyRow},
    AnyPool, Row,
};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;
use url::Url;

use shared::domain::{City, CityId, CitySlug};

const CITY_BY_SLUG: &str = "SELECT
        CAST(id AS TEXT) AS id,
        name,
        slug,
        COALESCE(logo_url, '') AS logo_url,
        COALESCE(primary_color, '') AS primary_color,
        COALESCE(secondary_color, '') AS secondary_color,
        COALESCE(accent_color, '') AS accent_color,
        COALESCE(db_url, '') AS db_url,
        CAST(is_active AS INTEGER) AS is_active
    FROM cities
    WHERE slug = $1
    LIMIT 1";

/// Outcome of a slug lookup that reached the database.
///
/// Driver failures are reported through the surrounding `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CityLookup {
    Found(City),
    NotFound,
}

#[async_trait]
pub trait CityDirectory: Send + Sync {
    async fn city_by_slug(&self, slug: &CitySlug) -> Result<CityLookup>;
}

/// Handle to the central control database.
#[derive(Clone)]
pub struct ControlStore {
    pool: AnyPool,
}

impl ControlStore {
    /// Opens a pool against Postgres or SQLite. `acquire_timeout` bounds how
    /// long a lookup may wait for a free connection.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        install_default_drivers();

        let database_url = prepare_sqlite_url(database_url)?;
        let mut options = AnyPoolOptions::new().acquire_timeout(acquire_timeout);
        options = if is_sqlite_memory(&database_url) {
            // every new connection would open a fresh, empty in-memory database
            options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options.max_connections(10)
        };

        let pool = options
            .connect(&database_url)
            .await
            .with_context(|| {
                format!(
                    "failed to connect to control database '{}'",
                    redact(&database_url)
                )
            })?;
        debug!(url = %redact(&database_url), "control database pool ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT CAST(1 AS BIGINT)")
            .fetch_one(&self.pool)
            .await
            .context("control database ping failed")?;
        Ok(())
    }

    /// Creates the `cities` table for local development databases. Production
    /// schemas are owned by the administrative system.
    pub async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cities (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                slug            TEXT NOT NULL UNIQUE,
                logo_url        TEXT,
                primary_color   TEXT,
                secondary_color TEXT,
                accent_color    TEXT,
                db_url          TEXT,
                is_active       BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure cities table exists")?;
        Ok(())
    }
}

#[async_trait]
impl CityDirectory for ControlStore {
    async fn city_by_slug(&self, slug: &CitySlug) -> Result<CityLookup> {
        let row = sqlx::query(CITY_BY_SLUG)
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .context("city lookup query failed")?;

        match row {
            Some(row) => Ok(CityLookup::Found(city_from_row(&row)?)),
            None => Ok(CityLookup::NotFound),
        }
    }
}

fn city_from_row(row: &AnyRow) -> Result<City> {
    let is_active: i64 = row.try_get("is_active").context("malformed is_active column")?;
    Ok(City {
        id: CityId(row.try_get("id").context("malformed id column")?),
        name: row.try_get("name").context("malformed name column")?,
        slug: row.try_get("slug").context("malformed slug column")?,
        logo_url: row.try_get("logo_url")?,
        primary_color: row.try_get("primary_color")?,
        secondary_color: row.try_get("secondary_color")?,
        accent_color: row.try_get("accent_color")?,
        db_url: row.try_get("db_url")?,
        is_active: is_active != 0,
    })
}

/// Strips credentials and path from a connection string before it is logged.
pub fn redact(database_url: &str) -> String {
    if database_url.is_empty() || database_url.starts_with("sqlite:") {
        return database_url.to_string();
    }
    match Url::parse(database_url) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}://{host}:{port}", url.scheme()),
            (Some(host), None) => format!("{}://{host}", url.scheme()),
            (None, _) => format!("{}://", url.scheme()),
        },
        Err(_) => "<unparseable url>".to_string(),
    }
}

fn is_sqlite_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn prepare_sqlite_url(database_url: &str) -> Result<String> {
    let database_url = database_url.trim();
    let Some(path) = sqlite_path(database_url) else {
        return Ok(database_url.to_string());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create parent directory '{}' for database url '{database_url}'",
                parent.display()
            )
        })?;
    }

    if database_url.contains('?') {
        Ok(database_url.to_string())
    } else {
        Ok(format!("{database_url}?mode=rwc"))
    }
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_sqlite_memory(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
