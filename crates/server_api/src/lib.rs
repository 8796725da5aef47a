use std::{sync::Arc, time::Duration};

use shared::{
    domain::{City, CitySlug},
    error::{ApiError, ErrorCode},
    protocol::CityThemeResponse,
};
use storage::{CityDirectory, CityLookup};
use thiserror::Error;
use tracing::error;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Dependencies of the theme lookup path. Cheap to clone; the directory is
/// shared by every in-flight request.
#[derive(Clone)]
pub struct ThemeService {
    pub directory: Arc<dyn CityDirectory>,
    pub query_timeout: Duration,
}

impl ThemeService {
    pub fn new(directory: Arc<dyn CityDirectory>) -> Self {
        Self {
            directory,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

#[derive(Debug, Error)]
enum LookupFailure {
    #[error("lookup exceeded {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Resolves `raw_slug` to the public theme of an active city.
pub async fn get_city_theme(
    svc: &ThemeService,
    raw_slug: &str,
) -> Result<CityThemeResponse, ApiError> {
    let city = find_city(svc, raw_slug).await?;
    if !city.is_active {
        return Err(ApiError::new(ErrorCode::Forbidden, "city disabled"));
    }
    Ok(CityThemeResponse::from(&city))
}

/// Same lookup as [`get_city_theme`] without the active gate. Operator
/// tooling only; never exposed over HTTP.
pub async fn inspect_city(svc: &ThemeService, raw_slug: &str) -> Result<City, ApiError> {
    find_city(svc, raw_slug).await
}

async fn find_city(svc: &ThemeService, raw_slug: &str) -> Result<City, ApiError> {
    let slug = CitySlug::parse(raw_slug)?;

    match lookup_with_deadline(svc, &slug).await {
        Ok(CityLookup::Found(city)) => Ok(city),
        Ok(CityLookup::NotFound) => Err(ApiError::new(ErrorCode::NotFound, "city not found")),
        Err(failure) => {
            error!(%slug, error = ?failure, "city lookup failed");
            Err(ApiError::internal())
        }
    }
}

async fn lookup_with_deadline(
    svc: &ThemeService,
    slug: &CitySlug,
) -> Result<CityLookup, LookupFailure> {
    let lookup = tokio::time::timeout(svc.query_timeout, svc.directory.city_by_slug(slug))
        .await
        .map_err(|_| LookupFailure::TimedOut(svc.query_timeout))??;
    Ok(lookup)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
