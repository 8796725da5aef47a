use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub String);

/// URL path segment that identifies a tenant in the control store.
///
/// Matching is exact and case-sensitive, so the only rejected value is the
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitySlug(String);

impl CitySlug {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        if raw.is_empty() {
            return Err(ApiError::new(ErrorCode::InvalidRequest, "slug is required"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CitySlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the control-store `cities` table.
///
/// Nullable columns arrive here already coalesced to empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub slug: String,
    pub logo_url: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    /// Per-tenant data-plane connection string. Carried, never dialed here.
    pub db_url: String,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slug_is_invalid_request() {
        let err = CitySlug::parse("").expect_err("empty slug");
        assert!(matches!(err.code, ErrorCode::InvalidRequest));
    }

    #[test]
    fn slug_is_kept_verbatim() {
        let slug = CitySlug::parse("Springfield ").expect("slug");
        assert_eq!(slug.as_str(), "Springfield ");
    }
}
