use serde::{Deserialize, Serialize};

use crate::domain::City;

/// Public branding view of a tenant, returned by the theme endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityThemeResponse {
    pub name: String,
    pub slug: String,
    pub logo_url: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
}

impl From<&City> for CityThemeResponse {
    fn from(city: &City) -> Self {
        Self {
            name: city.name.clone(),
            slug: city.slug.clone(),
            logo_url: city.logo_url.clone(),
            primary_color: city.primary_color.clone(),
            secondary_color: city.secondary_color.clone(),
            accent_color: city.accent_color.clone(),
        }
    }
}
