use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::error::RecommendError;
use crate::models::domain::{AptitudeProfile, Coordinate, Filters};

/// Request to generate ranked recommendations
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    /// Caller identity used for cache keying; anonymous when absent
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(alias = "coordinate")]
    #[validate(nested)]
    pub location: Coordinate,
    #[serde(default, alias = "profile")]
    pub aptitude_profile: AptitudeProfile,
    #[serde(default)]
    #[validate(nested)]
    pub filters: Filters,
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: usize,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

impl RecommendationRequest {
    pub fn new(location: Coordinate, aptitude_profile: AptitudeProfile) -> Self {
        Self {
            user_id: None,
            location,
            aptitude_profile,
            filters: Filters::default(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Reject malformed requests before any work is done
    pub fn check(&self) -> Result<(), RecommendError> {
        self.validate()
            .map_err(|e| RecommendError::InvalidInput(e.to_string()))?;

        // Range validators let NaN through
        if !self.location.is_valid() {
            return Err(RecommendError::InvalidInput(format!(
                "location out of range: ({}, {})",
                self.location.lat, self.location.lon
            )));
        }
        if !(self.filters.max_distance_km.is_finite() && self.filters.max_distance_km > 0.0) {
            return Err(RecommendError::InvalidInput(
                "maxDistanceKm must be a positive number".to_string(),
            ));
        }
        if !self.filters.min_rating.is_finite() {
            return Err(RecommendError::InvalidInput(
                "minRating must be between 0 and 5".to_string(),
            ));
        }

        Ok(())
    }
}

/// Query parameters of the debug endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugQuery {
    #[serde(rename = "topN", default)]
    pub top_n: Option<usize>,
}
