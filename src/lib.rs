//! Campus Match - College and course recommendation service
//!
//! Ranks (college, course) pairs for a student by combining three candidate
//! sources (proximity, keyword relevance and aptitude similarity), merging
//! them, and scoring the union with a weighted composite. Results are cached
//! per (user, location, filters) and served page by page.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{distance::haversine_distance, KnowledgeBase, Recommender, RecommenderConfig};
pub use error::RecommendError;
pub use models::{
    AptitudeProfile, College, Coordinate, Course, Filters, RecommendationRequest,
    RecommendationResponse, ScoredResult, ScoringWeights,
};
