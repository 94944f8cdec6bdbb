use serde::{Deserialize, Serialize};
use crate::models::domain::{
    Candidate, CandidateSource, CandidateSourceCounts, Coordinate, Filters, PaginationMeta,
    ScoredResult, ScoringWeights,
};

/// Effective parameters of the search that produced the results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub location: Coordinate,
    /// Filters actually applied, with the widened radius after a fallback
    pub filters: Filters,
    pub requested_max_distance_km: f64,
    pub top_categories: Vec<String>,
    pub knowledge_version: String,
}

/// Summary metadata attached to every page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub candidate_source_counts: CandidateSourceCounts,
    pub relaxed: bool,
    pub message: Option<String>,
    pub cached: bool,
    pub request_id: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub search_params: SearchParams,
}

/// Response for the recommendations endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub results: Vec<ScoredResult>,
    pub pagination: PaginationMeta,
    pub metadata: ResponseMetadata,
}

/// Raw generator output exposed by the debug endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    pub college_id: String,
    pub college_name: String,
    pub course_id: String,
    pub course_name: String,
    pub source: CandidateSource,
    pub score: f64,
    pub distance_km: Option<f64>,
}

impl From<&Candidate> for RawCandidate {
    fn from(candidate: &Candidate) -> Self {
        let course = candidate.course();
        Self {
            college_id: candidate.college.id.clone(),
            college_name: candidate.college.name.clone(),
            course_id: course.id.clone(),
            course_name: course.name.clone(),
            source: candidate.source,
            score: candidate.score,
            distance_km: candidate.distance_km,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugCandidates {
    pub geo: Vec<RawCandidate>,
    pub text: Vec<RawCandidate>,
    pub semantic: Vec<RawCandidate>,
}

/// Response for the debug inspection endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugResponse {
    pub weights: ScoringWeights,
    pub knowledge_version: String,
    pub search_terms: Vec<String>,
    pub top_candidates: DebugCandidates,
    pub response: RecommendationResponse,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub knowledge_version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
