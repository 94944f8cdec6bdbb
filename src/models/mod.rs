// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    normalize_tags, AptitudeProfile, BoundingBox, Candidate, CandidateKey, CandidateSource,
    CandidateSourceCounts, Catalog, College, CollegeSummary, CollegeType, Coordinate, Course, Filters,
    Medium, MergedCandidate, PaginationMeta, ScoreBreakdown, ScoredResult, ScoringWeights,
    DEFAULT_MAX_DISTANCE_KM,
};
pub use requests::{DebugQuery, RecommendationRequest};
pub use responses::{
    DebugCandidates, DebugResponse, ErrorResponse, HealthResponse, RawCandidate,
    RecommendationResponse, ResponseMetadata, SearchParams,
};
