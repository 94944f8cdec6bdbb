// Core algorithm exports
pub mod distance;
pub mod filters;
pub mod generators;
pub mod knowledge;
pub mod merger;
pub mod pagination;
pub mod recommender;
pub mod scoring;

pub use distance::{calculate_bounding_box, distance_score, haversine_distance, is_within_bounding_box};
pub use filters::{matches_fees, matches_filters, matches_medium, matches_rating};
pub use generators::{
    semantic_similarity, text_relevance, CandidateGenerator, GenerationContext, GeoGenerator,
    SemanticGenerator, TextGenerator,
};
pub use knowledge::{KnowledgeBase, KnowledgeError};
pub use merger::merge_candidates;
pub use pagination::paginate;
pub use recommender::{Recommender, RecommenderConfig};
pub use scoring::{build_rationale, calculate_breakdown, compare_results, Ranker};
