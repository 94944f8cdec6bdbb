use crate::core::{
    distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box},
    filters::matches_filters,
    knowledge::KnowledgeBase,
};
use crate::models::{AptitudeProfile, Candidate, CandidateSource, Catalog, Coordinate, Course, Filters};
use std::cmp::Ordering;
use std::sync::Arc;

/// Text relevance that maps to a normalized score of 1.0
pub const TEXT_SCORE_SATURATION: f64 = 6.0;

/// Flat bonus added to semantic similarity when a course tag hits a search term
pub const SEMANTIC_TAG_BONUS: f64 = 0.1;

/// Per-request inputs shared by every generator
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub location: Coordinate,
    pub profile: AptitudeProfile,
    pub filters: Filters,
    /// Highest-scoring aptitude categories, best first
    pub top_categories: Vec<String>,
    /// Keyword terms derived from `top_categories`
    pub terms: Vec<String>,
}

impl GenerationContext {
    pub fn new(
        location: Coordinate,
        profile: AptitudeProfile,
        filters: Filters,
        knowledge: &KnowledgeBase,
        top_n: usize,
    ) -> Self {
        let top_categories: Vec<String> = profile
            .top_categories(top_n)
            .into_iter()
            .map(str::to_string)
            .collect();
        let category_refs: Vec<&str> = top_categories.iter().map(String::as_str).collect();
        let terms = knowledge.terms_for(&category_refs);

        Self {
            location,
            profile,
            filters,
            top_categories,
            terms,
        }
    }

    /// Same request with a different filter set
    pub fn with_filters(&self, filters: Filters) -> Self {
        Self {
            filters,
            ..self.clone()
        }
    }
}

/// A source of candidate (college, course) pairs.
///
/// Implementations are pure functions of the catalog snapshot and the
/// request context, so they can run on any task in any order.
pub trait CandidateGenerator: Send + Sync {
    fn source(&self) -> CandidateSource;

    fn generate(&self, catalog: &Catalog, ctx: &GenerationContext) -> Vec<Candidate>;
}

/// Highest score first, then catalog identity for a stable order
fn by_score_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.college.id.cmp(&b.college.id))
        .then_with(|| a.course().id.cmp(&b.course().id))
}

/// Courses whose college lies inside the search radius
#[derive(Debug, Clone)]
pub struct GeoGenerator {
    limit: usize,
}

impl GeoGenerator {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl CandidateGenerator for GeoGenerator {
    fn source(&self) -> CandidateSource {
        CandidateSource::Geo
    }

    fn generate(&self, catalog: &Catalog, ctx: &GenerationContext) -> Vec<Candidate> {
        let radius = ctx.filters.max_distance_km;
        let bbox = calculate_bounding_box(&ctx.location, radius);

        let mut candidates: Vec<Candidate> = Vec::new();
        for college in catalog.colleges() {
            // Cheap rectangle test before the exact distance
            if !is_within_bounding_box(&college.coordinate, &bbox) {
                continue;
            }
            let distance_km = haversine_distance(&ctx.location, &college.coordinate);
            if distance_km > radius {
                continue;
            }

            for (course_index, course) in college.courses.iter().enumerate() {
                if !matches_filters(college, course, &ctx.filters) {
                    continue;
                }
                candidates.push(Candidate {
                    college: Arc::clone(college),
                    course_index,
                    source: CandidateSource::Geo,
                    score: distance_km,
                    distance_km: Some(distance_km),
                });
            }
        }

        // Nearest first, so truncation never depends on catalog order
        candidates.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.college.id.cmp(&b.college.id))
                .then_with(|| a.course().id.cmp(&b.course().id))
        });
        candidates.truncate(self.limit);
        candidates
    }
}

/// Raw keyword relevance of a course against a set of lower-case terms.
///
/// +2 per term in the name, +1 per term in the description and +1.5 per
/// term contained in any tag.
pub fn text_relevance(course: &Course, terms: &[String]) -> f64 {
    let name = course.name.to_lowercase();
    let description = course.description.to_lowercase();

    terms.iter().fold(0.0, |score, term| {
        let mut score = score;
        if name.contains(term.as_str()) {
            score += 2.0;
        }
        if description.contains(term.as_str()) {
            score += 1.0;
        }
        if course.tags.iter().any(|tag| tag.contains(term.as_str())) {
            score += 1.5;
        }
        score
    })
}

/// Courses whose name, description or tags mention the profile's keywords
#[derive(Debug, Clone)]
pub struct TextGenerator {
    limit: usize,
}

impl TextGenerator {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl CandidateGenerator for TextGenerator {
    fn source(&self) -> CandidateSource {
        CandidateSource::Text
    }

    fn generate(&self, catalog: &Catalog, ctx: &GenerationContext) -> Vec<Candidate> {
        if ctx.terms.is_empty() {
            return Vec::new();
        }

        let mut candidates: Vec<Candidate> = catalog
            .courses()
            .filter_map(|(college, course_index)| {
                let course = &college.courses[course_index];
                if !matches_filters(college, course, &ctx.filters) {
                    return None;
                }
                let raw = text_relevance(course, &ctx.terms);
                (raw > 0.0).then(|| Candidate {
                    college: Arc::clone(college),
                    course_index,
                    source: CandidateSource::Text,
                    score: (raw / TEXT_SCORE_SATURATION).min(1.0),
                    distance_km: None,
                })
            })
            .collect();

        candidates.sort_by(by_score_desc);
        candidates.truncate(self.limit);
        candidates
    }
}

/// Aptitude similarity of a course in [0, 1].
///
/// Each category's share of the profile's total score is multiplied by the
/// course's affinity for that category; a tag matching one of `terms` adds
/// [`SEMANTIC_TAG_BONUS`]. Courses absent from the affinity table score only
/// through the tag bonus.
pub fn semantic_similarity(
    knowledge: &KnowledgeBase,
    profile: &AptitudeProfile,
    course: &Course,
    terms: &[String],
) -> f64 {
    let total = profile.total();
    let affinity = match knowledge.affinity_for(&course.name) {
        Some(row) if total > 0.0 => row
            .iter()
            .map(|(category, weight)| profile.score(category) / total * weight)
            .sum(),
        _ => 0.0,
    };

    let tag_hit = course
        .tags
        .iter()
        .any(|tag| terms.iter().any(|term| tag.contains(term.as_str())));
    let bonus = if tag_hit { SEMANTIC_TAG_BONUS } else { 0.0 };

    (affinity + bonus).clamp(0.0, 1.0)
}

/// Courses whose aptitude affinities match the profile
#[derive(Debug, Clone)]
pub struct SemanticGenerator {
    knowledge: Arc<KnowledgeBase>,
    limit: usize,
    threshold: f64,
}

impl SemanticGenerator {
    pub fn new(knowledge: Arc<KnowledgeBase>, limit: usize, threshold: f64) -> Self {
        Self {
            knowledge,
            limit,
            threshold,
        }
    }
}

impl CandidateGenerator for SemanticGenerator {
    fn source(&self) -> CandidateSource {
        CandidateSource::Semantic
    }

    fn generate(&self, catalog: &Catalog, ctx: &GenerationContext) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = catalog
            .courses()
            .filter_map(|(college, course_index)| {
                let course = &college.courses[course_index];
                if !matches_filters(college, course, &ctx.filters) {
                    return None;
                }
                let similarity =
                    semantic_similarity(&self.knowledge, &ctx.profile, course, &ctx.terms);
                (similarity > self.threshold).then(|| Candidate {
                    college: Arc::clone(college),
                    course_index,
                    source: CandidateSource::Semantic,
                    score: similarity,
                    distance_km: None,
                })
            })
            .collect();

        candidates.sort_by(by_score_desc);
        candidates.truncate(self.limit);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{normalize_tags, College, CollegeType};

    fn create_course(id: &str, name: &str, description: &str, tags: &[&str]) -> Course {
        Course {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            degree: "B.Sc".to_string(),
            fees: Some(50_000),
            seats: 60,
            tags: normalize_tags(tags),
            medium: Some("English".to_string()),
        }
    }

    fn create_college(id: &str, lat: f64, lon: f64, courses: Vec<Course>) -> College {
        College {
            id: id.to_string(),
            name: format!("College {}", id),
            coordinate: Coordinate::new(lat, lon),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            rating: 4.0,
            college_type: CollegeType::Private,
            courses,
        }
    }

    fn create_context(profile: AptitudeProfile, filters: Filters) -> GenerationContext {
        let kb = KnowledgeBase::builtin().unwrap();
        GenerationContext::new(Coordinate::new(18.52, 73.85), profile, filters, &kb, 3)
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            create_college(
                "near",
                18.53,
                73.86,
                vec![
                    create_course("cs", "Computer Science", "Programming and algorithms", &["software"]),
                    create_course("hist", "History", "Ancient civilisations", &["humanities"]),
                ],
            ),
            create_college(
                "mid",
                18.80,
                73.85,
                vec![create_course("math", "Mathematics", "Pure mathematics", &["numbers"])],
            ),
            create_college(
                "far",
                19.08,
                72.88,
                vec![create_course("cs", "Computer Science", "", &[])],
            ),
        ])
    }

    #[test]
    fn test_geo_respects_radius_and_sorts_by_distance() {
        let ctx = create_context(AptitudeProfile::new(), Filters::default());
        let candidates = GeoGenerator::new(500).generate(&catalog(), &ctx);

        // "far" (Mumbai) is ~120km away
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.college.id != "far"));
        for pair in candidates.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
        assert!(candidates.iter().all(|c| c.distance_km == Some(c.score)));
    }

    #[test]
    fn test_geo_truncates_nearest_first() {
        let ctx = create_context(AptitudeProfile::new(), Filters::default());
        let candidates = GeoGenerator::new(1).generate(&catalog(), &ctx);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].college.id, "near");
    }

    #[test]
    fn test_geo_empty_catalog() {
        let ctx = create_context(AptitudeProfile::new(), Filters::default());
        assert!(GeoGenerator::new(500).generate(&Catalog::default(), &ctx).is_empty());
    }

    #[test]
    fn test_text_relevance_weights() {
        let course = create_course("cs", "Computer Science", "computer labs", &["computer-vision"]);
        let terms = vec!["computer".to_string()];

        assert_eq!(text_relevance(&course, &terms), 4.5);
        assert_eq!(text_relevance(&course, &["poetry".to_string()]), 0.0);
    }

    #[test]
    fn test_text_generator_uses_top_categories() {
        let profile = AptitudeProfile::new().with("logical", 9.0);
        let ctx = create_context(profile, Filters::default());
        let candidates = TextGenerator::new(200).generate(&catalog(), &ctx);

        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.course().id != "hist"));
        assert!(candidates.iter().all(|c| c.score > 0.0 && c.score <= 1.0));
        for pair in candidates.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_text_generator_empty_profile_yields_nothing() {
        let ctx = create_context(AptitudeProfile::new(), Filters::default());
        assert!(TextGenerator::new(200).generate(&catalog(), &ctx).is_empty());
    }

    #[test]
    fn test_semantic_similarity_weighted_by_profile_share() {
        let kb = KnowledgeBase::builtin().unwrap();
        let course = create_course("cs", "Computer Science", "", &[]);

        let focused = AptitudeProfile::new().with("logical", 10.0);
        let similarity = semantic_similarity(&kb, &focused, &course, &[]);
        assert!((similarity - 0.9).abs() < 1e-9);

        let diluted = AptitudeProfile::new().with("logical", 5.0).with("artistic", 5.0);
        let similarity = semantic_similarity(&kb, &diluted, &course, &[]);
        assert!((similarity - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_semantic_unknown_course_only_gets_tag_bonus() {
        let kb = KnowledgeBase::builtin().unwrap();
        let profile = AptitudeProfile::new().with("logical", 10.0);
        let course = create_course("x", "Basket Weaving", "", &["software"]);

        let similarity = semantic_similarity(&kb, &profile, &course, &["software".to_string()]);
        assert!((similarity - SEMANTIC_TAG_BONUS).abs() < 1e-9);
    }

    #[test]
    fn test_semantic_generator_threshold() {
        let profile = AptitudeProfile::new().with("logical", 10.0);
        let ctx = create_context(profile, Filters::default());
        let kb = Arc::new(KnowledgeBase::builtin().unwrap());
        let candidates = SemanticGenerator::new(kb, 200, 0.3).generate(&catalog(), &ctx);

        assert!(candidates.iter().all(|c| c.score > 0.3));
        assert!(candidates.iter().any(|c| c.course().id == "cs"));
        assert!(candidates.iter().all(|c| c.course().id != "hist"));
    }

    #[test]
    fn test_generators_apply_fee_filter() {
        let profile = AptitudeProfile::new().with("logical", 10.0);
        let filters = Filters { max_fees: Some(10_000), ..Filters::default() };
        let ctx = create_context(profile, filters);
        let kb = Arc::new(KnowledgeBase::builtin().unwrap());

        assert!(GeoGenerator::new(500).generate(&catalog(), &ctx).is_empty());
        assert!(TextGenerator::new(200).generate(&catalog(), &ctx).is_empty());
        assert!(SemanticGenerator::new(kb, 200, 0.3).generate(&catalog(), &ctx).is_empty());
    }
}
