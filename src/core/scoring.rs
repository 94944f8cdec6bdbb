use crate::core::{
    distance::{distance_score, haversine_distance},
    generators::{semantic_similarity, GenerationContext},
    knowledge::KnowledgeBase,
};
use crate::models::{
    CandidateSource, CollegeSummary, MergedCandidate, ScoreBreakdown, ScoredResult, ScoringWeights,
};
use std::cmp::Ordering;
use std::sync::Arc;

/// Calculate the composite score breakdown for a merged candidate
///
/// Scoring formula:
/// final = (
///     semantic * 0.35 +       # aptitude affinity
///     text * 0.25 +           # keyword relevance
///     distance * 0.20 +       # 1 / (1 + km / 10)
///     rating * 0.15 +         # rating / 5
///     availability * 0.05     # min(seats / 100, 1)
/// )
///
/// Weights that do not sum to 1 are rescaled so `final` stays in [0, 1].
pub fn calculate_breakdown(
    semantic: f64,
    text: f64,
    distance_km: f64,
    rating: f64,
    seats: u32,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let semantic = unit(semantic);
    let text = unit(text);
    let distance = distance_score(distance_km);
    let rating = unit(rating / 5.0);
    let availability = (seats as f64 / 100.0).min(1.0);

    let weighted = semantic * weights.semantic
        + text * weights.text
        + distance * weights.distance
        + rating * weights.rating
        + availability * weights.availability;

    let sum = weights.sum();
    let final_score = if sum > 0.0 && (sum - 1.0).abs() > 1e-9 {
        weighted / sum
    } else {
        weighted
    };

    ScoreBreakdown {
        final_score: unit(final_score),
        semantic,
        text,
        distance,
        rating,
        availability,
    }
}

/// Clamp to [0, 1], mapping non-finite values to 0
#[inline]
fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Human-readable explanation of why a result ranked where it did
pub fn build_rationale(breakdown: &ScoreBreakdown, top_category: Option<&str>) -> String {
    let mut reasons: Vec<&str> = Vec::new();

    if breakdown.semantic > 0.7 {
        reasons.push("strong aptitude alignment");
    } else if breakdown.semantic > 0.4 {
        reasons.push("good aptitude fit");
    }
    if breakdown.text > 0.5 {
        reasons.push("matches your interests");
    }
    if breakdown.distance > 0.8 {
        reasons.push("nearby");
    }
    if breakdown.rating > 0.8 {
        reasons.push("highly rated");
    }
    if breakdown.availability >= 1.0 {
        reasons.push("plenty of seats");
    }

    if reasons.is_empty() {
        return "Recommended based on your profile".to_string();
    }

    let mut rationale = reasons.join(", ");
    if let Some(first) = rationale.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    if let Some(category) = top_category {
        rationale.push_str(&format!("; top aptitude: {}", category));
    }
    rationale
}

/// Ranking order: final score descending, then distance ascending, then
/// college name, then ids so the order is total
pub fn compare_results(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    b.score_breakdown
        .final_score
        .total_cmp(&a.score_breakdown.final_score)
        .then_with(|| a.distance_km.total_cmp(&b.distance_km))
        .then_with(|| a.college.name.cmp(&b.college.name))
        .then_with(|| a.college.id.cmp(&b.college.id))
        .then_with(|| a.course.id.cmp(&b.course.id))
}

/// Turns merged candidates into a totally ordered result list
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: ScoringWeights,
    knowledge: Arc<KnowledgeBase>,
}

impl Ranker {
    pub fn new(weights: ScoringWeights, knowledge: Arc<KnowledgeBase>) -> Self {
        Self { weights, knowledge }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score every candidate inside the search radius and sort them
    pub fn rank(&self, merged: Vec<MergedCandidate>, ctx: &GenerationContext) -> Vec<ScoredResult> {
        let top_category = ctx.top_categories.first().map(String::as_str);

        let mut results: Vec<ScoredResult> = merged
            .into_iter()
            .filter_map(|candidate| self.score(candidate, ctx, top_category))
            .collect();

        results.sort_by(compare_results);
        results
    }

    fn score(
        &self,
        candidate: MergedCandidate,
        ctx: &GenerationContext,
        top_category: Option<&str>,
    ) -> Option<ScoredResult> {
        let distance_km = candidate
            .distance_km
            .unwrap_or_else(|| haversine_distance(&ctx.location, &candidate.college.coordinate));

        // Text and semantic hits carry no distance of their own
        if distance_km > ctx.filters.max_distance_km {
            return None;
        }

        let course = candidate.course();
        let semantic = candidate
            .per_source_score
            .get(&CandidateSource::Semantic)
            .copied()
            .unwrap_or_else(|| {
                semantic_similarity(&self.knowledge, &ctx.profile, course, &ctx.terms)
            });
        let text = candidate
            .per_source_score
            .get(&CandidateSource::Text)
            .copied()
            .unwrap_or(0.0);

        let breakdown = calculate_breakdown(
            semantic,
            text,
            distance_km,
            candidate.college.rating,
            course.seats,
            &self.weights,
        );

        Some(ScoredResult {
            college: CollegeSummary::from(candidate.college.as_ref()),
            course: course.clone(),
            distance_km,
            rationale: build_rationale(&breakdown, top_category),
            score_breakdown: breakdown,
            sources: candidate.sources.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AptitudeProfile, College, CollegeType, Coordinate, Course, Filters};
    use std::collections::{BTreeMap, BTreeSet};

    fn merged(id: &str, name: &str, distance_km: Option<f64>, lat: f64, rating: f64) -> MergedCandidate {
        let college = Arc::new(College {
            id: id.to_string(),
            name: name.to_string(),
            coordinate: Coordinate::new(lat, 77.59),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            rating,
            college_type: CollegeType::Public,
            courses: vec![Course {
                id: "cs".to_string(),
                name: "Computer Science".to_string(),
                description: String::new(),
                degree: "B.E".to_string(),
                fees: None,
                seats: 60,
                tags: BTreeSet::new(),
                medium: None,
            }],
        });

        let mut sources = BTreeSet::new();
        sources.insert(CandidateSource::Geo);
        let mut per_source_score = BTreeMap::new();
        per_source_score.insert(CandidateSource::Geo, distance_km.unwrap_or(0.0));

        MergedCandidate {
            college,
            course_index: 0,
            distance_km,
            sources,
            per_source_score,
        }
    }

    fn ranker() -> Ranker {
        Ranker::new(ScoringWeights::default(), Arc::new(KnowledgeBase::builtin().unwrap()))
    }

    fn context() -> GenerationContext {
        let kb = KnowledgeBase::builtin().unwrap();
        GenerationContext::new(
            Coordinate::new(12.97, 77.59),
            AptitudeProfile::new().with("logical", 8.0),
            Filters::default(),
            &kb,
            3,
        )
    }

    #[test]
    fn test_breakdown_formula() {
        let b = calculate_breakdown(1.0, 0.5, 0.0, 4.0, 50, &ScoringWeights::default());

        let expected = 0.35 * 1.0 + 0.25 * 0.5 + 0.20 * 1.0 + 0.15 * 0.8 + 0.05 * 0.5;
        assert!((b.final_score - expected).abs() < 1e-9);
        assert_eq!(b.distance, 1.0);
        assert!((b.rating - 0.8).abs() < 1e-12);
        assert_eq!(b.availability, 0.5);
    }

    #[test]
    fn test_breakdown_stays_in_unit_range() {
        let heavy = ScoringWeights {
            semantic: 2.0,
            text: 2.0,
            distance: 2.0,
            rating: 2.0,
            availability: 2.0,
        };
        let b = calculate_breakdown(1.0, 1.0, 0.0, 5.0, 500, &heavy);
        assert!((b.final_score - 1.0).abs() < 1e-9);

        let b = calculate_breakdown(f64::NAN, -3.0, 1e9, -1.0, 0, &ScoringWeights::default());
        assert!(b.final_score >= 0.0 && b.final_score <= 1.0);
    }

    #[test]
    fn test_rationale_thresholds() {
        let b = ScoreBreakdown {
            final_score: 0.9,
            semantic: 0.8,
            text: 0.1,
            distance: 0.9,
            rating: 0.5,
            availability: 0.2,
        };
        assert_eq!(
            build_rationale(&b, Some("logical")),
            "Strong aptitude alignment, nearby; top aptitude: logical"
        );

        let quiet = ScoreBreakdown {
            final_score: 0.1,
            semantic: 0.0,
            text: 0.0,
            distance: 0.1,
            rating: 0.2,
            availability: 0.1,
        };
        assert_eq!(build_rationale(&quiet, Some("logical")), "Recommended based on your profile");
    }

    #[test]
    fn test_rank_prefers_near_and_well_rated() {
        let ctx = context();
        let near = merged("near", "Near College", Some(5.0), 13.01, 4.5);
        let far = merged("far", "Far College", Some(40.0), 13.33, 3.0);

        let results = ranker().rank(vec![far, near], &ctx);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].college.id, "near");
        assert!(results[0].score_breakdown.final_score >= results[1].score_breakdown.final_score);
    }

    #[test]
    fn test_rank_recomputes_missing_distance_and_drops_out_of_radius() {
        let ctx = context();
        // ~1.1km north, distance not supplied by the generator
        let inside = merged("in", "Inside", None, 12.98, 4.0);
        // ~111km north
        let outside = merged("out", "Outside", None, 13.97, 4.0);

        let results = ranker().rank(vec![inside, outside], &ctx);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].college.id, "in");
        assert!(results[0].distance_km > 0.5 && results[0].distance_km < 2.0);
        // Semantic recomputed from the affinity table even without a semantic hit
        assert!(results[0].score_breakdown.semantic > 0.7);
    }

    #[test]
    fn test_ties_broken_by_distance_then_name() {
        let ctx = context();
        let b = merged("b", "Beta", Some(5.0), 13.0, 4.0);
        let a = merged("a", "Alpha", Some(5.0), 13.0, 4.0);

        let results = ranker().rank(vec![b, a], &ctx);

        assert_eq!(results[0].college.name, "Alpha");
        assert_eq!(results[1].college.name, "Beta");
    }
}
