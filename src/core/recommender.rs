use crate::core::{
    generators::{CandidateGenerator, GenerationContext, GeoGenerator, SemanticGenerator, TextGenerator},
    knowledge::KnowledgeBase,
    merger::merge_candidates,
    pagination::paginate,
    scoring::Ranker,
};
use crate::error::RecommendError;
use crate::models::{
    Candidate, CandidateSource, CandidateSourceCounts, DebugCandidates, DebugResponse, Filters,
    RawCandidate, RecommendationRequest, RecommendationResponse, ResponseMetadata, ScoredResult,
    ScoringWeights, SearchParams,
};
use crate::services::{CacheEntry, CacheKey, CatalogError, CatalogProvider, ResultCache, DEFAULT_TTL};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Tunables of the recommendation pipeline
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    pub geo_limit: usize,
    pub text_limit: usize,
    pub semantic_limit: usize,
    pub semantic_threshold: f64,
    /// Aptitude categories used to derive search terms
    pub top_categories: usize,
    /// Radius used when the requested one yields too few results
    pub relaxed_max_distance_km: f64,
    /// Fewer ranked results than this triggers the relaxed search
    pub fallback_min_results: usize,
    /// Upper bound on each generator's catalog fetch
    pub fetch_timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            geo_limit: 500,
            text_limit: 200,
            semantic_limit: 200,
            semantic_threshold: 0.3,
            top_categories: 3,
            relaxed_max_distance_km: 5000.0,
            fallback_min_results: 1,
            fetch_timeout: Duration::from_secs(3),
            cache_ttl: DEFAULT_TTL,
        }
    }
}

/// Outcome of one generate → merge → rank pass
#[derive(Debug, Clone)]
struct PipelineRun {
    candidates: BTreeMap<CandidateSource, Vec<Candidate>>,
    counts: CandidateSourceCounts,
    results: Vec<ScoredResult>,
}

/// Main recommendation orchestrator
///
/// # Pipeline Stages
/// 1. Cache lookup on (user, rounded location, filters)
/// 2. Geo, text and semantic candidate generation, concurrently
/// 3. Merge by (college, course)
/// 4. Composite scoring and ranking
/// 5. Relaxed-radius retry when nothing survives
/// 6. Cache write and page slicing
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<dyn CatalogProvider>,
    cache: Arc<dyn ResultCache>,
    knowledge: Arc<KnowledgeBase>,
    generators: Vec<Arc<dyn CandidateGenerator>>,
    ranker: Ranker,
    config: RecommenderConfig,
}

impl Recommender {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        cache: Arc<dyn ResultCache>,
        knowledge: Arc<KnowledgeBase>,
        weights: ScoringWeights,
        config: RecommenderConfig,
    ) -> Self {
        let generators: Vec<Arc<dyn CandidateGenerator>> = vec![
            Arc::new(GeoGenerator::new(config.geo_limit)),
            Arc::new(TextGenerator::new(config.text_limit)),
            Arc::new(SemanticGenerator::new(
                Arc::clone(&knowledge),
                config.semantic_limit,
                config.semantic_threshold,
            )),
        ];

        Self {
            catalog,
            cache,
            ranker: Ranker::new(weights, Arc::clone(&knowledge)),
            knowledge,
            generators,
            config,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        self.ranker.weights()
    }

    pub fn knowledge_version(&self) -> &str {
        &self.knowledge.version
    }

    pub fn catalog_name(&self) -> &'static str {
        self.catalog.name()
    }

    /// Generate one page of ranked recommendations
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, RecommendError> {
        request.check()?;

        let key = CacheKey::recommendations(
            request.user_id.as_deref(),
            &request.location,
            &request.filters,
        );

        let (entry, cached) = match self.cached(&key).await {
            Some(entry) => (entry, true),
            None => {
                let (entry, _) = self.compute(&key, request).await;
                let entry = Arc::new(entry);
                if let Err(e) = self.cache.put(Arc::clone(&entry)).await {
                    tracing::warn!("Failed to cache results for {}: {}", key, e);
                }
                (entry, false)
            }
        };

        let response = Self::respond(&entry, request, cached);

        tracing::info!(
            "Returning {} of {} recommendations for {} (page {}, cached: {}, relaxed: {})",
            response.results.len(),
            response.pagination.total,
            request.user_id.as_deref().unwrap_or("anonymous"),
            response.pagination.page,
            cached,
            entry.relaxed
        );

        Ok(response)
    }

    /// Run the pipeline uncached and expose its intermediate candidates
    pub async fn inspect(
        &self,
        request: &RecommendationRequest,
        top_n: usize,
    ) -> Result<DebugResponse, RecommendError> {
        request.check()?;

        let key = CacheKey::recommendations(
            request.user_id.as_deref(),
            &request.location,
            &request.filters,
        );
        let (entry, run) = self.compute(&key, request).await;

        let top = |source: CandidateSource| -> Vec<RawCandidate> {
            run.candidates
                .get(&source)
                .map(|list| list.iter().take(top_n).map(RawCandidate::from).collect())
                .unwrap_or_default()
        };

        Ok(DebugResponse {
            weights: *self.weights(),
            knowledge_version: self.knowledge.version.clone(),
            search_terms: entry_terms(&self.knowledge, &entry),
            top_candidates: DebugCandidates {
                geo: top(CandidateSource::Geo),
                text: top(CandidateSource::Text),
                semantic: top(CandidateSource::Semantic),
            },
            response: Self::respond(&entry, request, false),
        })
    }

    /// Fresh cache entry for `key`, if any. Cache faults read as misses.
    async fn cached(&self, key: &str) -> Option<Arc<CacheEntry>> {
        match self.cache.get(key).await {
            Ok(Some(entry)) if entry.key == key && entry.is_fresh(self.config.cache_ttl, Utc::now()) => {
                tracing::debug!("Serving cached recommendations for {}", key);
                Some(entry)
            }
            Ok(Some(_)) => {
                tracing::debug!("Cached recommendations for {} expired", key);
                if let Err(e) = self.cache.invalidate(key).await {
                    tracing::warn!("Failed to evict stale entry {}: {}", key, e);
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache lookup failed for {}, recomputing: {}", key, e);
                None
            }
        }
    }

    /// Full pipeline including the relaxed-radius fallback
    async fn compute(&self, key: &str, request: &RecommendationRequest) -> (CacheEntry, PipelineRun) {
        let ctx = GenerationContext::new(
            request.location,
            request.aptitude_profile.clone(),
            request.filters.clone(),
            &self.knowledge,
            self.config.top_categories,
        );

        let mut run = self.run_pipeline(&ctx).await;
        let mut effective: Filters = ctx.filters.clone();
        let mut relaxed = false;
        let mut message = None;

        if run.results.len() < self.config.fallback_min_results {
            let widened = ctx.filters.relaxed(self.config.relaxed_max_distance_km);

            if widened.max_distance_km > ctx.filters.max_distance_km {
                tracing::info!(
                    "Only {} results within {} km, retrying with {} km",
                    run.results.len(),
                    ctx.filters.max_distance_km,
                    widened.max_distance_km
                );

                let retry = self.run_pipeline(&ctx.with_filters(widened.clone())).await;
                if retry.results.len() > run.results.len() {
                    message = Some(format!(
                        "No colleges matched within {} km; showing results up to {} km away",
                        ctx.filters.max_distance_km, widened.max_distance_km
                    ));
                    relaxed = true;
                    effective = widened;
                    run = retry;
                }
            }
        }

        if run.results.is_empty() {
            message = Some("No colleges matched the selected filters".to_string());
        }

        let entry = CacheEntry {
            key: key.to_string(),
            created_at: Utc::now(),
            results: run.results.clone(),
            relaxed,
            message,
            counts: run.counts,
            search_params: SearchParams {
                location: request.location,
                filters: effective,
                requested_max_distance_km: request.filters.max_distance_km,
                top_categories: ctx.top_categories.clone(),
                knowledge_version: self.knowledge.version.clone(),
            },
        };

        (entry, run)
    }

    async fn run_pipeline(&self, ctx: &GenerationContext) -> PipelineRun {
        let candidates = self.generate_all(ctx).await;

        let mut counts = CandidateSourceCounts::default();
        for (source, list) in &candidates {
            counts.record(*source, list.len());
        }

        let merged = merge_candidates(candidates.values().cloned());
        counts.merged = merged.len();

        let results = self.ranker.rank(merged, ctx);

        tracing::debug!(
            "Candidates geo={} text={} semantic={} merged={} ranked={}",
            counts.geo,
            counts.text,
            counts.semantic,
            counts.merged,
            results.len()
        );

        PipelineRun {
            candidates,
            counts,
            results,
        }
    }

    /// Fan the generators out on their own tasks and collect whatever succeeds.
    ///
    /// A generator whose catalog fetch fails or times out contributes an empty
    /// list. Dropping the returned future aborts every in-flight task.
    async fn generate_all(&self, ctx: &GenerationContext) -> BTreeMap<CandidateSource, Vec<Candidate>> {
        let shared_ctx = Arc::new(ctx.clone());
        let mut tasks = JoinSet::new();

        for generator in &self.generators {
            let generator = Arc::clone(generator);
            let catalog = Arc::clone(&self.catalog);
            let ctx = Arc::clone(&shared_ctx);
            let fetch_timeout = self.config.fetch_timeout;

            tasks.spawn(async move {
                let source = generator.source();
                let outcome = match timeout(fetch_timeout, catalog.snapshot()).await {
                    Ok(Ok(snapshot)) => Ok(generator.generate(&snapshot, &ctx)),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(CatalogError::Timeout(fetch_timeout)),
                };
                (source, outcome)
            });
        }

        let mut lists: BTreeMap<CandidateSource, Vec<Candidate>> = self
            .generators
            .iter()
            .map(|g| (g.source(), Vec::new()))
            .collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((source, Ok(candidates))) => {
                    lists.insert(source, candidates);
                }
                Ok((source, Err(e))) => {
                    tracing::warn!("{} source unavailable, continuing without it: {}", source, e);
                }
                Err(e) => {
                    tracing::warn!("Candidate generator task failed: {}", e);
                }
            }
        }

        lists
    }

    fn respond(entry: &CacheEntry, request: &RecommendationRequest, cached: bool) -> RecommendationResponse {
        let (results, pagination) = paginate(&entry.results, request.page, request.page_size);

        RecommendationResponse {
            results,
            pagination,
            metadata: ResponseMetadata {
                candidate_source_counts: entry.counts,
                relaxed: entry.relaxed,
                message: entry.message.clone(),
                cached,
                request_id: uuid::Uuid::new_v4().to_string(),
                generated_at: entry.created_at,
                search_params: entry.search_params.clone(),
            },
        }
    }
}

fn entry_terms(knowledge: &KnowledgeBase, entry: &CacheEntry) -> Vec<String> {
    let categories: Vec<&str> = entry
        .search_params
        .top_categories
        .iter()
        .map(String::as_str)
        .collect();
    knowledge.terms_for(&categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AptitudeProfile, College, CollegeType, Coordinate, Course};
    use crate::services::{MemoryCache, StaticCatalog};
    use std::collections::BTreeSet;

    fn create_college(id: &str, name: &str, lat: f64, lon: f64, rating: f64) -> College {
        College {
            id: id.to_string(),
            name: name.to_string(),
            coordinate: Coordinate::new(lat, lon),
            city: "Chennai".to_string(),
            state: "Tamil Nadu".to_string(),
            rating,
            college_type: CollegeType::Private,
            courses: vec![Course {
                id: "cs".to_string(),
                name: "Computer Science".to_string(),
                description: "Programming, algorithms and data".to_string(),
                degree: "B.E".to_string(),
                fees: Some(150_000),
                seats: 120,
                tags: BTreeSet::from(["software".to_string()]),
                medium: Some("English".to_string()),
            }],
        }
    }

    fn create_recommender(colleges: Vec<College>) -> Recommender {
        Recommender::new(
            Arc::new(StaticCatalog::new(colleges)),
            Arc::new(MemoryCache::default()),
            Arc::new(KnowledgeBase::builtin().unwrap()),
            ScoringWeights::default(),
            RecommenderConfig::default(),
        )
    }

    fn create_request() -> RecommendationRequest {
        RecommendationRequest::new(
            Coordinate::new(13.0827, 80.2707),
            AptitudeProfile::new().with("logical", 9.0).with("technical", 6.0),
        )
    }

    #[tokio::test]
    async fn test_recommend_basic() {
        let recommender = create_recommender(vec![
            create_college("a", "Anna Institute", 13.01, 80.23, 4.5),
            create_college("b", "Bay College", 13.20, 80.30, 3.0),
        ]);

        let response = recommender.recommend(&create_request()).await.unwrap();

        assert_eq!(response.pagination.total, 2);
        assert_eq!(response.results[0].college.id, "a");
        assert!(!response.metadata.relaxed);
        assert!(!response.metadata.cached);
        assert_eq!(response.metadata.candidate_source_counts.geo, 2);
        assert_eq!(response.metadata.candidate_source_counts.merged, 2);
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let recommender = create_recommender(vec![create_college("a", "Anna Institute", 13.01, 80.23, 4.5)]);
        let request = create_request().with_user("u1");

        let first = recommender.recommend(&request).await.unwrap();
        let second = recommender.recommend(&request).await.unwrap();

        assert!(!first.metadata.cached);
        assert!(second.metadata.cached);
        assert_eq!(first.results, second.results);
        assert_eq!(first.metadata.generated_at, second.metadata.generated_at);
    }

    #[tokio::test]
    async fn test_fallback_widens_radius() {
        // ~350km from Chennai
        let recommender = create_recommender(vec![create_college("far", "Far College", 10.79, 78.70, 4.0)]);
        let request = create_request();

        let response = recommender.recommend(&request).await.unwrap();

        assert!(response.metadata.relaxed);
        assert_eq!(response.pagination.total, 1);
        assert!(response.metadata.message.is_some());
        assert_eq!(response.metadata.search_params.filters.max_distance_km, 5000.0);
        assert_eq!(response.metadata.search_params.requested_max_distance_km, 50.0);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let recommender = create_recommender(vec![]);
        let request = create_request().with_page(0, 10);

        let result = recommender.recommend(&request).await;
        assert!(matches!(result, Err(RecommendError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_inspect_exposes_raw_candidates() {
        let recommender = create_recommender(vec![create_college("a", "Anna Institute", 13.01, 80.23, 4.5)]);

        let debug = recommender.inspect(&create_request(), 5).await.unwrap();

        assert_eq!(debug.top_candidates.geo.len(), 1);
        assert_eq!(debug.top_candidates.text.len(), 1);
        assert_eq!(debug.top_candidates.semantic.len(), 1);
        assert_eq!(debug.weights, ScoringWeights::default());
        assert!(debug.search_terms.contains(&"computer".to_string()));
        assert!(!debug.response.metadata.cached);
    }
}
