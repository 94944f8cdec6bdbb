use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use validator::Validate;

/// Geographic point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinate {
    #[serde(alias = "latitude")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lng")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both components are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Ownership category of a college
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CollegeType {
    Public,
    Private,
    Deemed,
    #[default]
    Other,
}

impl From<String> for CollegeType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "public" | "government" | "govt" => CollegeType::Public,
            "private" => CollegeType::Private,
            "deemed" => CollegeType::Deemed,
            _ => CollegeType::Other,
        }
    }
}

/// Medium of instruction requested by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Medium {
    #[default]
    Any,
    English,
    Hindi,
    Other(String),
}

impl Medium {
    /// Whether a course taught in `course_medium` satisfies this filter.
    /// Courses with no recorded medium only pass `Any`.
    pub fn matches(&self, course_medium: Option<&str>) -> bool {
        let wanted = match self {
            Medium::Any => return true,
            Medium::English => "english",
            Medium::Hindi => "hindi",
            Medium::Other(value) => value.as_str(),
        };

        match course_medium {
            Some(medium) => medium
                .split(|c: char| c == ',' || c == '/')
                .any(|part| part.trim().eq_ignore_ascii_case(wanted)),
            None => false,
        }
    }
}

impl From<String> for Medium {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "any" => Medium::Any,
            "english" => Medium::English,
            "hindi" => Medium::Hindi,
            other => Medium::Other(other.to_string()),
        }
    }
}

impl From<Medium> for String {
    fn from(value: Medium) -> Self {
        match value {
            Medium::Any => "any".to_string(),
            Medium::English => "english".to_string(),
            Medium::Hindi => "hindi".to_string(),
            Medium::Other(other) => other,
        }
    }
}

/// A course offered by a college. Immutable after catalog load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub degree: String,
    /// Annual fees in whole currency units, `None` when unknown
    #[serde(default)]
    pub fees: Option<u64>,
    #[serde(default)]
    pub seats: u32,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub medium: Option<String>,
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(normalize_tags(raw))
}

/// Lower-case, trim and de-duplicate tags
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// A college with its course list. Owned by the catalog provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct College {
    pub id: String,
    pub name: String,
    #[serde(alias = "location")]
    pub coordinate: Coordinate,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(rename = "type", default)]
    pub college_type: CollegeType,
    pub courses: Vec<Course>,
}

/// Immutable snapshot of every college served by a catalog provider
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    colleges: Vec<Arc<College>>,
}

impl Catalog {
    pub fn new(colleges: Vec<College>) -> Self {
        Self {
            colleges: colleges.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn colleges(&self) -> &[Arc<College>] {
        &self.colleges
    }

    pub fn len(&self) -> usize {
        self.colleges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colleges.is_empty()
    }

    pub fn course_count(&self) -> usize {
        self.colleges.iter().map(|c| c.courses.len()).sum()
    }

    /// Every (college, course index) pair in catalog order
    pub fn courses(&self) -> impl Iterator<Item = (&Arc<College>, usize)> {
        self.colleges
            .iter()
            .flat_map(|college| (0..college.courses.len()).map(move |i| (college, i)))
    }
}

/// Per-category aptitude scores produced by the quiz flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct AptitudeProfile(BTreeMap<String, f64>);

impl From<BTreeMap<String, f64>> for AptitudeProfile {
    fn from(scores: BTreeMap<String, f64>) -> Self {
        scores.into_iter().collect()
    }
}

impl From<AptitudeProfile> for BTreeMap<String, f64> {
    fn from(profile: AptitudeProfile) -> Self {
        profile.0
    }
}

impl AptitudeProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: &str, score: f64) -> Self {
        self.insert(category, score);
        self
    }

    pub fn insert(&mut self, category: &str, score: f64) {
        self.0.insert(category.trim().to_lowercase(), score);
    }

    /// Score for a category; unknown, negative or non-finite scores read as zero
    pub fn score(&self, category: &str) -> f64 {
        self.0
            .get(category)
            .copied()
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|s| !(s.is_finite() && *s > 0.0))
    }

    /// Sum of all usable scores
    pub fn total(&self) -> f64 {
        self.0.keys().map(|k| self.score(k)).sum()
    }

    /// Categories with a positive score, highest first, ties broken by name
    pub fn top_categories(&self, n: usize) -> Vec<&str> {
        let mut ranked: Vec<(&str, f64)> = self
            .0
            .keys()
            .map(|k| (k.as_str(), self.score(k)))
            .filter(|(_, s)| *s > 0.0)
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().take(n).map(|(k, _)| k).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.keys().map(|k| (k.as_str(), self.score(k)))
    }
}

impl FromIterator<(String, f64)> for AptitudeProfile {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut profile = AptitudeProfile::new();
        for (category, score) in iter {
            profile.insert(&category, score);
        }
        profile
    }
}

/// Search filters supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default = "default_max_distance_km")]
    #[validate(range(exclusive_min = 0.0))]
    pub max_distance_km: f64,
    #[serde(default)]
    pub max_fees: Option<u64>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 5.0))]
    pub min_rating: f64,
    #[serde(default)]
    pub medium: Medium,
}

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 50.0;

fn default_max_distance_km() -> f64 {
    DEFAULT_MAX_DISTANCE_KM
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            max_fees: None,
            min_rating: 0.0,
            medium: Medium::Any,
        }
    }
}

impl Filters {
    /// Same filters with only the radius widened
    pub fn relaxed(&self, max_distance_km: f64) -> Self {
        Self {
            max_distance_km: self.max_distance_km.max(max_distance_km),
            ..self.clone()
        }
    }
}

/// Which generator produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Geo,
    Text,
    Semantic,
}

impl CandidateSource {
    pub const ALL: [CandidateSource; 3] = [
        CandidateSource::Geo,
        CandidateSource::Text,
        CandidateSource::Semantic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Geo => "geo",
            CandidateSource::Text => "text",
            CandidateSource::Semantic => "semantic",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (college id, course id)
pub type CandidateKey = (String, String);

/// A single generator hit. Lives for one pipeline run.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub college: Arc<College>,
    pub course_index: usize,
    pub source: CandidateSource,
    /// Distance in km for geo hits, relevance in [0, 1] otherwise
    pub score: f64,
    pub distance_km: Option<f64>,
}

impl Candidate {
    pub fn course(&self) -> &Course {
        &self.college.courses[self.course_index]
    }

    pub fn key(&self) -> CandidateKey {
        (self.college.id.clone(), self.course().id.clone())
    }
}

/// Union of the generator hits for one (college, course) pair
#[derive(Debug, Clone)]
pub struct MergedCandidate {
    pub college: Arc<College>,
    pub course_index: usize,
    pub distance_km: Option<f64>,
    pub sources: BTreeSet<CandidateSource>,
    pub per_source_score: BTreeMap<CandidateSource, f64>,
}

impl MergedCandidate {
    pub fn course(&self) -> &Course {
        &self.college.courses[self.course_index]
    }
}

/// Weights of the composite score. Defaults sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub semantic: f64,
    pub text: f64,
    pub distance: f64,
    pub rating: f64,
    pub availability: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.semantic + self.text + self.distance + self.rating + self.availability
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            semantic: 0.35,
            text: 0.25,
            distance: 0.20,
            rating: 0.15,
            availability: 0.05,
        }
    }
}

/// Sub-scores behind a result, all in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(rename = "final")]
    pub final_score: f64,
    pub semantic: f64,
    pub text: f64,
    pub distance: f64,
    pub rating: f64,
    pub availability: f64,
}

/// College fields returned alongside a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeSummary {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    pub city: String,
    pub state: String,
    pub rating: f64,
    #[serde(rename = "type")]
    pub college_type: CollegeType,
}

impl From<&College> for CollegeSummary {
    fn from(college: &College) -> Self {
        Self {
            id: college.id.clone(),
            name: college.name.clone(),
            coordinate: college.coordinate,
            city: college.city.clone(),
            state: college.state.clone(),
            rating: college.rating,
            college_type: college.college_type,
        }
    }
}

/// One ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    pub college: CollegeSummary,
    pub course: Course,
    pub distance_km: f64,
    pub score_breakdown: ScoreBreakdown,
    pub sources: Vec<CandidateSource>,
    pub rationale: String,
}

/// Candidate counts per generator plus the merged total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSourceCounts {
    pub geo: usize,
    pub text: usize,
    pub semantic: usize,
    pub merged: usize,
}

impl CandidateSourceCounts {
    pub fn record(&mut self, source: CandidateSource, count: usize) {
        match source {
            CandidateSource::Geo => self.geo = count,
            CandidateSource::Text => self.text = count,
            CandidateSource::Semantic => self.semantic = count,
        }
    }
}

/// Page position within a full ranked list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}
