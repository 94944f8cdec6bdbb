use crate::models::{normalize_tags, Catalog, College};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching the college catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to read catalog file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Catalog fetch timed out after {0:?}")]
    Timeout(Duration),

    /// A load failure observed by several concurrent callers at once
    #[error(transparent)]
    Shared(Arc<CatalogError>),
}

/// Read-only access to the college/course snapshot.
///
/// The recommender treats a provider as a pure "give me all colleges"
/// function; any failure only degrades the generator that asked.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn snapshot(&self) -> Result<Arc<Catalog>, CatalogError>;

    /// Short label for logs
    fn name(&self) -> &'static str;
}

const SNAPSHOT_KEY: &str = "catalog";

/// Time-bounded memo for a provider's parsed catalog.
///
/// Concurrent callers that miss together wait on a single load, so the
/// generators of one request (and of parallel requests) share one fetch.
/// Failed loads are not memoized.
pub struct SnapshotMemo {
    snapshots: moka::future::Cache<&'static str, Arc<Catalog>>,
}

impl SnapshotMemo {
    pub fn new(refresh: Duration) -> Self {
        let snapshots = moka::future::CacheBuilder::new(1)
            .time_to_live(refresh)
            .build();

        Self { snapshots }
    }

    /// Return the memoized snapshot or run `load` to produce one
    pub async fn get_or_load<F>(&self, load: F) -> Result<Arc<Catalog>, CatalogError>
    where
        F: Future<Output = Result<Catalog, CatalogError>>,
    {
        self.snapshots
            .try_get_with(SNAPSHOT_KEY, async move { load.await.map(Arc::new) })
            .await
            .map_err(|err| Arc::try_unwrap(err).unwrap_or_else(CatalogError::Shared))
    }

    pub async fn invalidate(&self) {
        self.snapshots.invalidate(&SNAPSHOT_KEY).await;
    }
}

/// Drop colleges that break catalog invariants and normalize the rest
pub fn sanitize_colleges(colleges: Vec<College>) -> Vec<College> {
    colleges
        .into_iter()
        .filter_map(|mut college| {
            if college.courses.is_empty() {
                tracing::warn!("Skipping college {} with no courses", college.id);
                return None;
            }
            if !college.coordinate.is_valid() {
                tracing::warn!(
                    "Skipping college {} with invalid coordinate ({}, {})",
                    college.id,
                    college.coordinate.lat,
                    college.coordinate.lon
                );
                return None;
            }
            if !(0.0..=5.0).contains(&college.rating) {
                tracing::warn!("Clamping rating {} of college {}", college.rating, college.id);
                college.rating = if college.rating.is_finite() {
                    college.rating.clamp(0.0, 5.0)
                } else {
                    0.0
                };
            }
            for course in &mut college.courses {
                course.tags = normalize_tags(&course.tags);
            }
            Some(college)
        })
        .collect()
}

/// Parse a catalog payload.
///
/// Accepts a bare array of colleges, or an object holding the array under
/// `documents` or `colleges`. Each document may nest its fields under `data`.
/// Malformed documents are skipped.
pub fn parse_colleges(json: Value) -> Result<Vec<College>, CatalogError> {
    let documents = match json {
        Value::Array(items) => items,
        Value::Object(mut map) => match map
            .remove("documents")
            .or_else(|| map.remove("colleges"))
        {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(CatalogError::InvalidResponse(
                    "Missing documents array".into(),
                ))
            }
        },
        _ => {
            return Err(CatalogError::InvalidResponse(
                "Expected an array or object".into(),
            ))
        }
    };

    let colleges = documents
        .into_iter()
        .filter_map(|doc| {
            let data = match doc {
                Value::Object(mut map) => match map.remove("data") {
                    Some(inner @ Value::Object(_)) => inner,
                    Some(other) => {
                        map.insert("data".to_string(), other);
                        Value::Object(map)
                    }
                    None => Value::Object(map),
                },
                other => other,
            };
            match serde_json::from_value::<College>(data) {
                Ok(college) => Some(college),
                Err(e) => {
                    tracing::warn!("Skipping malformed college document: {}", e);
                    None
                }
            }
        })
        .collect();

    Ok(colleges)
}

/// Catalog held entirely in memory
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    catalog: Arc<Catalog>,
}

impl StaticCatalog {
    pub fn new(colleges: Vec<College>) -> Self {
        Self {
            catalog: Arc::new(Catalog::new(sanitize_colleges(colleges))),
        }
    }

    /// Load a JSON catalog file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let json: Value = serde_json::from_str(&raw)?;
        let catalog = Self::new(parse_colleges(json)?);

        tracing::info!(
            "Loaded catalog from {} ({} colleges, {} courses)",
            path.as_ref().display(),
            catalog.catalog.len(),
            catalog.catalog.course_count()
        );

        Ok(catalog)
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn snapshot(&self) -> Result<Arc<Catalog>, CatalogError> {
        Ok(Arc::clone(&self.catalog))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
