use crate::models::{normalize_tags, Catalog, College, CollegeType, Coordinate, Course};
use crate::services::catalog::{sanitize_colleges, CatalogError, CatalogProvider, SnapshotMemo};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// PostgreSQL-backed college catalog
///
/// Colleges and courses live in two tables (see `migrations/`); courses are
/// returned in `position` order under their college. The assembled catalog
/// is memoized for `refresh`.
pub struct PostgresCatalog {
    pool: PgPool,
    snapshots: SnapshotMemo,
}

impl PostgresCatalog {
    /// Create a new catalog from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        refresh: Duration,
    ) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::from_pool(pool, refresh))
    }

    /// Wrap an existing pool (migrations are the caller's concern)
    pub fn from_pool(pool: PgPool, refresh: Duration) -> Self {
        Self {
            pool,
            snapshots: SnapshotMemo::new(refresh),
        }
    }

    /// Drop the memoized snapshot so the next call reloads
    pub async fn invalidate(&self) {
        self.snapshots.invalidate().await;
    }

    async fn load(&self) -> Result<Catalog, CatalogError> {
        let college_rows = sqlx::query(
            r#"
            SELECT id, name, latitude, longitude, city, state, rating, college_type
            FROM colleges
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let course_rows = sqlx::query(
            r#"
            SELECT college_id, id, name, description, degree, fees, seats, tags, medium
            FROM courses
            ORDER BY college_id, position, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut courses_by_college: HashMap<String, Vec<Course>> = HashMap::new();
        for row in &course_rows {
            let fees: Option<i64> = row.try_get("fees")?;
            let seats: i32 = row.try_get("seats")?;
            let tags: Vec<String> = row.try_get("tags")?;

            courses_by_college
                .entry(row.try_get("college_id")?)
                .or_default()
                .push(Course {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                    degree: row.try_get("degree")?,
                    fees: fees.and_then(|f| u64::try_from(f).ok()),
                    seats: u32::try_from(seats).unwrap_or(0),
                    tags: normalize_tags(tags),
                    medium: row.try_get("medium")?,
                });
        }

        let mut colleges = Vec::with_capacity(college_rows.len());
        for row in &college_rows {
            let id: String = row.try_get("id")?;
            let college_type: String = row.try_get("college_type")?;
            colleges.push(College {
                courses: courses_by_college.remove(&id).unwrap_or_default(),
                id,
                name: row.try_get("name")?,
                coordinate: Coordinate::new(row.try_get("latitude")?, row.try_get("longitude")?),
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                rating: row.try_get("rating")?,
                college_type: CollegeType::from(college_type),
            });
        }

        tracing::debug!(
            "Loaded {} colleges and {} courses from PostgreSQL",
            college_rows.len(),
            course_rows.len()
        );

        Ok(Catalog::new(sanitize_colleges(colleges)))
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, CatalogError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl CatalogProvider for PostgresCatalog {
    async fn snapshot(&self) -> Result<Arc<Catalog>, CatalogError> {
        self.snapshots.get_or_load(self.load()).await
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
