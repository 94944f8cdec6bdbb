use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use crate::core::Recommender;
use crate::error::RecommendError;
use crate::models::{DebugQuery, ErrorResponse, HealthResponse, RecommendationRequest};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub recommender: Recommender,
    /// `topN` used by the debug endpoint when the query omits it
    pub debug_top_n: usize,
}

impl AppState {
    pub fn new(recommender: Recommender) -> Self {
        Self {
            recommender,
            debug_top_n: 10,
        }
    }
}

/// Configure all recommendation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/recommendations", web::post().to(recommend))
        .route("/recommendations/debug", web::post().to(inspect));
}

fn error_response(err: &RecommendError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(ErrorResponse {
        error: err.kind().to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        knowledge_version: state.recommender.knowledge_version().to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Recommendations endpoint
///
/// POST /api/v1/recommendations
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "location": {"lat": 28.61, "lon": 77.20},
///   "aptitudeProfile": {"logical": 8, "verbal": 5},
///   "filters": {"maxDistanceKm": 50, "maxFees": 200000, "minRating": 3.5, "medium": "english"},
///   "page": 1,
///   "pageSize": 20
/// }
/// ```
async fn recommend(
    state: web::Data<AppState>,
    req: web::Json<RecommendationRequest>,
) -> impl Responder {
    match state.recommender.recommend(&req).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            tracing::info!("Rejected recommendation request: {}", e);
            error_response(&e)
        }
    }
}

/// Debug inspection endpoint
///
/// POST /api/v1/recommendations/debug?topN=10
///
/// Same body as `/recommendations`; the result is never cached.
async fn inspect(
    state: web::Data<AppState>,
    query: web::Query<DebugQuery>,
    req: web::Json<RecommendationRequest>,
) -> impl Responder {
    let top_n = query.top_n.unwrap_or(state.debug_top_n);

    match state.recommender.inspect(&req, top_n).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            tracing::info!("Rejected debug request: {}", e);
            error_response(&e)
        }
    }
}
