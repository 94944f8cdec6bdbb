use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use campus_match::config::{CatalogSource, LogFormat, Settings};
use campus_match::core::{KnowledgeBase, Recommender};
use campus_match::models::{ErrorResponse, ScoringWeights};
use campus_match::routes::{self, AppState};
use campus_match::services::{
    CatalogProvider, HttpCatalog, MemoryCache, PostgresCatalog, ResultCache, StaticCatalog, TieredCache,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for payload errors
#[derive(Debug)]
pub struct JsonError(ErrorResponse);

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.0.error, self.0.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(&self.0)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError(ErrorResponse {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    })
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError(ErrorResponse {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    })
    .into()
}

fn init_tracing(settings: &Settings) {
    // LOG_LEVEL / LOG_FORMAT win over the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = match std::env::var("LOG_FORMAT") {
        Ok(value) => value.parse::<LogFormat>().unwrap_or_else(|err| {
            eprintln!("Ignoring LOG_FORMAT: {}", err);
            settings.logging.format
        }),
        Err(_) => settings.logging.format,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn build_catalog(settings: &Settings) -> std::io::Result<Arc<dyn CatalogProvider>> {
    let catalog = &settings.catalog;

    let provider: Arc<dyn CatalogProvider> = match catalog.source {
        CatalogSource::File => Arc::new(
            StaticCatalog::from_json_file(&catalog.path)
                .map_err(|e| startup_error("Failed to load catalog file", e))?,
        ),
        CatalogSource::Http => {
            let endpoint = catalog
                .endpoint
                .clone()
                .ok_or_else(|| startup_error("Invalid catalog settings", "catalog.endpoint is required"))?;
            Arc::new(
                HttpCatalog::new(endpoint, catalog.api_key.clone(), catalog.fetch_timeout(), catalog.refresh())
                    .map_err(|e| startup_error("Failed to build catalog client", e))?,
            )
        }
        CatalogSource::Postgres => {
            let url = catalog
                .database_url
                .clone()
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .ok_or_else(|| startup_error("Invalid catalog settings", "catalog.database_url is required"))?;
            Arc::new(
                PostgresCatalog::new(
                    &url,
                    catalog.max_connections.unwrap_or(10),
                    catalog.min_connections.unwrap_or(1),
                    Duration::from_secs(5),
                    catalog.refresh(),
                )
                .await
                .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
            )
        }
    };

    info!("Catalog provider initialized ({})", provider.name());
    Ok(provider)
}

async fn build_cache(settings: &Settings) -> Arc<dyn ResultCache> {
    let ttl = Duration::from_secs(settings.cache.ttl_secs);
    let l1_cache_size = settings.cache.l1_cache_size;

    if let Some(redis_url) = &settings.cache.redis_url {
        match TieredCache::new(redis_url, l1_cache_size, ttl).await {
            Ok(cache) => {
                info!("Tiered cache initialized (L1: {} entries, TTL: {}s)", l1_cache_size, ttl.as_secs());
                return Arc::new(cache);
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), falling back to in-process cache", e);
            }
        }
    }

    info!("In-process cache initialized ({} entries, TTL: {}s)", l1_cache_size, ttl.as_secs());
    Arc::new(MemoryCache::new(l1_cache_size, ttl))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_tracing(&settings);

    info!("Starting campus-match recommendation service...");

    let knowledge = match &settings.knowledge.path {
        Some(path) => KnowledgeBase::load(path),
        None => KnowledgeBase::builtin(),
    }
    .map_err(|e| startup_error("Failed to load knowledge base", e))?;

    info!("Knowledge base {} loaded", knowledge.version);

    let catalog = build_catalog(&settings).await?;
    let cache = build_cache(&settings).await;

    let weights = ScoringWeights::from(&settings.scoring.weights);
    let recommender = Recommender::new(
        catalog,
        cache,
        Arc::new(knowledge),
        weights,
        settings.recommender_config(),
    );

    info!("Recommender initialized with weights: {:?}", weights);

    let app_state = AppState {
        recommender,
        debug_top_n: settings.matching.debug_top_n,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
