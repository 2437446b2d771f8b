// Application assembly: shared state, storage wiring, router and OpenAPI document

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, StorageBackend};
use crate::db;
use crate::error::{ApiResponse, ErrorResponse};
use crate::inventory::{
    handlers::list_inventory_handler, InMemoryInventoryRepository, InventoryManager,
    InventoryRecord, InventoryRepository, PgInventoryRepository,
};
use crate::metrics::{MetricsSnapshot, OperationCounts, OrchestrationMetrics};
use crate::promotions::{
    handlers::promo_eligibility_handler, DiscountType, InMemoryPromoRepository,
    PgPromoRepository, PromoCode, PromoRepository, PromoUsageTracker, UsageCheck,
};
use crate::properties::{
    InMemoryPropertyRepository, PgPropertyRepository, Property, PropertyRegistry,
    PropertyRepository,
};
use crate::providers::{ProviderAdapters, ProviderError, ProviderSettings};
use crate::reservations::{
    handlers::{
        amend_reservation_handler, cancel_reservation_handler, create_reservation_handler,
        get_reservation_handler, list_operations_handler,
    },
    AgeCodeSummary, AmendReservationInput, AppliedPromo, AttemptStatus, BookingDetails,
    CancelReservationInput, CanonicalReservation, CreateReservationRequest,
    FlatReservationRequest, Guest, GuestInput, GuestType, InMemoryReservationStore,
    NestedReservationRequest, OperationKind, OperationLogEntry, PaymentSummary,
    PgReservationStore, PromoInput, ReservationIdData, ReservationOrchestrator,
    ReservationStatus, ReservationStore, RoomLine,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ReservationOrchestrator,
    pub reservations: Arc<dyn ReservationStore>,
    pub inventory: InventoryManager,
    pub promotions: PromoUsageTracker,
    pub metrics: OrchestrationMetrics,
}

/// Errors that stop the service from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("DATABASE_URL is required for the postgres storage backend")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to read seed file {path}: {source}")]
    SeedIo {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    SeedFormat(#[from] serde_json::Error),

    #[error("Failed to load seed data: {0}")]
    Seed(String),

    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),
}

/// One implementation of every storage seam
#[derive(Clone)]
pub struct Repositories {
    pub properties: Arc<dyn PropertyRepository>,
    pub reservations: Arc<dyn ReservationStore>,
    pub inventory: Arc<dyn InventoryRepository>,
    pub promos: Arc<dyn PromoRepository>,
}

impl Repositories {
    pub fn postgres(pool: db::DbPool) -> Self {
        Self {
            properties: Arc::new(PgPropertyRepository::new(pool.clone())),
            reservations: Arc::new(PgReservationStore::new(pool.clone())),
            inventory: Arc::new(PgInventoryRepository::new(pool.clone())),
            promos: Arc::new(PgPromoRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            properties: Arc::new(InMemoryPropertyRepository::new()),
            reservations: Arc::new(InMemoryReservationStore::new()),
            inventory: Arc::new(InMemoryInventoryRepository::new()),
            promos: Arc::new(InMemoryPromoRepository::new()),
        }
    }
}

/// Reference data for the memory backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedData {
    pub properties: Vec<Property>,
    pub inventory: Vec<InventoryRecord>,
    pub promo_codes: Vec<PromoCode>,
}

impl SeedData {
    pub fn from_file(path: &str) -> Result<Self, StartupError> {
        let raw = std::fs::read_to_string(path).map_err(|source| StartupError::SeedIo {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn load_into(&self, repositories: &Repositories) -> Result<(), StartupError> {
        for property in &self.properties {
            repositories
                .properties
                .upsert(property)
                .await
                .map_err(|e| StartupError::Seed(e.to_string()))?;
        }
        for record in &self.inventory {
            repositories
                .inventory
                .upsert(record)
                .await
                .map_err(|e| StartupError::Seed(e.to_string()))?;
        }
        for promo in &self.promo_codes {
            repositories
                .promos
                .upsert(promo)
                .await
                .map_err(|e| StartupError::Seed(e.to_string()))?;
        }

        tracing::info!(
            properties = self.properties.len(),
            inventory = self.inventory.len(),
            promo_codes = self.promo_codes.len(),
            "Seed data loaded"
        );
        Ok(())
    }
}

/// Connect storage for the configured backend and wire the services together
pub async fn build_state(config: &AppConfig) -> Result<AppState, StartupError> {
    let repositories = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(StartupError::MissingDatabaseUrl)?;

            tracing::info!("Connecting to database...");
            let pool = db::create_pool(url, config.database_max_connections).await?;
            db::run_migrations(&pool).await?;

            Repositories::postgres(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let repositories = Repositories::in_memory();
            if let Some(path) = &config.memory_seed_path {
                SeedData::from_file(path)?.load_into(&repositories).await?;
            }
            repositories
        }
    };

    assemble(config, repositories)
}

/// Build the services on top of already connected repositories
pub fn assemble(config: &AppConfig, repositories: Repositories) -> Result<AppState, StartupError> {
    let adapters = ProviderAdapters::from_settings(ProviderSettings::from(config))?;
    let inventory = InventoryManager::new(repositories.inventory);
    let promotions = PromoUsageTracker::new(repositories.promos);
    let metrics = OrchestrationMetrics::new();

    let orchestrator = ReservationOrchestrator::new(
        PropertyRegistry::new(repositories.properties),
        repositories.reservations.clone(),
        adapters,
        inventory.clone(),
        promotions.clone(),
        metrics.clone(),
    )
    .with_legacy_default_endpoint(config.legacy_xml.default_endpoint.clone());

    Ok(AppState {
        orchestrator,
        reservations: repositories.reservations,
        inventory,
        promotions,
        metrics,
    })
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "system"
)]
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Orchestration counters since startup
#[utoipa::path(
    get,
    path = "/api/metrics",
    responses((status = 200, description = "Counters per operation and provider latency", body = MetricsSnapshot)),
    tag = "system"
)]
pub async fn metrics_handler(State(state): State<AppState>) -> Json<ApiResponse<MetricsSnapshot>> {
    Json(ApiResponse::ok(state.metrics.snapshot()))
}

/// OpenAPI documentation for the orchestration API
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::reservations::handlers::create_reservation_handler,
        crate::reservations::handlers::amend_reservation_handler,
        crate::reservations::handlers::cancel_reservation_handler,
        crate::reservations::handlers::get_reservation_handler,
        crate::reservations::handlers::list_operations_handler,
        crate::inventory::handlers::list_inventory_handler,
        crate::promotions::handlers::promo_eligibility_handler,
        metrics_handler,
        health_handler,
    ),
    components(schemas(
        CreateReservationRequest,
        NestedReservationRequest,
        FlatReservationRequest,
        BookingDetails,
        GuestInput,
        PromoInput,
        AgeCodeSummary,
        AmendReservationInput,
        CancelReservationInput,
        ReservationIdData,
        CanonicalReservation,
        ReservationStatus,
        Guest,
        GuestType,
        RoomLine,
        PaymentSummary,
        AppliedPromo,
        OperationLogEntry,
        OperationKind,
        AttemptStatus,
        InventoryRecord,
        UsageCheck,
        DiscountType,
        MetricsSnapshot,
        OperationCounts,
        ErrorResponse,
    )),
    tags(
        (name = "reservations", description = "Reservation create, amend and cancel across PMS providers"),
        (name = "inventory", description = "Nightly room inventory"),
        (name = "promocodes", description = "Promo code eligibility"),
        (name = "system", description = "Health and metrics")
    ),
    info(
        title = "PMS Reservation Orchestrator API",
        version = "0.1.0",
        description = "Routes hotel reservations to the property's PMS and keeps inventory, promo usage and the audit log consistent"
    )
)]
pub struct ApiDoc;

/// Creates and configures the application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/reservations", post(create_reservation_handler))
        .route("/api/reservations/amend", put(amend_reservation_handler))
        .route("/api/reservations/cancel", post(cancel_reservation_handler))
        .route("/api/reservations/:reservation_id", get(get_reservation_handler))
        .route(
            "/api/reservations/:reservation_id/operations",
            get(list_operations_handler),
        )
        .route("/api/inventory", get(list_inventory_handler))
        .route(
            "/api/promocodes/:promo_id/eligibility",
            get(promo_eligibility_handler),
        )
        .layer(cors)
        .with_state(state)
}
