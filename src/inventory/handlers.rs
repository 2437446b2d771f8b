// HTTP handlers for inventory endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::{ApiError, ApiResponse, ErrorResponse};
use crate::inventory::{InventoryError, InventoryQuery, InventoryRecord};
use crate::validation::parse_calendar_date;
use crate::AppState;

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::DatabaseError(message) => ApiError::InternalError(message),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Nightly room counts for a room type
/// GET /api/inventory
#[utoipa::path(
    get,
    path = "/api/inventory",
    params(InventoryQuery),
    responses(
        (status = 200, description = "Nightly inventory records in the range", body = Vec<InventoryRecord>),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_inventory_handler(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<ApiResponse<Vec<InventoryRecord>>>, ApiError> {
    let from = parse_calendar_date(&query.from)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid from date: {}", query.from)))?;
    let to = parse_calendar_date(&query.to)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid to date: {}", query.to)))?;

    let records = state
        .inventory
        .list_range(&query.hotel_code, &query.room_type_code, from, to)
        .await?;

    Ok(Json(ApiResponse::ok(records)))
}
