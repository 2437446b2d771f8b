// HTTP handlers for promo code endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{ApiError, ApiResponse, ErrorResponse};
use crate::promotions::{EligibilityQuery, PromoError, UsageCheck};
use crate::AppState;

impl From<PromoError> for ApiError {
    fn from(err: PromoError) -> Self {
        match err {
            PromoError::NotFound(id) => ApiError::NotFound {
                resource: "Promo code".to_string(),
                id: id.to_string(),
            },
            PromoError::DatabaseError(message) => ApiError::InternalError(message),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Whether a customer may use a promo code
/// GET /api/promocodes/{promo_id}/eligibility
#[utoipa::path(
    get,
    path = "/api/promocodes/{promo_id}/eligibility",
    params(
        ("promo_id" = Uuid, Path, description = "Promo code ID"),
        EligibilityQuery
    ),
    responses(
        (status = 200, description = "Eligibility of the customer", body = UsageCheck),
        (status = 400, description = "Missing customer id", body = ErrorResponse),
        (status = 404, description = "Promo code not found", body = ErrorResponse)
    ),
    tag = "promocodes"
)]
pub async fn promo_eligibility_handler(
    State(state): State<AppState>,
    Path(promo_id): Path<Uuid>,
    Query(query): Query<EligibilityQuery>,
) -> Result<Json<ApiResponse<UsageCheck>>, ApiError> {
    if query.customer_id.trim().is_empty() {
        return Err(ApiError::BadRequest("customerId is required".to_string()));
    }

    let check = state
        .promotions
        .can_customer_use(promo_id, &query.customer_id)
        .await?;

    Ok(Json(ApiResponse::ok(check)))
}
