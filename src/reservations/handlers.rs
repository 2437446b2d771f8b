// HTTP handlers for reservation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{ApiResponse, ErrorResponse};
use crate::reservations::{
    AmendReservationInput, CancelReservationInput, CanonicalReservation,
    CreateReservationRequest, OperationLogEntry, OrchestrationError, ReservationIdData,
};
use crate::AppState;

/// Handler for POST /api/reservations
/// Creates a reservation with the provider that owns the property
#[utoipa::path(
    post,
    path = "/api/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation confirmed", body = ReservationIdData),
        (status = 400, description = "Invalid booking details", body = ErrorResponse),
        (status = 404, description = "Property not found", body = ErrorResponse),
        (status = 409, description = "Inventory or promo code conflict", body = ErrorResponse),
        (status = 500, description = "Provider or storage failure", body = ErrorResponse),
        (status = 501, description = "Channel manager properties are not supported", body = ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn create_reservation_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationIdData>>), OrchestrationError> {
    let (property_id, details) = request.into_parts();
    tracing::debug!(%property_id, "Creating reservation");

    let reservation_id = state
        .orchestrator
        .create_reservation(property_id, details)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ReservationIdData { reservation_id })),
    ))
}

/// Handler for PUT /api/reservations/amend
/// Moves a confirmed reservation to new dates
#[utoipa::path(
    put,
    path = "/api/reservations/amend",
    request_body = AmendReservationInput,
    responses(
        (status = 200, description = "Reservation amended", body = ReservationIdData),
        (status = 400, description = "Invalid dates, past check-in or wrong status", body = ErrorResponse),
        (status = 404, description = "Property or reservation not found", body = ErrorResponse),
        (status = 500, description = "Provider or storage failure", body = ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn amend_reservation_handler(
    State(state): State<AppState>,
    Json(input): Json<AmendReservationInput>,
) -> Result<Json<ApiResponse<ReservationIdData>>, OrchestrationError> {
    let reservation_id = state.orchestrator.amend_reservation(input).await?;
    Ok(Json(ApiResponse::ok(ReservationIdData { reservation_id })))
}

/// Handler for POST /api/reservations/cancel
/// Cancels a reservation and returns its rooms to inventory
#[utoipa::path(
    post,
    path = "/api/reservations/cancel",
    request_body = CancelReservationInput,
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationIdData),
        (status = 400, description = "Past check-in or already cancelled", body = ErrorResponse),
        (status = 404, description = "Property or reservation not found", body = ErrorResponse),
        (status = 500, description = "Provider or storage failure", body = ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn cancel_reservation_handler(
    State(state): State<AppState>,
    Json(input): Json<CancelReservationInput>,
) -> Result<Json<ApiResponse<ReservationIdData>>, OrchestrationError> {
    let reservation_id = state.orchestrator.cancel_reservation(input).await?;
    Ok(Json(ApiResponse::ok(ReservationIdData { reservation_id })))
}

/// Handler for GET /api/reservations/{reservation_id}
#[utoipa::path(
    get,
    path = "/api/reservations/{reservation_id}",
    params(("reservation_id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Stored reservation", body = CanonicalReservation),
        (status = 404, description = "Reservation not found", body = ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn get_reservation_handler(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
) -> Result<Json<ApiResponse<CanonicalReservation>>, OrchestrationError> {
    let reservation = state
        .reservations
        .find_by_id(&reservation_id)
        .await?
        .ok_or(OrchestrationError::ReservationNotFound(reservation_id))?;

    Ok(Json(ApiResponse::ok(reservation)))
}

/// Handler for GET /api/reservations/{reservation_id}/operations
/// Audit trail of every attempt made for the reservation, oldest first
#[utoipa::path(
    get,
    path = "/api/reservations/{reservation_id}/operations",
    params(("reservation_id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Operation log entries", body = Vec<OperationLogEntry>),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn list_operations_handler(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<OperationLogEntry>>>, OrchestrationError> {
    let entries = state
        .reservations
        .logs_for_reservation(&reservation_id)
        .await?;
    Ok(Json(ApiResponse::ok(entries)))
}
