use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use crate::error::{log_failure, ErrorResponse};
use crate::inventory::InventoryError;
use crate::promotions::PromoError;
use crate::properties::RegistryError;
use crate::providers::ProviderError;
use crate::reservations::{AttemptStatus, OperationKind, RoutingError};
use crate::transform::TransformError;

/// Error types for the reservation store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Side-system failure around a provider call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsistencyError {
    #[error(transparent)]
    Inventory(InventoryError),

    #[error(transparent)]
    Promo(PromoError),
}

impl ConsistencyError {
    /// True when the side system itself failed rather than refusing the booking
    fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ConsistencyError::Inventory(InventoryError::DatabaseError(_))
                | ConsistencyError::Promo(PromoError::DatabaseError(_))
        )
    }
}

impl From<InventoryError> for ConsistencyError {
    fn from(err: InventoryError) -> Self {
        ConsistencyError::Inventory(err)
    }
}

impl From<PromoError> for ConsistencyError {
    fn from(err: PromoError) -> Self {
        ConsistencyError::Promo(err)
    }
}

/// Failure of one create, amend or cancel attempt
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Validation(#[from] TransformError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("{operation} failed at provider {provider} for property {property_id}: {source}")]
    Provider {
        property_id: Uuid,
        operation: OperationKind,
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Reservation {reservation_id} can no longer be changed: check-in was {check_in}")]
    PastCheckIn {
        reservation_id: String,
        check_in: NaiveDate,
    },

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Reservation {0} is already confirmed")]
    AlreadyConfirmed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<RegistryError> for OrchestrationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => RoutingError::PropertyNotFound(id).into(),
            RegistryError::DatabaseError(message) => StoreError::Database(message).into(),
        }
    }
}

impl OrchestrationError {
    /// Machine-readable discriminator returned to callers
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestrationError::Validation(_) => "VALIDATION_ERROR",
            OrchestrationError::Routing(err) => err.kind(),
            OrchestrationError::Provider { .. } => "PROVIDER_ERROR",
            OrchestrationError::Consistency(_) => "CONSISTENCY_ERROR",
            OrchestrationError::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            OrchestrationError::PastCheckIn { .. } => "PAST_CHECK_IN",
            OrchestrationError::InvalidTransition(_) => "INVALID_TRANSITION",
            OrchestrationError::AlreadyConfirmed(_) => "ALREADY_CONFIRMED",
            OrchestrationError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            OrchestrationError::Validation(TransformError::Validation(_))
            | OrchestrationError::PastCheckIn { .. }
            | OrchestrationError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            OrchestrationError::Validation(TransformError::Serialization(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            OrchestrationError::Routing(RoutingError::PropertyNotFound(_))
            | OrchestrationError::ReservationNotFound(_) => StatusCode::NOT_FOUND,
            OrchestrationError::Routing(RoutingError::NotImplemented(_)) => {
                StatusCode::NOT_IMPLEMENTED
            }
            OrchestrationError::Consistency(err) if err.is_infrastructure() => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            OrchestrationError::Consistency(_) | OrchestrationError::AlreadyConfirmed(_) => {
                StatusCode::CONFLICT
            }
            OrchestrationError::Routing(_)
            | OrchestrationError::Provider { .. }
            | OrchestrationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// How the attempt is recorded in the operation log
    ///
    /// Anything refused before a provider could have been called is a rejection.
    pub fn attempt_status(&self) -> AttemptStatus {
        match self {
            OrchestrationError::Provider { .. }
            | OrchestrationError::Consistency(_)
            | OrchestrationError::Storage(_) => AttemptStatus::Failed,
            OrchestrationError::Validation(TransformError::Serialization(_)) => {
                AttemptStatus::Failed
            }
            _ => AttemptStatus::Rejected,
        }
    }

    /// Message shown to callers; storage details stay in the logs
    fn public_message(&self) -> String {
        match self {
            OrchestrationError::Storage(_)
            | OrchestrationError::Validation(TransformError::Serialization(_)) => {
                "An internal server error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for OrchestrationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();
        log_failure(status, kind, &self.to_string());

        let mut body = ErrorResponse::new(kind, self.public_message());
        match &self {
            OrchestrationError::Validation(err @ TransformError::Validation(_)) => {
                body = body.with_details(json!({ "violations": err.violations() }));
            }
            OrchestrationError::Provider {
                property_id,
                operation,
                provider,
                source,
            } => {
                body = body.with_details(json!({
                    "propertyId": property_id,
                    "operation": operation,
                    "provider": provider,
                    "providerErrorKind": source.kind(),
                }));
            }
            _ => {}
        }
        body.into_response_with(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (
                OrchestrationError::Validation(TransformError::single("guests", "missing")),
                StatusCode::BAD_REQUEST,
            ),
            (
                OrchestrationError::Routing(RoutingError::PropertyNotFound(Uuid::nil())),
                StatusCode::NOT_FOUND,
            ),
            (
                OrchestrationError::Routing(RoutingError::NotImplemented("ChannelManager".into())),
                StatusCode::NOT_IMPLEMENTED,
            ),
            (
                OrchestrationError::Routing(RoutingError::UnsupportedProvider("Opera".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                OrchestrationError::Consistency(ConsistencyError::Promo(PromoError::LimitExceeded(
                    Uuid::nil(),
                ))),
                StatusCode::CONFLICT,
            ),
            (
                OrchestrationError::Consistency(ConsistencyError::Inventory(
                    InventoryError::DatabaseError("down".into()),
                )),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                OrchestrationError::PastCheckIn {
                    reservation_id: "RES-1".into(),
                    check_in: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                OrchestrationError::AlreadyConfirmed("RES-1".into()),
                StatusCode::CONFLICT,
            ),
            (
                OrchestrationError::ReservationNotFound("RES-1".into()),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "{}", err);
        }
    }

    #[test]
    fn test_attempt_status_classification() {
        assert_eq!(
            OrchestrationError::ReservationNotFound("RES-1".into()).attempt_status(),
            AttemptStatus::Rejected
        );
        assert_eq!(
            OrchestrationError::Provider {
                property_id: Uuid::nil(),
                operation: OperationKind::Reservation,
                provider: "ModernREST".into(),
                source: ProviderError::NoResponse("timeout".into()),
            }
            .attempt_status(),
            AttemptStatus::Failed
        );
    }

    #[test]
    fn test_registry_errors_convert() {
        let id = Uuid::new_v4();
        assert!(matches!(
            OrchestrationError::from(RegistryError::NotFound(id)),
            OrchestrationError::Routing(RoutingError::PropertyNotFound(found)) if found == id
        ));
        assert!(matches!(
            OrchestrationError::from(RegistryError::DatabaseError("down".into())),
            OrchestrationError::Storage(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_error_response_body() {
        let err = OrchestrationError::Provider {
            property_id: Uuid::nil(),
            operation: OperationKind::Cancel,
            provider: "LegacyXML".into(),
            source: ProviderError::Status {
                status: 502,
                body: "bad gateway".into(),
            },
        };

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["errorKind"], "PROVIDER_ERROR");
        assert_eq!(value["details"]["operation"], "Cancel");
        assert_eq!(value["details"]["providerErrorKind"], "PROVIDER_ERROR_STATUS");
    }
}
