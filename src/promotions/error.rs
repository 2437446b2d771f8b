use uuid::Uuid;

/// Error types for promo code usage
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PromoError {
    #[error("Promo code not found: {0}")]
    NotFound(Uuid),

    #[error("Promo code is not usable: {0}")]
    NotUsable(String),

    #[error("Promo code {0} usage limit exceeded")]
    LimitExceeded(Uuid),

    #[error("Customer {customer_id} has reached the usage limit for promo code {promo_id}")]
    PerUserLimitExceeded { promo_id: Uuid, customer_id: String },

    #[error("No applied promo usage for booking {0}")]
    UsageNotFound(String),

    #[error("Invalid promo usage request: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for PromoError {
    fn from(err: sqlx::Error) -> Self {
        PromoError::DatabaseError(err.to_string())
    }
}
