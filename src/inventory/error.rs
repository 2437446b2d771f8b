use chrono::NaiveDate;

/// Error types for inventory operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InventoryError {
    #[error("Invalid inventory request: {0}")]
    Invalid(String),

    #[error("Insufficient availability on date {date}: requested {requested}, available {available}")]
    InsufficientAvailability {
        date: NaiveDate,
        requested: i32,
        available: i32,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        InventoryError::DatabaseError(err.to_string())
    }
}
