/// Error types for property configuration lookups
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Property not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for RegistryError {
    fn from(err: sqlx::Error) -> Self {
        RegistryError::DatabaseError(err.to_string())
    }
}
