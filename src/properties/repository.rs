use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::properties::{DataSource, Property, RegistryError};

/// Read access to property records
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Find a property by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Property>, RegistryError>;

    /// Insert or replace a property
    async fn upsert(&self, property: &Property) -> Result<(), RegistryError>;
}

#[derive(Debug, FromRow)]
struct PropertyRow {
    id: Uuid,
    code: String,
    name: String,
    data_source: Option<Json<DataSource>>,
}

impl From<PropertyRow> for Property {
    fn from(row: PropertyRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            name: row.name,
            data_source: row.data_source.map(|json| json.0),
        }
    }
}

/// PostgreSQL-backed property repository
#[derive(Clone)]
pub struct PgPropertyRepository {
    pool: PgPool,
}

impl PgPropertyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyRepository for PgPropertyRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Property>, RegistryError> {
        let row = sqlx::query_as::<_, PropertyRow>(
            "SELECT id, code, name, data_source FROM properties WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Property::from))
    }

    async fn upsert(&self, property: &Property) -> Result<(), RegistryError> {
        sqlx::query(
            r#"
            INSERT INTO properties (id, code, name, data_source)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id)
            DO UPDATE SET code = $2, name = $3, data_source = $4
            "#,
        )
        .bind(property.id)
        .bind(&property.code)
        .bind(&property.name)
        .bind(property.data_source.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory property repository
#[derive(Clone, Default)]
pub struct InMemoryPropertyRepository {
    properties: Arc<RwLock<HashMap<Uuid, Property>>>,
}

impl InMemoryPropertyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PropertyRepository for InMemoryPropertyRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Property>, RegistryError> {
        Ok(self.properties.read().await.get(&id).cloned())
    }

    async fn upsert(&self, property: &Property) -> Result<(), RegistryError> {
        self.properties
            .write()
            .await
            .insert(property.id, property.clone());
        Ok(())
    }
}
