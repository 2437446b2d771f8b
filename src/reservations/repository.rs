use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::reservations::{
    AppliedPromo, AttemptStatus, CanonicalReservation, Guest, OperationKind, OperationLogEntry,
    PaymentSummary, ReservationStatus, RoomLine, StoreError,
};

/// Persistence for canonical reservations and their operation log
///
/// Reservations are never deleted; log entries are append-only.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Find a reservation by ID
    async fn find_by_id(&self, reservation_id: &str)
        -> Result<Option<CanonicalReservation>, StoreError>;

    /// Insert or replace a reservation
    async fn save(&self, reservation: &CanonicalReservation) -> Result<(), StoreError>;

    /// Append one operation log entry
    async fn append_log(&self, entry: &OperationLogEntry) -> Result<(), StoreError>;

    /// All log entries for a reservation, oldest first
    async fn logs_for_reservation(
        &self,
        reservation_id: &str,
    ) -> Result<Vec<OperationLogEntry>, StoreError>;
}

#[derive(Debug, FromRow)]
struct ReservationRow {
    reservation_id: String,
    property_id: Uuid,
    property_code: String,
    hotel_name: Option<String>,
    check_in: NaiveDate,
    check_out: NaiveDate,
    rooms: Json<Vec<RoomLine>>,
    guests: Json<Vec<Guest>>,
    payment: Json<PaymentSummary>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    customer_id: Option<String>,
    notes: Option<String>,
    promo: Option<Json<AppliedPromo>>,
    status: ReservationStatus,
    external_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReservationRow> for CanonicalReservation {
    fn from(row: ReservationRow) -> Self {
        Self {
            reservation_id: row.reservation_id,
            property_id: row.property_id,
            property_code: row.property_code,
            hotel_name: row.hotel_name,
            check_in: row.check_in,
            check_out: row.check_out,
            rooms: row.rooms.0,
            guests: row.guests.0,
            payment: row.payment.0,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            customer_id: row.customer_id,
            notes: row.notes,
            promo: row.promo.map(|json| json.0),
            status: row.status,
            external_id: row.external_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OperationLogRow {
    id: Uuid,
    reservation_id: String,
    property_id: Uuid,
    operation: OperationKind,
    provider: Option<String>,
    request_payload: serde_json::Value,
    outgoing_payload: Option<serde_json::Value>,
    provider_response: Option<serde_json::Value>,
    error: Option<String>,
    status: AttemptStatus,
    created_at: DateTime<Utc>,
}

impl From<OperationLogRow> for OperationLogEntry {
    fn from(row: OperationLogRow) -> Self {
        Self {
            id: row.id,
            reservation_id: row.reservation_id,
            property_id: row.property_id,
            operation: row.operation,
            provider: row.provider,
            request_payload: row.request_payload,
            outgoing_payload: row.outgoing_payload,
            provider_response: row.provider_response,
            error: row.error,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed reservation store
#[derive(Clone)]
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn find_by_id(
        &self,
        reservation_id: &str,
    ) -> Result<Option<CanonicalReservation>, StoreError> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT reservation_id, property_id, property_code, hotel_name, check_in, check_out,
                   rooms, guests, payment, contact_email, contact_phone, customer_id, notes,
                   promo, status, external_id, created_at, updated_at
            FROM reservations
            WHERE reservation_id = $1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CanonicalReservation::from))
    }

    async fn save(&self, reservation: &CanonicalReservation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reservations (
                reservation_id, property_id, property_code, hotel_name, check_in, check_out,
                rooms, guests, payment, contact_email, contact_phone, customer_id, notes,
                promo, status, external_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (reservation_id)
            DO UPDATE SET
                property_id = $2,
                property_code = $3,
                hotel_name = $4,
                check_in = $5,
                check_out = $6,
                rooms = $7,
                guests = $8,
                payment = $9,
                contact_email = $10,
                contact_phone = $11,
                customer_id = $12,
                notes = $13,
                promo = $14,
                status = $15,
                external_id = $16,
                updated_at = $18
            "#,
        )
        .bind(&reservation.reservation_id)
        .bind(reservation.property_id)
        .bind(&reservation.property_code)
        .bind(&reservation.hotel_name)
        .bind(reservation.check_in)
        .bind(reservation.check_out)
        .bind(Json(&reservation.rooms))
        .bind(Json(&reservation.guests))
        .bind(Json(&reservation.payment))
        .bind(&reservation.contact_email)
        .bind(&reservation.contact_phone)
        .bind(&reservation.customer_id)
        .bind(&reservation.notes)
        .bind(reservation.promo.as_ref().map(Json))
        .bind(reservation.status)
        .bind(&reservation.external_id)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_log(&self, entry: &OperationLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reservation_operation_logs (
                id, reservation_id, property_id, operation, provider, request_payload,
                outgoing_payload, provider_response, error, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.reservation_id)
        .bind(entry.property_id)
        .bind(entry.operation)
        .bind(&entry.provider)
        .bind(&entry.request_payload)
        .bind(&entry.outgoing_payload)
        .bind(&entry.provider_response)
        .bind(&entry.error)
        .bind(entry.status)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn logs_for_reservation(
        &self,
        reservation_id: &str,
    ) -> Result<Vec<OperationLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, OperationLogRow>(
            r#"
            SELECT id, reservation_id, property_id, operation, provider, request_payload,
                   outgoing_payload, provider_response, error, status, created_at
            FROM reservation_operation_logs
            WHERE reservation_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OperationLogEntry::from).collect())
    }
}

/// In-memory reservation store
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    reservations: Arc<RwLock<HashMap<String, CanonicalReservation>>>,
    logs: Arc<RwLock<Vec<OperationLogEntry>>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every log entry across all reservations
    pub async fn all_logs(&self) -> Vec<OperationLogEntry> {
        self.logs.read().await.clone()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn find_by_id(
        &self,
        reservation_id: &str,
    ) -> Result<Option<CanonicalReservation>, StoreError> {
        Ok(self.reservations.read().await.get(reservation_id).cloned())
    }

    async fn save(&self, reservation: &CanonicalReservation) -> Result<(), StoreError> {
        self.reservations
            .write()
            .await
            .insert(reservation.reservation_id.clone(), reservation.clone());
        Ok(())
    }

    async fn append_log(&self, entry: &OperationLogEntry) -> Result<(), StoreError> {
        self.logs.write().await.push(entry.clone());
        Ok(())
    }

    async fn logs_for_reservation(
        &self,
        reservation_id: &str,
    ) -> Result<Vec<OperationLogEntry>, StoreError> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .filter(|entry| entry.reservation_id == reservation_id)
            .cloned()
            .collect())
    }
}
