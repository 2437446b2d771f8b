use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::inventory::{InventoryError, InventoryRecord, StayRooms};

/// Storage of nightly room counts
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Records for dates in `[from, to)`, ordered by date
    async fn find_range(
        &self,
        hotel_code: &str,
        room_type_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<InventoryRecord>, InventoryError>;

    /// Whether any record exists for the room type
    async fn is_tracked(&self, hotel_code: &str, room_type_code: &str)
        -> Result<bool, InventoryError>;

    /// Take `room_count` rooms from every night of the stay, or from none
    ///
    /// Each row is only decremented while `count >= room_count`.
    async fn decrement_nights(&self, stay: &StayRooms) -> Result<(), InventoryError>;

    /// Return `room_count` rooms to every existing night of the stay
    async fn increment_nights(&self, stay: &StayRooms) -> Result<(), InventoryError>;

    async fn upsert(&self, record: &InventoryRecord) -> Result<(), InventoryError>;
}

/// PostgreSQL-backed inventory repository
#[derive(Clone)]
pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryRepository for PgInventoryRepository {
    async fn find_range(
        &self,
        hotel_code: &str,
        room_type_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<InventoryRecord>, InventoryError> {
        let records = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT hotel_code, room_type_code, date, count
            FROM room_inventory
            WHERE hotel_code = $1 AND room_type_code = $2 AND date >= $3 AND date < $4
            ORDER BY date ASC
            "#,
        )
        .bind(hotel_code)
        .bind(room_type_code)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn is_tracked(
        &self,
        hotel_code: &str,
        room_type_code: &str,
    ) -> Result<bool, InventoryError> {
        let tracked = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM room_inventory WHERE hotel_code = $1 AND room_type_code = $2
            )
            "#,
        )
        .bind(hotel_code)
        .bind(room_type_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(tracked)
    }

    async fn decrement_nights(&self, stay: &StayRooms) -> Result<(), InventoryError> {
        let nights = stay.nights();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE room_inventory
            SET count = count - $1
            WHERE hotel_code = $2
              AND room_type_code = $3
              AND date = ANY($4)
              AND count >= $1
            "#,
        )
        .bind(stay.room_count)
        .bind(&stay.hotel_code)
        .bind(&stay.room_type_code)
        .bind(&nights)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != nights.len() as u64 {
            tx.rollback().await?;
            let records = self
                .find_range(&stay.hotel_code, &stay.room_type_code, stay.check_in, stay.check_out)
                .await?;
            return Err(stay.shortfall(&records).unwrap_or(
                InventoryError::InsufficientAvailability {
                    date: stay.check_in,
                    requested: stay.room_count,
                    available: 0,
                },
            ));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn increment_nights(&self, stay: &StayRooms) -> Result<(), InventoryError> {
        sqlx::query(
            r#"
            UPDATE room_inventory
            SET count = count + $1
            WHERE hotel_code = $2 AND room_type_code = $3 AND date = ANY($4)
            "#,
        )
        .bind(stay.room_count)
        .bind(&stay.hotel_code)
        .bind(&stay.room_type_code)
        .bind(stay.nights())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert(&self, record: &InventoryRecord) -> Result<(), InventoryError> {
        sqlx::query(
            r#"
            INSERT INTO room_inventory (hotel_code, room_type_code, date, count)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (hotel_code, room_type_code, date)
            DO UPDATE SET count = $4
            "#,
        )
        .bind(&record.hotel_code)
        .bind(&record.room_type_code)
        .bind(record.date)
        .bind(record.count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

type InventoryKey = (String, String, NaiveDate);

/// In-memory inventory repository
///
/// One lock covers the whole table, so a decrement validates and writes all
/// nights without interleaving.
#[derive(Clone, Default)]
pub struct InMemoryInventoryRepository {
    counts: Arc<Mutex<BTreeMap<InventoryKey, i32>>>,
}

impl InMemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(hotel_code: &str, room_type_code: &str, date: NaiveDate) -> InventoryKey {
    (hotel_code.to_string(), room_type_code.to_string(), date)
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn find_range(
        &self,
        hotel_code: &str,
        room_type_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<InventoryRecord>, InventoryError> {
        if from >= to {
            return Ok(Vec::new());
        }
        let counts = self.counts.lock().await;
        Ok(counts
            .range(key(hotel_code, room_type_code, from)..key(hotel_code, room_type_code, to))
            .map(|((hotel, room_type, date), count)| InventoryRecord {
                hotel_code: hotel.clone(),
                room_type_code: room_type.clone(),
                date: *date,
                count: *count,
            })
            .collect())
    }

    async fn is_tracked(
        &self,
        hotel_code: &str,
        room_type_code: &str,
    ) -> Result<bool, InventoryError> {
        let counts = self.counts.lock().await;
        Ok(counts
            .keys()
            .any(|(hotel, room_type, _)| hotel == hotel_code && room_type == room_type_code))
    }

    async fn decrement_nights(&self, stay: &StayRooms) -> Result<(), InventoryError> {
        let mut counts = self.counts.lock().await;
        let nights = stay.nights();

        for date in &nights {
            let available = counts
                .get(&key(&stay.hotel_code, &stay.room_type_code, *date))
                .copied()
                .unwrap_or(0);
            if available < stay.room_count {
                return Err(InventoryError::InsufficientAvailability {
                    date: *date,
                    requested: stay.room_count,
                    available,
                });
            }
        }

        for date in nights {
            if let Some(count) = counts.get_mut(&key(&stay.hotel_code, &stay.room_type_code, date)) {
                *count -= stay.room_count;
            }
        }
        Ok(())
    }

    async fn increment_nights(&self, stay: &StayRooms) -> Result<(), InventoryError> {
        let mut counts = self.counts.lock().await;
        for date in stay.nights() {
            if let Some(count) = counts.get_mut(&key(&stay.hotel_code, &stay.room_type_code, date)) {
                *count += stay.room_count;
            }
        }
        Ok(())
    }

    async fn upsert(&self, record: &InventoryRecord) -> Result<(), InventoryError> {
        self.counts.lock().await.insert(
            key(&record.hotel_code, &record.room_type_code, record.date),
            record.count,
        );
        Ok(())
    }
}
