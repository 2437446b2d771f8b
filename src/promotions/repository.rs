use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, PgPool};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::promotions::{PromoCode, PromoError, PromocodeUsage, UsageReversal, UsageStatus};

/// Storage of promo codes and their usage records
#[async_trait]
pub trait PromoRepository: Send + Sync {
    async fn find_by_id(&self, promo_id: Uuid) -> Result<Option<PromoCode>, PromoError>;

    /// Number of `applied` usages of a promo by one customer
    async fn count_applied_for_customer(
        &self,
        promo_id: Uuid,
        customer_id: &str,
    ) -> Result<i64, PromoError>;

    /// Record a usage atomically
    ///
    /// Increments the counter, adds the customer to the used-by set and inserts
    /// the usage, then rolls everything back if a limit is now exceeded.
    async fn apply_usage(&self, usage: &PromocodeUsage) -> Result<PromocodeUsage, PromoError>;

    /// Reverse one applied usage of a booking atomically, the oldest first.
    /// The usage counter drops by exactly one.
    async fn reverse_usage(
        &self,
        booking_id: &str,
        reversal: &UsageReversal,
    ) -> Result<PromocodeUsage, PromoError>;

    /// Usages recorded for a booking, any status
    async fn usages_for_booking(&self, booking_id: &str) -> Result<Vec<PromocodeUsage>, PromoError>;

    async fn upsert(&self, promo: &PromoCode) -> Result<(), PromoError>;
}

#[derive(Debug, FromRow)]
struct CounterRow {
    current_usage: i32,
    use_limit: i32,
    usage_limit_per_user: i32,
}

const USAGE_COLUMNS: &str = "id, promo_id, customer_id, booking_id, status, original_amount, \
                             discount_amount, final_amount, applied_at, cancelled_at, cancel_reason";

/// PostgreSQL-backed promo repository
#[derive(Clone)]
pub struct PgPromoRepository {
    pool: PgPool,
}

impl PgPromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromoRepository for PgPromoRepository {
    async fn find_by_id(&self, promo_id: Uuid) -> Result<Option<PromoCode>, PromoError> {
        let promo = sqlx::query_as::<_, PromoCode>(
            r#"
            SELECT id, code, discount_type, value, valid_from, valid_until, use_limit,
                   usage_limit_per_user, applicable_room_types, applicable_rate_plans,
                   current_usage, used_by, is_active
            FROM promo_codes
            WHERE id = $1
            "#,
        )
        .bind(promo_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(promo)
    }

    async fn count_applied_for_customer(
        &self,
        promo_id: Uuid,
        customer_id: &str,
    ) -> Result<i64, PromoError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM promocode_usages
            WHERE promo_id = $1 AND customer_id = $2 AND status = 'applied'
            "#,
        )
        .bind(promo_id)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn apply_usage(&self, usage: &PromocodeUsage) -> Result<PromocodeUsage, PromoError> {
        let mut tx = self.pool.begin().await?;

        // The counter update takes the row lock; concurrent applies queue here
        let counter = sqlx::query_as::<_, CounterRow>(
            r#"
            UPDATE promo_codes
            SET current_usage = current_usage + 1,
                used_by = CASE WHEN $2 = ANY(used_by) THEN used_by ELSE array_append(used_by, $2) END
            WHERE id = $1
            RETURNING current_usage, use_limit, usage_limit_per_user
            "#,
        )
        .bind(usage.promo_id)
        .bind(&usage.customer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PromoError::NotFound(usage.promo_id))?;

        if counter.current_usage > counter.use_limit {
            tx.rollback().await?;
            return Err(PromoError::LimitExceeded(usage.promo_id));
        }

        let inserted = sqlx::query_as::<_, PromocodeUsage>(&format!(
            r#"
            INSERT INTO promocode_usages ({USAGE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USAGE_COLUMNS}
            "#
        ))
        .bind(usage.id)
        .bind(usage.promo_id)
        .bind(&usage.customer_id)
        .bind(&usage.booking_id)
        .bind(usage.status)
        .bind(usage.original_amount)
        .bind(usage.discount_amount)
        .bind(usage.final_amount)
        .bind(usage.applied_at)
        .bind(usage.cancelled_at)
        .bind(&usage.cancel_reason)
        .fetch_one(&mut *tx)
        .await?;

        let per_customer = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM promocode_usages
            WHERE promo_id = $1 AND customer_id = $2 AND status = 'applied'
            "#,
        )
        .bind(usage.promo_id)
        .bind(&usage.customer_id)
        .fetch_one(&mut *tx)
        .await?;

        if per_customer > i64::from(counter.usage_limit_per_user) {
            tx.rollback().await?;
            return Err(PromoError::PerUserLimitExceeded {
                promo_id: usage.promo_id,
                customer_id: usage.customer_id.clone(),
            });
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn reverse_usage(
        &self,
        booking_id: &str,
        reversal: &UsageReversal,
    ) -> Result<PromocodeUsage, PromoError> {
        let mut tx = self.pool.begin().await?;

        let usage = sqlx::query_as::<_, PromocodeUsage>(&format!(
            r#"
            UPDATE promocode_usages
            SET status = $2, cancelled_at = $3, cancel_reason = $4
            WHERE id = (
                SELECT id FROM promocode_usages
                WHERE booking_id = $1 AND status = 'applied'
                ORDER BY applied_at ASC, id ASC
                LIMIT 1
                FOR UPDATE
            )
            RETURNING {USAGE_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(reversal.status())
        .bind(Utc::now())
        .bind(reversal.reason())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| PromoError::UsageNotFound(booking_id.to_string()))?;

        sqlx::query(
            r#"
            UPDATE promo_codes
            SET current_usage = GREATEST(current_usage - 1, 0),
                used_by = CASE
                    WHEN EXISTS(
                        SELECT 1 FROM promocode_usages
                        WHERE promo_id = $1 AND customer_id = $2 AND status = 'applied'
                    ) THEN used_by
                    ELSE array_remove(used_by, $2)
                END
            WHERE id = $1
            "#,
        )
        .bind(usage.promo_id)
        .bind(&usage.customer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(usage)
    }

    async fn usages_for_booking(&self, booking_id: &str) -> Result<Vec<PromocodeUsage>, PromoError> {
        let usages = sqlx::query_as::<_, PromocodeUsage>(&format!(
            "SELECT {USAGE_COLUMNS} FROM promocode_usages WHERE booking_id = $1 ORDER BY applied_at ASC"
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(usages)
    }

    async fn upsert(&self, promo: &PromoCode) -> Result<(), PromoError> {
        sqlx::query(
            r#"
            INSERT INTO promo_codes (
                id, code, discount_type, value, valid_from, valid_until, use_limit,
                usage_limit_per_user, applicable_room_types, applicable_rate_plans,
                current_usage, used_by, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id)
            DO UPDATE SET
                code = $2, discount_type = $3, value = $4, valid_from = $5, valid_until = $6,
                use_limit = $7, usage_limit_per_user = $8, applicable_room_types = $9,
                applicable_rate_plans = $10, current_usage = $11, used_by = $12, is_active = $13
            "#,
        )
        .bind(promo.id)
        .bind(&promo.code)
        .bind(promo.discount_type)
        .bind(promo.value)
        .bind(promo.valid_from)
        .bind(promo.valid_until)
        .bind(promo.use_limit)
        .bind(promo.usage_limit_per_user)
        .bind(&promo.applicable_room_types)
        .bind(&promo.applicable_rate_plans)
        .bind(promo.current_usage)
        .bind(&promo.used_by)
        .bind(promo.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Default)]
struct PromoTables {
    promos: HashMap<Uuid, PromoCode>,
    usages: Vec<PromocodeUsage>,
}

impl PromoTables {
    fn applied_count(&self, promo_id: Uuid, customer_id: &str) -> i64 {
        self.usages
            .iter()
            .filter(|u| {
                u.promo_id == promo_id
                    && u.customer_id == customer_id
                    && u.status == UsageStatus::Applied
            })
            .count() as i64
    }
}

/// In-memory promo repository
///
/// A single mutex stands in for the database transaction.
#[derive(Clone, Default)]
pub struct InMemoryPromoRepository {
    tables: Arc<Mutex<PromoTables>>,
}

impl InMemoryPromoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromoRepository for InMemoryPromoRepository {
    async fn find_by_id(&self, promo_id: Uuid) -> Result<Option<PromoCode>, PromoError> {
        Ok(self.tables.lock().await.promos.get(&promo_id).cloned())
    }

    async fn count_applied_for_customer(
        &self,
        promo_id: Uuid,
        customer_id: &str,
    ) -> Result<i64, PromoError> {
        Ok(self.tables.lock().await.applied_count(promo_id, customer_id))
    }

    async fn apply_usage(&self, usage: &PromocodeUsage) -> Result<PromocodeUsage, PromoError> {
        let mut tables = self.tables.lock().await;
        let snapshot = tables
            .promos
            .get(&usage.promo_id)
            .cloned()
            .ok_or(PromoError::NotFound(usage.promo_id))?;

        let mut updated = snapshot.clone();
        updated.current_usage += 1;
        if !updated.used_by.contains(&usage.customer_id) {
            updated.used_by.push(usage.customer_id.clone());
        }
        tables.promos.insert(usage.promo_id, updated.clone());
        tables.usages.push(usage.clone());

        let limit_error = if updated.current_usage > updated.use_limit {
            Some(PromoError::LimitExceeded(usage.promo_id))
        } else if tables.applied_count(usage.promo_id, &usage.customer_id)
            > i64::from(updated.usage_limit_per_user)
        {
            Some(PromoError::PerUserLimitExceeded {
                promo_id: usage.promo_id,
                customer_id: usage.customer_id.clone(),
            })
        } else {
            None
        };

        if let Some(err) = limit_error {
            tables.promos.insert(usage.promo_id, snapshot);
            tables.usages.pop();
            return Err(err);
        }
        Ok(usage.clone())
    }

    async fn reverse_usage(
        &self,
        booking_id: &str,
        reversal: &UsageReversal,
    ) -> Result<PromocodeUsage, PromoError> {
        let mut tables = self.tables.lock().await;
        let usage = tables
            .usages
            .iter_mut()
            .find(|u| u.booking_id == booking_id && u.status == UsageStatus::Applied)
            .ok_or_else(|| PromoError::UsageNotFound(booking_id.to_string()))?;

        usage.status = reversal.status();
        usage.cancelled_at = Some(Utc::now());
        usage.cancel_reason = reversal.reason().map(str::to_string);
        let reversed = usage.clone();

        let still_applied = tables.applied_count(reversed.promo_id, &reversed.customer_id) > 0;
        if let Some(promo) = tables.promos.get_mut(&reversed.promo_id) {
            promo.current_usage = (promo.current_usage - 1).max(0);
            if !still_applied {
                promo.used_by.retain(|c| c != &reversed.customer_id);
            }
        }
        Ok(reversed)
    }

    async fn usages_for_booking(&self, booking_id: &str) -> Result<Vec<PromocodeUsage>, PromoError> {
        Ok(self
            .tables
            .lock()
            .await
            .usages
            .iter()
            .filter(|u| u.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, promo: &PromoCode) -> Result<(), PromoError> {
        self.tables
            .lock()
            .await
            .promos
            .insert(promo.id, promo.clone());
        Ok(())
    }
}
