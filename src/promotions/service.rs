use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rust_decimal::Decimal;

use crate::promotions::{
    DiscountInfo, PromoCode, PromoError, PromoRepository, PromoTarget, PromocodeUsage,
    UsageCheck, UsageReversal, UsageStatus,
};

/// Records and reverses promo code consumption
#[derive(Clone)]
pub struct PromoUsageTracker {
    repository: Arc<dyn PromoRepository>,
}

impl PromoUsageTracker {
    pub fn new(repository: Arc<dyn PromoRepository>) -> Self {
        Self { repository }
    }

    /// Apply a promo code to a booking
    ///
    /// The discount is computed from the code itself. Limits are enforced
    /// inside the repository transaction, after the counter has been
    /// incremented.
    pub async fn apply_usage(
        &self,
        promo_id: Uuid,
        customer_id: &str,
        booking_id: &str,
        target: &PromoTarget,
    ) -> Result<PromocodeUsage, PromoError> {
        if customer_id.trim().is_empty() {
            return Err(PromoError::Invalid("customer id is required".to_string()));
        }
        if booking_id.trim().is_empty() {
            return Err(PromoError::Invalid("booking id is required".to_string()));
        }

        let promo = self.load(promo_id).await?;
        let now = Utc::now();
        if let Some(reason) =
            unusable_reason(&promo, now).or_else(|| target_mismatch(&promo, target))
        {
            return Err(PromoError::NotUsable(reason));
        }

        let discount = DiscountInfo {
            original_amount: target.amount,
            discount_amount: promo.discount_for(target.amount),
        };
        let usage = PromocodeUsage {
            id: Uuid::new_v4(),
            promo_id,
            customer_id: customer_id.to_string(),
            booking_id: booking_id.to_string(),
            status: UsageStatus::Applied,
            original_amount: discount.original_amount,
            discount_amount: discount.discount_amount,
            final_amount: discount.final_amount(),
            applied_at: now,
            cancelled_at: None,
            cancel_reason: None,
        };

        let applied = self.repository.apply_usage(&usage).await?;
        tracing::info!(
            %promo_id,
            customer_id,
            booking_id,
            discount = %discount.discount_amount,
            "Promo usage applied"
        );
        Ok(applied)
    }

    /// Reverse the applied usage of a booking
    pub async fn cancel_usage(
        &self,
        booking_id: &str,
        reversal: UsageReversal,
    ) -> Result<PromocodeUsage, PromoError> {
        let usage = self.repository.reverse_usage(booking_id, &reversal).await?;
        tracing::info!(
            promo_id = %usage.promo_id,
            booking_id,
            status = usage.status.as_str(),
            "Promo usage reversed"
        );
        Ok(usage)
    }

    /// Advisory check; a positive answer does not reserve anything
    pub async fn can_customer_use(
        &self,
        promo_id: Uuid,
        customer_id: &str,
    ) -> Result<UsageCheck, PromoError> {
        let promo = self.load(promo_id).await?;
        Ok(match self.denial(&promo, customer_id).await? {
            Some(reason) => UsageCheck::denied(reason),
            None => UsageCheck::allowed(),
        })
    }

    /// Discount the code grants on `target`, or `NotUsable` when it is
    /// inactive, out of its window, restricted to other rooms or rates, or
    /// exhausted for this customer. Advisory like `can_customer_use`.
    pub async fn quote(
        &self,
        promo_id: Uuid,
        customer_id: &str,
        target: &PromoTarget,
    ) -> Result<Decimal, PromoError> {
        let promo = self.load(promo_id).await?;
        let denied = match target_mismatch(&promo, target) {
            Some(reason) => Some(reason),
            None => self.denial(&promo, customer_id).await?,
        };
        match denied {
            Some(reason) => Err(PromoError::NotUsable(reason)),
            None => Ok(promo.discount_for(target.amount)),
        }
    }

    async fn denial(&self, promo: &PromoCode, customer_id: &str) -> Result<Option<String>, PromoError> {
        if let Some(reason) = unusable_reason(promo, Utc::now()) {
            return Ok(Some(reason));
        }
        if promo.current_usage >= promo.use_limit {
            return Ok(Some("Promo code usage limit reached".to_string()));
        }

        let applied = self
            .repository
            .count_applied_for_customer(promo.id, customer_id)
            .await?;
        if applied >= i64::from(promo.usage_limit_per_user) {
            return Ok(Some(
                "Customer has reached the usage limit for this promo code".to_string(),
            ));
        }
        Ok(None)
    }

    pub async fn usages_for_booking(&self, booking_id: &str) -> Result<Vec<PromocodeUsage>, PromoError> {
        self.repository.usages_for_booking(booking_id).await
    }

    async fn load(&self, promo_id: Uuid) -> Result<PromoCode, PromoError> {
        self.repository
            .find_by_id(promo_id)
            .await?
            .ok_or(PromoError::NotFound(promo_id))
    }
}

fn unusable_reason(promo: &PromoCode, now: DateTime<Utc>) -> Option<String> {
    if !promo.is_active {
        Some("Promo code is inactive".to_string())
    } else if !promo.is_within_window(now) {
        Some("Promo code is outside its validity window".to_string())
    } else {
        None
    }
}

fn target_mismatch(promo: &PromoCode, target: &PromoTarget) -> Option<String> {
    (!promo.covers(target))
        .then(|| "Promo code does not apply to the booked room type or rate plan".to_string())
}
