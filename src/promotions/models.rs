use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// How a promo code's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `value` percent of the amount (10 = 10% off)
    Percentage,
    /// `value` subtracted from the amount
    Flat,
}

/// Discount code with global and per-customer limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    pub use_limit: i32,
    pub usage_limit_per_user: i32,
    /// Empty means every room type
    #[serde(default)]
    pub applicable_room_types: Vec<String>,
    /// Empty means every rate plan
    #[serde(default)]
    pub applicable_rate_plans: Vec<String>,
    #[serde(default)]
    pub current_usage: i32,
    #[serde(default)]
    pub used_by: Vec<String>,
    pub is_active: bool,
}

impl PromoCode {
    /// Discount granted on `amount`, never more than the amount itself
    pub fn discount_for(&self, amount: Decimal) -> Decimal {
        if amount <= Decimal::ZERO || self.value <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let discount = match self.discount_type {
            DiscountType::Percentage => (amount * self.value / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            DiscountType::Flat => self.value,
        };
        discount.min(amount)
    }

    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.valid_from.map_or(true, |from| now >= from)
            && self.valid_until.map_or(true, |until| now <= until)
    }

    pub fn applies_to(&self, room_type_code: &str, rate_plan_code: &str) -> bool {
        let room_ok = self.applicable_room_types.is_empty()
            || self.applicable_room_types.iter().any(|r| r == room_type_code);
        let plan_ok = self.applicable_rate_plans.is_empty()
            || self.applicable_rate_plans.iter().any(|p| p == rate_plan_code);
        room_ok && plan_ok
    }

    /// Every booked line must be eligible for the code
    pub fn covers(&self, target: &PromoTarget) -> bool {
        target
            .lines
            .iter()
            .all(|(room_type, rate_plan)| self.applies_to(room_type, rate_plan))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Applied,
    Cancelled,
    Expired,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Applied => "applied",
            UsageStatus::Cancelled => "cancelled",
            UsageStatus::Expired => "expired",
        }
    }
}

/// Why an applied usage is being reversed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageReversal {
    /// The booking was cancelled
    Cancelled(Option<String>),
    /// The booking never completed
    Expired(Option<String>),
}

impl UsageReversal {
    pub fn status(&self) -> UsageStatus {
        match self {
            UsageReversal::Cancelled(_) => UsageStatus::Cancelled,
            UsageReversal::Expired(_) => UsageStatus::Expired,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            UsageReversal::Cancelled(reason) | UsageReversal::Expired(reason) => reason.as_deref(),
        }
    }
}

/// One customer applying one promo code to one booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromocodeUsage {
    pub id: Uuid,
    pub promo_id: Uuid,
    pub customer_id: String,
    pub booking_id: String,
    pub status: UsageStatus,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub applied_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

/// Booking a promo code is applied to
#[derive(Debug, Clone, PartialEq)]
pub struct PromoTarget {
    /// Room type and rate plan code of each booked line
    pub lines: Vec<(String, String)>,
    /// Amount the discount is computed on
    pub amount: Decimal,
}

/// Amounts recorded with a usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountInfo {
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
}

impl DiscountInfo {
    pub fn final_amount(&self) -> Decimal {
        (self.original_amount - self.discount_amount).max(Decimal::ZERO)
    }
}

/// Advisory eligibility answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageCheck {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl UsageCheck {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EligibilityQuery {
    pub customer_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn promo(discount_type: DiscountType, value: Decimal) -> PromoCode {
        PromoCode {
            id: Uuid::new_v4(),
            code: "SUMMER".to_string(),
            discount_type,
            value,
            valid_from: None,
            valid_until: None,
            use_limit: 10,
            usage_limit_per_user: 1,
            applicable_room_types: vec![],
            applicable_rate_plans: vec![],
            current_usage: 0,
            used_by: vec![],
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let code = promo(DiscountType::Percentage, dec!(15));
        assert_eq!(code.discount_for(dec!(200)), dec!(30.00));
        assert_eq!(code.discount_for(dec!(33.33)), dec!(5.00));
        assert_eq!(code.discount_for(dec!(0)), dec!(0));
    }

    #[test]
    fn test_flat_discount_never_exceeds_amount() {
        let code = promo(DiscountType::Flat, dec!(50));
        assert_eq!(code.discount_for(dec!(200)), dec!(50));
        assert_eq!(code.discount_for(dec!(20)), dec!(20));
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let mut code = promo(DiscountType::Flat, dec!(5));
        assert!(code.is_within_window(now));

        code.valid_from = Some(now + Duration::days(1));
        assert!(!code.is_within_window(now));

        code.valid_from = Some(now - Duration::days(10));
        code.valid_until = Some(now - Duration::days(1));
        assert!(!code.is_within_window(now));
    }

    #[test]
    fn test_applicability() {
        let mut code = promo(DiscountType::Flat, dec!(5));
        assert!(code.applies_to("DBL", "BAR"));

        code.applicable_room_types = vec!["STE".to_string()];
        assert!(!code.applies_to("DBL", "BAR"));
        assert!(code.applies_to("STE", "BAR"));
    }

    #[test]
    fn test_covers_requires_every_line() {
        let mut code = promo(DiscountType::Flat, dec!(5));
        code.applicable_room_types = vec!["STE".to_string()];
        code.applicable_rate_plans = vec!["MEMBER".to_string()];

        let target = |lines: &[(&str, &str)]| PromoTarget {
            lines: lines
                .iter()
                .map(|(r, p)| (r.to_string(), p.to_string()))
                .collect(),
            amount: dec!(100),
        };
        assert!(code.covers(&target(&[("STE", "MEMBER")])));
        assert!(!code.covers(&target(&[("DBL", "BAR")])));
        assert!(!code.covers(&target(&[("STE", "BAR")])));
        assert!(!code.covers(&target(&[("STE", "MEMBER"), ("DBL", "MEMBER")])));
    }

    #[test]
    fn test_final_amount_floors_at_zero() {
        let info = DiscountInfo {
            original_amount: dec!(40),
            discount_amount: dec!(60),
        };
        assert_eq!(info.final_amount(), dec!(0));
    }
}
