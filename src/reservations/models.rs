use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle of a canonical reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Failed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Failed => "failed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Pending
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Age classification of a guest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GuestType {
    Adult,
    Child,
    Infant,
}

impl GuestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestType::Adult => "adult",
            GuestType::Child => "child",
            GuestType::Infant => "infant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "adult" | "adults" => Some(GuestType::Adult),
            "child" | "children" => Some(GuestType::Child),
            "infant" | "infants" => Some(GuestType::Infant),
            _ => None,
        }
    }
}

/// Postal address attached to a guest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuestAddress {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

impl GuestAddress {
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.zip_code.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub guest_type: GuestType,
    pub address: Option<GuestAddress>,
}

/// One room-type / rate-plan line of a stay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomLine {
    pub room_type_code: String,
    pub rate_plan_code: String,
    pub room_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub currency: String,
    pub total: Decimal,
    pub paid: Decimal,
    pub discount: Decimal,
    pub method: String,
}

/// Promo code applied to a booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromo {
    pub promo_id: Uuid,
    pub discount_amount: Decimal,
}

/// Provider-agnostic reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalReservation {
    pub reservation_id: String,
    pub property_id: Uuid,
    pub property_code: String,
    pub hotel_name: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: Vec<RoomLine>,
    pub guests: Vec<Guest>,
    pub payment: PaymentSummary,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub customer_id: Option<String>,
    pub notes: Option<String>,
    pub promo: Option<AppliedPromo>,
    pub status: ReservationStatus,
    /// Set only after a successful call to an external provider
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanonicalReservation {
    /// Number of nights in the stay
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Code the provider knows the booking by
    pub fn booking_code(&self) -> &str {
        self.external_id.as_deref().unwrap_or(&self.reservation_id)
    }

    /// Identity used for promo usage accounting
    pub fn customer_key(&self) -> Option<&str> {
        self.customer_id
            .as_deref()
            .or(self.contact_email.as_deref())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Kind of orchestration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text")]
pub enum OperationKind {
    Reservation,
    Amend,
    Cancel,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Reservation => "Reservation",
            OperationKind::Amend => "Amend",
            OperationKind::Cancel => "Cancel",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final status of one orchestration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    /// Provider, consistency or storage failure
    Failed,
    /// Refused before any provider call
    Rejected,
}

/// Immutable audit record of one orchestration attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationLogEntry {
    pub id: Uuid,
    pub reservation_id: String,
    pub property_id: Uuid,
    pub operation: OperationKind,
    pub provider: Option<String>,
    #[schema(value_type = Object)]
    pub request_payload: serde_json::Value,
    #[schema(value_type = Option<Object>)]
    pub outgoing_payload: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub provider_response: Option<serde_json::Value>,
    pub error: Option<String>,
    pub status: AttemptStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GuestInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// adult, child or infant
    #[schema(example = "adult")]
    pub user_type: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoInput {
    pub promo_id: Uuid,
    pub discount_amount: Decimal,
}

/// Booking fields supplied by the caller
///
/// Everything is optional at the wire level; completeness is checked when the
/// details are transformed into a canonical reservation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingDetails {
    #[schema(example = "2025-06-01")]
    pub check_in_date: String,
    #[schema(example = "2025-06-04")]
    pub check_out_date: String,
    /// Empty to let the orchestrator generate one
    pub reservation_id: String,
    pub user_id: Option<String>,
    pub hotel_code: String,
    pub hotel_name: Option<String>,
    pub rate_plan_code: String,
    pub room_type_code: String,
    pub number_of_rooms: i32,
    pub room_total_price: Decimal,
    pub paid_amount: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    #[schema(example = "USD")]
    pub currency_code: String,
    pub payment_method: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub guests: Vec<GuestInput>,
    pub notes: Option<String>,
    pub promo_code: Option<PromoInput>,
    /// Checked against the guest list when present
    pub age_code_summary: Option<AgeCodeSummary>,
}

/// Counts of guests per age class
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgeCodeSummary {
    #[serde(default)]
    pub adult: u32,
    #[serde(default)]
    pub child: u32,
    #[serde(default)]
    pub infant: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NestedReservationRequest {
    pub property_id: Uuid,
    pub booking_details: BookingDetails,
    #[serde(default)]
    pub age_code_summary: Option<AgeCodeSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlatReservationRequest {
    pub property_id: Uuid,
    #[serde(flatten)]
    pub details: BookingDetails,
}

/// Create request as accepted on the wire
///
/// Both shapes are resolved into one `BookingDetails` at the boundary. The
/// shape is chosen by the presence of a `bookingDetails` key, so a malformed
/// nested body is reported instead of being read as a flat one.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum CreateReservationRequest {
    Nested(NestedReservationRequest),
    Flat(FlatReservationRequest),
}

impl<'de> Deserialize<'de> for CreateReservationRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let nested = value
            .as_object()
            .map_or(false, |object| object.contains_key("bookingDetails"));

        if nested {
            serde_json::from_value(value)
                .map(CreateReservationRequest::Nested)
                .map_err(serde::de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(CreateReservationRequest::Flat)
                .map_err(serde::de::Error::custom)
        }
    }
}

impl CreateReservationRequest {
    pub fn into_parts(self) -> (Uuid, BookingDetails) {
        match self {
            CreateReservationRequest::Nested(request) => {
                let mut details = request.booking_details;
                if request.age_code_summary.is_some() {
                    details.age_code_summary = request.age_code_summary;
                }
                (request.property_id, details)
            }
            CreateReservationRequest::Flat(request) => (request.property_id, request.details),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AmendReservationInput {
    pub property_id: Uuid,
    #[validate(custom = "crate::validation::validate_not_blank")]
    pub reservation_id: String,
    #[schema(example = "2025-06-02")]
    pub new_check_in_date: String,
    #[schema(example = "2025-06-05")]
    pub new_check_out_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelReservationInput {
    pub property_id: Uuid,
    #[validate(custom = "crate::validation::validate_not_blank")]
    pub reservation_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Payload of a successful orchestration response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationIdData {
    pub reservation_id: String,
}
