// Legacy XML provider payloads
//
// The canonical model is flattened into a single field set, then wrapped in a
// `<ReservationRequest>` envelope.

use chrono::NaiveDate;
use serde::Serialize;

use crate::reservations::CanonicalReservation;
use crate::transform::{age_code_summary, validate_reservation, TransformError};

/// Envelope action attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegacyAction {
    Create,
    Modify,
    Cancel,
}

/// Flat create fields; the first guest is the lead guest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyReservationFields {
    pub hotel_code: String,
    pub reservation_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_type_code: String,
    pub rate_plan_code: String,
    pub number_of_rooms: i32,
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
    pub guest_first_name: String,
    pub guest_last_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub currency_code: String,
    pub total_amount: String,
    pub paid_amount: String,
    pub discount_amount: String,
    pub payment_method: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyModifyFields {
    pub hotel_code: String,
    pub reservation_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyCancelFields {
    pub hotel_code: String,
    pub reservation_id: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "ReservationRequest")]
struct Envelope<'a, T: Serialize> {
    #[serde(rename = "@Action")]
    action: LegacyAction,
    #[serde(rename = "@Version")]
    version: &'static str,
    #[serde(rename = "Reservation")]
    reservation: &'a T,
}

const ENVELOPE_VERSION: &str = "1.0";

pub fn create_fields(
    reservation: &CanonicalReservation,
) -> Result<LegacyReservationFields, TransformError> {
    validate_reservation(reservation)?;

    // validate_reservation guarantees at least one room and one guest
    let room = reservation
        .rooms
        .first()
        .ok_or_else(|| TransformError::single("rooms", "must contain at least one room"))?;
    let lead = reservation
        .guests
        .first()
        .ok_or_else(|| TransformError::single("guests", "must contain at least one guest"))?;
    let summary = age_code_summary(&reservation.guests);
    let payment = &reservation.payment;

    Ok(LegacyReservationFields {
        hotel_code: reservation.property_code.clone(),
        reservation_id: reservation.reservation_id.clone(),
        check_in: reservation.check_in,
        check_out: reservation.check_out,
        room_type_code: room.room_type_code.clone(),
        rate_plan_code: room.rate_plan_code.clone(),
        number_of_rooms: room.room_count,
        adults: summary.adult,
        children: summary.child,
        infants: summary.infant,
        guest_first_name: lead.first_name.clone(),
        guest_last_name: lead.last_name.clone(),
        guest_email: lead
            .email
            .clone()
            .or_else(|| reservation.contact_email.clone())
            .unwrap_or_default(),
        guest_phone: lead
            .phone
            .clone()
            .or_else(|| reservation.contact_phone.clone())
            .unwrap_or_default(),
        currency_code: payment.currency.clone(),
        total_amount: payment.total.to_string(),
        paid_amount: payment.paid.to_string(),
        discount_amount: payment.discount.to_string(),
        payment_method: payment.method.clone(),
        notes: reservation.notes.clone().unwrap_or_default(),
    })
}

pub fn modify_fields(
    reservation: &CanonicalReservation,
    new_check_in: NaiveDate,
    new_check_out: NaiveDate,
) -> LegacyModifyFields {
    LegacyModifyFields {
        hotel_code: reservation.property_code.clone(),
        reservation_id: reservation.booking_code().to_string(),
        check_in: new_check_in,
        check_out: new_check_out,
    }
}

pub fn cancel_fields(reservation: &CanonicalReservation, reason: Option<&str>) -> LegacyCancelFields {
    LegacyCancelFields {
        hotel_code: reservation.property_code.clone(),
        reservation_id: reservation.booking_code().to_string(),
        reason: reason.unwrap_or_default().to_string(),
    }
}

/// Serialize a field set into the request envelope
pub fn to_envelope<T: Serialize>(action: LegacyAction, fields: &T) -> Result<String, TransformError> {
    let envelope = Envelope {
        action,
        version: ENVELOPE_VERSION,
        reservation: fields,
    };
    quick_xml::se::to_string(&envelope).map_err(|e| TransformError::Serialization(e.to_string()))
}
