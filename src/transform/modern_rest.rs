// Modern REST provider payloads

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::reservations::{CanonicalReservation, Guest, RoomLine};
use crate::transform::{validate_reservation, TransformError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernRestGuest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub user_type: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

impl From<&Guest> for ModernRestGuest {
    fn from(guest: &Guest) -> Self {
        let address = guest.address.clone().unwrap_or_default();
        Self {
            first_name: guest.first_name.clone(),
            last_name: guest.last_name.clone(),
            email: guest.email.clone().unwrap_or_default(),
            phone: guest.phone.clone().unwrap_or_default(),
            user_type: guest.guest_type.as_str().to_string(),
            address: address.address.unwrap_or_default(),
            city: address.city.unwrap_or_default(),
            state: address.state.unwrap_or_default(),
            country: address.country.unwrap_or_default(),
            zip_code: address.zip_code.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernRestRoom {
    pub room_type_code: String,
    pub rate_plan_code: String,
    pub number_of_rooms: i32,
}

impl From<&RoomLine> for ModernRestRoom {
    fn from(room: &RoomLine) -> Self {
        Self {
            room_type_code: room.room_type_code.clone(),
            rate_plan_code: room.rate_plan_code.clone(),
            number_of_rooms: room.room_count,
        }
    }
}

/// Create body for `POST {endpoint}{propertyCode}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernRestBooking {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(rename = "Guests")]
    pub guests: Vec<ModernRestGuest>,
    pub booked_at: DateTime<Utc>,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub discounted_amount: Decimal,
    pub payment_note: String,
    pub currency_code: String,
    pub payment_method: String,
    #[serde(rename = "Rooms")]
    pub rooms: Vec<ModernRestRoom>,
    pub additional_notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernRestAmend {
    pub booking_code: String,
    pub new_from_date: NaiveDate,
    pub new_to_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernRestCancel {
    pub booking_code: String,
}

pub fn to_create(reservation: &CanonicalReservation) -> Result<ModernRestBooking, TransformError> {
    validate_reservation(reservation)?;

    let payment = &reservation.payment;
    Ok(ModernRestBooking {
        from: reservation.check_in,
        to: reservation.check_out,
        guests: reservation.guests.iter().map(ModernRestGuest::from).collect(),
        booked_at: reservation.created_at,
        total_amount: payment.total,
        paid_amount: payment.paid,
        discounted_amount: payment.discount,
        payment_note: payment_note(reservation),
        currency_code: payment.currency.clone(),
        payment_method: payment.method.clone(),
        rooms: reservation.rooms.iter().map(ModernRestRoom::from).collect(),
        additional_notes: reservation.notes.clone().unwrap_or_default(),
    })
}

pub fn to_amend(
    reservation: &CanonicalReservation,
    new_check_in: NaiveDate,
    new_check_out: NaiveDate,
) -> ModernRestAmend {
    ModernRestAmend {
        booking_code: reservation.booking_code().to_string(),
        new_from_date: new_check_in,
        new_to_date: new_check_out,
    }
}

pub fn to_cancel(reservation: &CanonicalReservation) -> ModernRestCancel {
    ModernRestCancel {
        booking_code: reservation.booking_code().to_string(),
    }
}

fn payment_note(reservation: &CanonicalReservation) -> String {
    let payment = &reservation.payment;
    let outstanding = (payment.total - payment.discount - payment.paid).max(Decimal::ZERO);
    if payment.method.is_empty() {
        format!("Paid {} {}, outstanding {}", payment.paid, payment.currency, outstanding)
    } else {
        format!(
            "Paid {} {} by {}, outstanding {}",
            payment.paid, payment.currency, payment.method, outstanding
        )
    }
}
