use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::properties::PmsConfig;
use crate::reservations::{
    AgeCodeSummary, AppliedPromo, BookingDetails, CanonicalReservation, Guest, GuestAddress,
    GuestInput, GuestType, PaymentSummary, ReservationStatus, RoomLine,
};
use crate::transform::{resolve_reservation_id, FieldViolation, TransformError};
use crate::validation::{parse_calendar_date, validate_currency_code};

/// Build a canonical reservation from caller-supplied booking details
///
/// All field problems are collected and reported together. The resulting
/// reservation is `Pending` and carries no external id.
pub fn canonicalize(
    config: &PmsConfig,
    details: &BookingDetails,
    now: DateTime<Utc>,
) -> Result<CanonicalReservation, TransformError> {
    let mut violations = Vec::new();

    let hotel_code = details.hotel_code.trim();
    if !hotel_code.is_empty() && hotel_code != config.property_code {
        violations.push(FieldViolation::new(
            "hotelCode",
            format!("does not match property code {}", config.property_code),
        ));
    }

    let dates = parse_stay_range(
        ("checkInDate", &details.check_in_date),
        ("checkOutDate", &details.check_out_date),
        &mut violations,
    );

    let guests: Vec<Guest> = details
        .guests
        .iter()
        .enumerate()
        .filter_map(|(index, input)| to_guest(index, input, &mut violations))
        .collect();

    // Only comparable when every guest parsed
    if let Some(claimed) = details.age_code_summary {
        let actual = age_code_summary(&guests);
        if guests.len() == details.guests.len() && claimed != actual {
            violations.push(FieldViolation::new(
                "ageCodeSummary",
                format!(
                    "does not match the guest list (adult {}, child {}, infant {})",
                    actual.adult, actual.child, actual.infant
                ),
            ));
        }
    }

    let rooms = vec![RoomLine {
        room_type_code: details.room_type_code.trim().to_string(),
        rate_plan_code: details.rate_plan_code.trim().to_string(),
        room_count: details.number_of_rooms,
    }];

    let promo = details.promo_code.as_ref().map(|promo| AppliedPromo {
        promo_id: promo.promo_id,
        discount_amount: promo.discount_amount,
    });

    let payment = PaymentSummary {
        currency: details.currency_code.trim().to_string(),
        total: details.room_total_price,
        paid: details.paid_amount.unwrap_or(details.room_total_price),
        discount: details
            .discount_amount
            .or(promo.as_ref().map(|p| p.discount_amount))
            .unwrap_or(Decimal::ZERO),
        method: details.payment_method.trim().to_string(),
    };
    if validate_currency_code(&payment.currency).is_err() {
        violations.push(FieldViolation::new(
            "currencyCode",
            "must be a three-letter upper-case currency code",
        ));
    }

    // Guest count is checked against the raw input so that a guest with an
    // unknown type is not reported twice
    if details.guests.is_empty() {
        violations.push(FieldViolation::new("guests", "must contain at least one guest"));
    }
    check_rooms(&rooms, &mut violations);
    check_payment(&payment, &mut violations);

    let (check_in, check_out) = match dates {
        Some(dates) if violations.is_empty() => dates,
        _ => return Err(TransformError::Validation(violations)),
    };

    Ok(CanonicalReservation {
        reservation_id: resolve_reservation_id(&details.reservation_id),
        property_id: config.property_id,
        property_code: config.property_code.clone(),
        hotel_name: non_blank(details.hotel_name.as_deref())
            .or_else(|| Some(config.property_name.clone())),
        check_in,
        check_out,
        rooms,
        guests,
        payment,
        contact_email: non_blank(details.email.as_deref()),
        contact_phone: non_blank(details.phone.as_deref()),
        customer_id: non_blank(details.user_id.as_deref()),
        notes: non_blank(details.notes.as_deref()),
        promo,
        status: ReservationStatus::Pending,
        external_id: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn age_code_summary(guests: &[Guest]) -> AgeCodeSummary {
    guests
        .iter()
        .fold(AgeCodeSummary::default(), |mut summary, guest| {
            match guest.guest_type {
                GuestType::Adult => summary.adult += 1,
                GuestType::Child => summary.child += 1,
                GuestType::Infant => summary.infant += 1,
            }
            summary
        })
}

/// Re-check a canonical reservation before it is handed to a provider
pub fn validate_reservation(reservation: &CanonicalReservation) -> Result<(), TransformError> {
    let mut violations = Vec::new();

    if reservation.check_in >= reservation.check_out {
        violations.push(FieldViolation::new(
            "checkOutDate",
            "must be after checkInDate",
        ));
    }
    if reservation.guests.is_empty() {
        violations.push(FieldViolation::new("guests", "must contain at least one guest"));
    }
    for (index, guest) in reservation.guests.iter().enumerate() {
        check_guest_names(index, &guest.first_name, &guest.last_name, &mut violations);
    }
    check_rooms(&reservation.rooms, &mut violations);
    check_payment(&reservation.payment, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(TransformError::Validation(violations))
    }
}

/// Parse and order-check a new stay range (used by amendments)
pub fn parse_amended_stay(
    new_check_in: &str,
    new_check_out: &str,
) -> Result<(NaiveDate, NaiveDate), TransformError> {
    let mut violations = Vec::new();
    match parse_stay_range(
        ("newCheckInDate", new_check_in),
        ("newCheckOutDate", new_check_out),
        &mut violations,
    ) {
        Some(range) if violations.is_empty() => Ok(range),
        _ => Err(TransformError::Validation(violations)),
    }
}

fn parse_stay_range(
    (in_field, in_raw): (&str, &str),
    (out_field, out_raw): (&str, &str),
    violations: &mut Vec<FieldViolation>,
) -> Option<(NaiveDate, NaiveDate)> {
    let check_in = parse_calendar_date(in_raw);
    if check_in.is_none() {
        violations.push(FieldViolation::new(in_field, "must be a valid calendar date"));
    }
    let check_out = parse_calendar_date(out_raw);
    if check_out.is_none() {
        violations.push(FieldViolation::new(out_field, "must be a valid calendar date"));
    }

    let (check_in, check_out) = (check_in?, check_out?);
    if check_in >= check_out {
        violations.push(FieldViolation::new(
            out_field,
            format!("must be after {}", in_field),
        ));
        return None;
    }
    Some((check_in, check_out))
}

fn to_guest(
    index: usize,
    input: &GuestInput,
    violations: &mut Vec<FieldViolation>,
) -> Option<Guest> {
    check_guest_names(index, &input.first_name, &input.last_name, violations);

    let guest_type = if input.user_type.trim().is_empty() {
        GuestType::Adult
    } else {
        match GuestType::parse(&input.user_type) {
            Some(guest_type) => guest_type,
            None => {
                violations.push(FieldViolation::new(
                    format!("guests[{}].userType", index),
                    "must be adult, child or infant",
                ));
                return None;
            }
        }
    };

    let address = GuestAddress {
        address: non_blank(input.address.as_deref()),
        city: non_blank(input.city.as_deref()),
        state: non_blank(input.state.as_deref()),
        country: non_blank(input.country.as_deref()),
        zip_code: non_blank(input.zip_code.as_deref()),
    };

    Some(Guest {
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        email: non_blank(input.email.as_deref()),
        phone: non_blank(input.phone.as_deref()),
        guest_type,
        address: if address.is_empty() { None } else { Some(address) },
    })
}

fn check_guest_names(
    index: usize,
    first_name: &str,
    last_name: &str,
    violations: &mut Vec<FieldViolation>,
) {
    if first_name.trim().is_empty() {
        violations.push(FieldViolation::new(
            format!("guests[{}].firstName", index),
            "is required",
        ));
    }
    if last_name.trim().is_empty() {
        violations.push(FieldViolation::new(
            format!("guests[{}].lastName", index),
            "is required",
        ));
    }
}

fn check_rooms(rooms: &[RoomLine], violations: &mut Vec<FieldViolation>) {
    if rooms.is_empty() {
        violations.push(FieldViolation::new("rooms", "must contain at least one room"));
    }
    for room in rooms {
        if room.room_type_code.trim().is_empty() {
            violations.push(FieldViolation::new("roomTypeCode", "is required"));
        }
        if room.rate_plan_code.trim().is_empty() {
            violations.push(FieldViolation::new("ratePlanCode", "is required"));
        }
        if room.room_count <= 0 {
            violations.push(FieldViolation::new("numberOfRooms", "must be greater than 0"));
        }
    }
}

fn check_payment(payment: &PaymentSummary, violations: &mut Vec<FieldViolation>) {
    if payment.total < Decimal::ZERO {
        violations.push(FieldViolation::new("roomTotalPrice", "must not be negative"));
    }
    if payment.paid < Decimal::ZERO {
        violations.push(FieldViolation::new("paidAmount", "must not be negative"));
    }
    if payment.discount < Decimal::ZERO {
        violations.push(FieldViolation::new("discountAmount", "must not be negative"));
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
