// Format transformers
//
// Pure mappings from caller input to the canonical reservation and from the
// canonical reservation to each provider's wire format.

pub mod canonical;
pub mod error;
pub mod legacy_xml;
pub mod modern_rest;

pub use canonical::*;
pub use error::*;

use chrono::Utc;

/// Reservation id used when the caller did not supply one
pub fn generate_reservation_id() -> String {
    format!("RES-{}", Utc::now().timestamp_millis())
}

/// Keep a caller-supplied id, or generate one when it is empty or whitespace
pub fn resolve_reservation_id(supplied: &str) -> String {
    if supplied.trim().is_empty() {
        generate_reservation_id()
    } else {
        supplied.to_string()
    }
}
