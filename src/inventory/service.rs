use std::sync::Arc;

use chrono::NaiveDate;

use crate::inventory::{InventoryError, InventoryRecord, InventoryRepository, StayRooms};

/// Validates and applies room-count changes for stays
#[derive(Clone)]
pub struct InventoryManager {
    repository: Arc<dyn InventoryRepository>,
}

impl InventoryManager {
    pub fn new(repository: Arc<dyn InventoryRepository>) -> Self {
        Self { repository }
    }

    /// Take rooms for every night of a stay, all or nothing
    ///
    /// Every night is read and checked first; a missing night or a count below
    /// the requested rooms aborts without writing. The write itself is guarded
    /// per row, so a concurrent booking that wins the race still leaves this
    /// one failing cleanly.
    pub async fn reduce_rooms(&self, stay: &StayRooms) -> Result<(), InventoryError> {
        self.check_availability(stay).await?;
        self.repository.decrement_nights(stay).await?;

        tracing::info!(
            hotel_code = %stay.hotel_code,
            room_type_code = %stay.room_type_code,
            room_count = stay.room_count,
            check_in = %stay.check_in,
            check_out = %stay.check_out,
            "Inventory reduced"
        );
        Ok(())
    }

    /// Read-only availability check for a stay
    pub async fn check_availability(&self, stay: &StayRooms) -> Result<(), InventoryError> {
        validate_stay(stay)?;

        let records = self
            .repository
            .find_range(&stay.hotel_code, &stay.room_type_code, stay.check_in, stay.check_out)
            .await?;

        match stay.shortfall(&records) {
            Some(err) => {
                tracing::debug!(hotel_code = %stay.hotel_code, "{}", err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Give a stay's rooms back to inventory
    pub async fn release_rooms(&self, stay: &StayRooms) -> Result<(), InventoryError> {
        validate_stay(stay)?;
        self.repository.increment_nights(stay).await?;

        tracing::info!(
            hotel_code = %stay.hotel_code,
            room_type_code = %stay.room_type_code,
            room_count = stay.room_count,
            "Inventory released"
        );
        Ok(())
    }

    /// Whether counts are kept for this room type at all
    pub async fn is_tracked(
        &self,
        hotel_code: &str,
        room_type_code: &str,
    ) -> Result<bool, InventoryError> {
        self.repository.is_tracked(hotel_code, room_type_code).await
    }

    pub async fn list_range(
        &self,
        hotel_code: &str,
        room_type_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<InventoryRecord>, InventoryError> {
        if from > to {
            return Err(InventoryError::Invalid(
                "from must not be after to".to_string(),
            ));
        }
        self.repository
            .find_range(hotel_code, room_type_code, from, to)
            .await
    }
}

fn validate_stay(stay: &StayRooms) -> Result<(), InventoryError> {
    if stay.hotel_code.trim().is_empty() {
        return Err(InventoryError::Invalid("hotel code is required".to_string()));
    }
    if stay.room_type_code.trim().is_empty() {
        return Err(InventoryError::Invalid("room type code is required".to_string()));
    }
    if stay.room_count <= 0 {
        return Err(InventoryError::Invalid(
            "room count must be greater than 0".to_string(),
        ));
    }
    if stay.check_in >= stay.check_out {
        return Err(InventoryError::Invalid(
            "check-in must be before check-out".to_string(),
        ));
    }
    Ok(())
}
