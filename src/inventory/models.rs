use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::inventory::InventoryError;

/// Available rooms of one room type on one night
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub hotel_code: String,
    pub room_type_code: String,
    pub date: NaiveDate,
    pub count: i32,
}

/// Query parameters for the inventory listing endpoint
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InventoryQuery {
    pub hotel_code: String,
    pub room_type_code: String,
    /// First night (inclusive), YYYY-MM-DD
    pub from: String,
    /// End of range (exclusive), YYYY-MM-DD
    pub to: String,
}

/// Rooms of one type over a stay `[check_in, check_out)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayRooms {
    pub hotel_code: String,
    pub room_type_code: String,
    pub room_count: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRooms {
    /// One date per night of the stay
    pub fn nights(&self) -> Vec<NaiveDate> {
        self.check_in
            .iter_days()
            .take_while(|date| *date < self.check_out)
            .collect()
    }

    /// First night whose record is missing or holds fewer rooms than requested
    pub fn shortfall(&self, records: &[InventoryRecord]) -> Option<InventoryError> {
        self.nights().into_iter().find_map(|date| {
            let available = records
                .iter()
                .find(|record| record.date == date)
                .map_or(0, |record| record.count);
            (available < self.room_count).then(|| InventoryError::InsufficientAvailability {
                date,
                requested: self.room_count,
                available,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stay(check_in: NaiveDate, check_out: NaiveDate) -> StayRooms {
        StayRooms {
            hotel_code: "HTL001".to_string(),
            room_type_code: "DBL".to_string(),
            room_count: 1,
            check_in,
            check_out,
        }
    }

    #[test]
    fn test_nights_are_half_open() {
        let check_in = NaiveDate::from_ymd_opt(2030, 12, 30).unwrap();
        let check_out = NaiveDate::from_ymd_opt(2031, 1, 2).unwrap();

        assert_eq!(
            stay(check_in, check_out).nights(),
            vec![
                NaiveDate::from_ymd_opt(2030, 12, 30).unwrap(),
                NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2031, 1, 1).unwrap(),
            ]
        );
        assert!(stay(check_in, check_in).nights().is_empty());
    }

    /// Expansion yields exactly one consecutive date per night
    #[test]
    fn prop_nights_cover_range() {
        proptest!(|(offset in 0i64..3000, length in 1i64..60)| {
            let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
            let check_in = base + chrono::Duration::days(offset);
            let check_out = check_in + chrono::Duration::days(length);
            let nights = stay(check_in, check_out).nights();

            prop_assert_eq!(nights.len() as i64, length);
            prop_assert_eq!(nights[0], check_in);
            prop_assert!(nights.windows(2).all(|w| (w[1] - w[0]).num_days() == 1));
            prop_assert!(nights.iter().all(|d| *d < check_out));
        });
    }
}
