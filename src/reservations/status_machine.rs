use crate::reservations::ReservationStatus;

/// Service for managing reservation status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Failed, Cancelled
    /// - Failed → Pending, Confirmed, Cancelled (retry or abandon)
    /// - Confirmed → Cancelled
    /// - Cancelled → (terminal)
    /// - Any status → Same status (idempotent)
    pub fn is_valid_transition(from: ReservationStatus, to: ReservationStatus) -> bool {
        if from == to {
            return true;
        }

        match (from, to) {
            (ReservationStatus::Pending, ReservationStatus::Confirmed) => true,
            (ReservationStatus::Pending, ReservationStatus::Failed) => true,
            (ReservationStatus::Pending, ReservationStatus::Cancelled) => true,

            (ReservationStatus::Failed, ReservationStatus::Pending) => true,
            (ReservationStatus::Failed, ReservationStatus::Confirmed) => true,
            (ReservationStatus::Failed, ReservationStatus::Cancelled) => true,

            (ReservationStatus::Confirmed, ReservationStatus::Cancelled) => true,

            (ReservationStatus::Cancelled, _) => false,

            _ => false,
        }
    }

    /// Attempt to transition from one status to another
    ///
    /// Returns `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<ReservationStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!(
                "Invalid status transition from {} to {}",
                from, to
            ))
        }
    }

    /// Only confirmed reservations can have their dates amended
    pub fn can_amend(status: ReservationStatus) -> Result<(), String> {
        if status == ReservationStatus::Confirmed {
            Ok(())
        } else {
            Err(format!("Cannot amend a {} reservation", status))
        }
    }

    /// Cancellation must move the reservation somewhere new
    pub fn can_cancel(status: ReservationStatus) -> Result<(), String> {
        if status == ReservationStatus::Cancelled {
            return Err("Reservation is already cancelled".to_string());
        }
        Self::transition(status, ReservationStatus::Cancelled).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = ReservationStatus> {
        prop_oneof![
            Just(ReservationStatus::Pending),
            Just(ReservationStatus::Confirmed),
            Just(ReservationStatus::Failed),
            Just(ReservationStatus::Cancelled),
        ]
    }

    #[test]
    fn test_valid_transitions() {
        let valid = vec![
            (ReservationStatus::Pending, ReservationStatus::Confirmed),
            (ReservationStatus::Pending, ReservationStatus::Failed),
            (ReservationStatus::Pending, ReservationStatus::Cancelled),
            (ReservationStatus::Failed, ReservationStatus::Pending),
            (ReservationStatus::Failed, ReservationStatus::Confirmed),
            (ReservationStatus::Confirmed, ReservationStatus::Cancelled),
        ];

        for (from, to) in valid {
            assert!(
                StatusMachine::is_valid_transition(from, to),
                "Transition from {} to {} should be allowed",
                from,
                to
            );
            assert_eq!(StatusMachine::transition(from, to), Ok(to));
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let invalid = vec![
            (ReservationStatus::Confirmed, ReservationStatus::Pending),
            (ReservationStatus::Confirmed, ReservationStatus::Failed),
            (ReservationStatus::Cancelled, ReservationStatus::Pending),
            (ReservationStatus::Cancelled, ReservationStatus::Confirmed),
            (ReservationStatus::Cancelled, ReservationStatus::Failed),
        ];

        for (from, to) in invalid {
            assert!(
                !StatusMachine::is_valid_transition(from, to),
                "Transition from {} to {} should be rejected",
                from,
                to
            );
            assert!(StatusMachine::transition(from, to).is_err());
        }
    }

    #[test]
    fn test_amend_requires_confirmed() {
        assert!(StatusMachine::can_amend(ReservationStatus::Confirmed).is_ok());
        assert!(StatusMachine::can_amend(ReservationStatus::Pending).is_err());
        assert!(StatusMachine::can_amend(ReservationStatus::Cancelled).is_err());
    }

    #[test]
    fn test_cancel_rules() {
        assert!(StatusMachine::can_cancel(ReservationStatus::Confirmed).is_ok());
        assert!(StatusMachine::can_cancel(ReservationStatus::Pending).is_ok());
        assert_eq!(
            StatusMachine::can_cancel(ReservationStatus::Cancelled),
            Err("Reservation is already cancelled".to_string())
        );
    }

    /// Same-status transitions are always valid
    #[test]
    fn prop_same_status_is_valid() {
        proptest!(|(status in status_strategy())| {
            prop_assert!(StatusMachine::is_valid_transition(status, status));
        });
    }

    /// Cancelled is terminal
    #[test]
    fn prop_cancelled_is_terminal() {
        proptest!(|(to in status_strategy())| {
            if to != ReservationStatus::Cancelled {
                prop_assert!(!StatusMachine::is_valid_transition(ReservationStatus::Cancelled, to));
            }
        });
    }

    /// transition() agrees with is_valid_transition()
    #[test]
    fn prop_transition_consistency() {
        proptest!(|(from in status_strategy(), to in status_strategy())| {
            let is_valid = StatusMachine::is_valid_transition(from, to);
            let result = StatusMachine::transition(from, to);
            if is_valid {
                prop_assert_eq!(result, Ok(to));
            } else {
                prop_assert!(result.is_err());
            }
        });
    }
}
