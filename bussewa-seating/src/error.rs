use crate::eligibility::Ineligibility;
use bussewa_core::{Leg, StoreError};
use uuid::Uuid;

/// Request rejected before it reached the store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No bus selected")]
    MissingBus,

    #[error("Bus {0} has no seats")]
    InvalidCapacity(Uuid),

    #[error("Seat {seat_number} is outside 1..={capacity}")]
    SeatOutOfRange { seat_number: u32, capacity: u32 },

    #[error("Bus {bus_id} does not run the {leg} leg")]
    LegMismatch { bus_id: Uuid, leg: Leg },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Seat {seat_number} on bus {bus_id} ({leg}) is already taken by booking {holder}")]
    Conflict {
        bus_id: Uuid,
        leg: Leg,
        seat_number: u32,
        holder: Uuid,
    },

    #[error("Booking {booking_id} cannot be seated: {reason}")]
    NotEligible {
        booking_id: Uuid,
        reason: Ineligibility,
    },

    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl SeatingError {
    /// Same request may be sent again safely.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SeatingError::Network(_))
    }
}

impl From<StoreError> for SeatingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SeatingError::NotFound(id),
            StoreError::Conflict {
                bus_id,
                leg,
                seat_number,
                holder,
            } => SeatingError::Conflict {
                bus_id,
                leg,
                seat_number,
                holder,
            },
            StoreError::Unavailable(msg) => SeatingError::Network(msg),
            StoreError::Backend(msg) => SeatingError::Store(msg),
        }
    }
}

pub type SeatingResult<T> = Result<T, SeatingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        let id = Uuid::new_v4();
        assert_eq!(SeatingError::from(StoreError::NotFound(id)), SeatingError::NotFound(id));

        let network = SeatingError::from(StoreError::Unavailable("reset".to_string()));
        assert!(network.is_retryable());

        let backend = SeatingError::from(StoreError::Backend("constraint".to_string()));
        assert!(!backend.is_retryable());
    }
}
