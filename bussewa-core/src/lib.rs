pub mod leg;
pub mod models;
pub mod repository;
pub mod config;

pub use leg::{Leg, LegSelection};
pub use models::{
    Booking, BookingStatus, Bus, BusJourney, CancellationReason, Journey, LegSeat, Passenger,
    PaymentStatus, SeatCancellation,
};
pub use repository::{BookingStore, BookingUpdate, BusDirectory, LegSeatUpdate};

use uuid::Uuid;

/// Errors surfaced by the external booking store and bus directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Seat {seat_number} on bus {bus_id} ({leg}) is already held by booking {holder}")]
    Conflict {
        bus_id: Uuid,
        leg: Leg,
        seat_number: u32,
        holder: Uuid,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Transient failures that may be retried with the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
