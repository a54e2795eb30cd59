use bussewa_core::{Leg, LegSelection};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Published after a seat write lands in the store. Subscribers rebuild
/// their seat map; the event carries no occupancy state of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatEvent {
    SeatAssigned {
        booking_id: Uuid,
        bus_id: Uuid,
        leg: Leg,
        seat_number: u32,
        at: i64,
    },
    SeatCleared {
        booking_id: Uuid,
        leg: Leg,
        previous_seat: String,
        at: i64,
    },
    BusChanged {
        booking_id: Uuid,
        leg: Leg,
        bus_id: Uuid,
        at: i64,
    },
    VolunteerChanged {
        booking_id: Uuid,
        is_volunteer: bool,
        at: i64,
    },
    BookingCancelled {
        booking_id: Uuid,
        scope: LegSelection,
        at: i64,
    },
}

impl SeatEvent {
    pub fn booking_id(&self) -> Uuid {
        match self {
            SeatEvent::SeatAssigned { booking_id, .. }
            | SeatEvent::SeatCleared { booking_id, .. }
            | SeatEvent::BusChanged { booking_id, .. }
            | SeatEvent::VolunteerChanged { booking_id, .. }
            | SeatEvent::BookingCancelled { booking_id, .. } => *booking_id,
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            SeatEvent::SeatAssigned { .. } => "seats.assigned",
            SeatEvent::SeatCleared { .. } => "seats.cleared",
            SeatEvent::BusChanged { .. } => "seats.bus_changed",
            SeatEvent::VolunteerChanged { .. } => "bookings.volunteer",
            SeatEvent::BookingCancelled { .. } => "bookings.cancelled",
        }
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub(crate) fn now() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_tagged() {
        let event = SeatEvent::SeatAssigned {
            booking_id: Uuid::nil(),
            bus_id: Uuid::nil(),
            leg: Leg::Return,
            seat_number: 4,
            at: 0,
        };

        let payload: serde_json::Value = serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert_eq!(payload["type"], "SEAT_ASSIGNED");
        assert_eq!(payload["leg"], "RETURN");
        assert_eq!(payload["seat_number"], 4);
        assert_eq!(event.topic(), "seats.assigned");
    }
}
