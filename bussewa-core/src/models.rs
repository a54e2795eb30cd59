use crate::config::SeatingConfig;
use crate::leg::{Leg, LegSelection};
use crate::repository::BookingUpdate;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduled journey date for one leg
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Journey {
    pub id: Uuid,
    pub leg: Leg,
    pub date: NaiveDate,
    pub is_active: bool,
}

impl Journey {
    pub fn new(leg: Leg, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            leg,
            date,
            is_active: true,
        }
    }
}

/// Leg and date a bus is dedicated to, when it runs for a specific journey
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusJourney {
    pub leg: Leg,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bus {
    pub id: Uuid,
    pub number: String,
    pub capacity: u32,
    pub route_name: String,
    pub journey: Option<BusJourney>,
    pub is_active: bool,
}

impl Bus {
    pub fn new(number: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            capacity,
            route_name: String::new(),
            journey: None,
            is_active: true,
        }
    }

    /// New bus with the configured default seat count.
    pub fn from_config(number: impl Into<String>, config: &SeatingConfig) -> Self {
        Self::new(number, config.default_capacity)
    }

    pub fn with_journey(mut self, leg: Leg, date: NaiveDate) -> Self {
        self.journey = Some(BusJourney { leg, date });
        self
    }

    /// Date the bus is bound to, if it runs for a specific journey.
    pub fn journey_date(&self) -> Option<NaiveDate> {
        self.journey.map(|j| j.date)
    }

    /// Whether the bus can serve `leg`. Buses without a journey serve either.
    pub fn serves(&self, leg: Leg) -> bool {
        self.journey.map_or(true, |j| j.leg == leg)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    Paid,
    Partial,
    #[default]
    Pending,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BookingStatus {
    #[default]
    Active,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passenger {
    pub id: Uuid,
    pub name: String,
    /// Explicit age. Zero is treated as "not recorded".
    pub age: Option<u32>,
    /// Coarse age bucket label, e.g. "M-65 & Above".
    #[serde(default)]
    pub age_criteria: String,
    /// Family member this passenger travels with.
    pub related_to: Option<Uuid>,
}

impl Passenger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            age: None,
            age_criteria: String::new(),
            related_to: None,
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_age_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.age_criteria = criteria.into();
        self
    }
}

/// Seat placement of a booking on one leg
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegSeat {
    /// Empty means unassigned.
    #[serde(default)]
    pub seat_number: String,
    pub bus_id: Option<Uuid>,
    /// Travel date the booking holds for this leg.
    pub journey_date: Option<NaiveDate>,
}

impl LegSeat {
    /// Whether a seat is recorded at all. "0" is a legacy placeholder for none.
    pub fn is_assigned(&self) -> bool {
        let raw = self.seat_number.trim();
        !raw.is_empty() && raw != "0"
    }

    /// Numeric seat, if the recorded value parses.
    pub fn seat_index(&self) -> Option<u32> {
        self.seat_number.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    pub passenger: Passenger,
    #[serde(default)]
    pub leg_selection: LegSelection,
    #[serde(default)]
    pub onward: LegSeat,
    #[serde(default, rename = "return")]
    pub return_leg: LegSeat,
    pub payment_status: PaymentStatus,
    /// Lets an unpaid booking be seated anyway.
    #[serde(default)]
    pub allow_unpaid_allocation: bool,
    #[serde(default)]
    pub is_volunteer: bool,
    pub total_price_amount: i32,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub remarks: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(passenger: Passenger, leg_selection: LegSelection) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            passenger,
            leg_selection,
            onward: LegSeat::default(),
            return_leg: LegSeat::default(),
            payment_status: PaymentStatus::Pending,
            allow_unpaid_allocation: false,
            is_volunteer: false,
            total_price_amount: 0,
            status: BookingStatus::Active,
            remarks: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_payment(mut self, status: PaymentStatus) -> Self {
        self.payment_status = status;
        self
    }

    pub fn with_journey_date(mut self, leg: Leg, date: NaiveDate) -> Self {
        self.leg_mut(leg).journey_date = Some(date);
        self
    }

    pub fn leg(&self, leg: Leg) -> &LegSeat {
        match leg {
            Leg::Onward => &self.onward,
            Leg::Return => &self.return_leg,
        }
    }

    pub fn leg_mut(&mut self, leg: Leg) -> &mut LegSeat {
        match leg {
            Leg::Onward => &mut self.onward,
            Leg::Return => &mut self.return_leg,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Apply a partial update as the store would persist it
    pub fn apply(&mut self, update: &BookingUpdate) {
        if let Some(change) = &update.seat {
            let seat = self.leg_mut(change.leg);
            seat.seat_number = change.seat_number.clone();
            if let Some(bus_id) = change.bus_id {
                seat.bus_id = Some(bus_id);
            }
        }
        if let Some(flag) = update.is_volunteer {
            self.is_volunteer = flag;
        }
        if let Some(remarks) = &update.remarks {
            self.remarks = remarks.clone();
        }
        self.updated_at = Utc::now();
    }

    /// Release seats for the legs in `scope` and record what was held.
    ///
    /// Cancelling every booked leg cancels the booking; cancelling one leg of
    /// a round trip narrows the booking to the other leg.
    pub fn cancel(
        &mut self,
        scope: LegSelection,
        reason: CancellationReason,
        notes: impl Into<String>,
    ) -> SeatCancellation {
        let record = SeatCancellation {
            id: Uuid::new_v4(),
            booking_id: self.id,
            scope,
            reason,
            notes: notes.into(),
            original_onward_seat: self.onward.seat_number.clone(),
            original_return_seat: self.return_leg.seat_number.clone(),
            cancelled_at: Utc::now(),
        };

        for leg in scope.legs() {
            let seat = self.leg_mut(leg);
            seat.seat_number.clear();
            seat.bus_id = None;
        }

        let remaining: Vec<Leg> = self
            .leg_selection
            .legs()
            .filter(|leg| !scope.includes(*leg))
            .collect();
        match remaining.as_slice() {
            [leg] => self.leg_selection = LegSelection::from(*leg),
            [] => self.status = BookingStatus::Cancelled,
            _ => {}
        }
        self.updated_at = Utc::now();

        record
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CancellationReason {
    #[default]
    #[serde(rename = "Passenger Request")]
    PassengerRequest,
    #[serde(rename = "Medical Emergency")]
    MedicalEmergency,
    #[serde(rename = "Travel Plan Changed")]
    TravelPlanChanged,
    Other,
}

/// Audit record of seats released by a cancellation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatCancellation {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub scope: LegSelection,
    pub reason: CancellationReason,
    pub notes: String,
    pub original_onward_seat: String,
    pub original_return_seat: String,
    pub cancelled_at: DateTime<Utc>,
}
