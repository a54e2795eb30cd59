pub mod seat_map;
pub mod eligibility;
pub mod priority;
pub mod suggestion;
pub mod assignment;
pub mod auto_assign;
pub mod events;
pub mod retry;
pub mod busy;
pub mod error;

pub use seat_map::{SeatConflict, SeatMap, SeatPosition, SeatStatus, Side};
pub use eligibility::{EligibilityFilter, Ineligibility};
pub use priority::{derived_age, AgeBucket, PriorityTier};
pub use suggestion::{suggest_seat, SeatSuggester, Suggestion};
pub use assignment::SeatAssigner;
pub use auto_assign::{AutoAssignReport, AutoAssigner, ItemOutcome};
pub use events::SeatEvent;
pub use retry::RetryPolicy;
pub use busy::BusyGate;
pub use error::{SeatingError, SeatingResult, ValidationError};
