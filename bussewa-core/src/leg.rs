use serde::{Deserialize, Serialize};
use std::fmt;

/// One directional half of a round trip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Leg {
    Onward,
    Return,
}

impl Leg {
    pub const ALL: [Leg; 2] = [Leg::Onward, Leg::Return];

    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Onward => "ONWARD",
            Leg::Return => "RETURN",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which legs a booking travels on. Older records carry no selection at all,
/// which reads as both legs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegSelection {
    Onward,
    Return,
    #[default]
    #[serde(alias = "")]
    Both,
}

impl LegSelection {
    pub fn includes(&self, leg: Leg) -> bool {
        match self {
            LegSelection::Both => true,
            LegSelection::Onward => leg == Leg::Onward,
            LegSelection::Return => leg == Leg::Return,
        }
    }

    /// Legs covered by this selection, onward first.
    pub fn legs(&self) -> impl Iterator<Item = Leg> + '_ {
        Leg::ALL.into_iter().filter(move |leg| self.includes(*leg))
    }
}

impl From<Leg> for LegSelection {
    fn from(leg: Leg) -> Self {
        match leg {
            Leg::Onward => LegSelection::Onward,
            Leg::Return => LegSelection::Return,
        }
    }
}
