use serde::{Deserialize, Serialize};

/// Server action codes. Unknown codes are kept as `Other` and animate with
/// the species' idle entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Idle,
    Walk,
    Eat,
    Sleep,
    Dead,
    Mate,
    Pregnant,
    Breed,
    Hunt,
    #[serde(skip)]
    Other(u8),
}

impl Action {
    pub fn from_id(id: u8) -> Self {
        use Action::*;
        match id {
            0 => Idle,
            1 => Walk,
            2 => Eat,
            3 => Sleep,
            4 => Dead,
            5 => Mate,
            6 => Pregnant,
            7 => Breed,
            8 => Hunt,
            other => Other(other),
        }
    }

    pub fn id(self) -> u8 {
        use Action::*;
        match self {
            Idle => 0,
            Walk => 1,
            Eat => 2,
            Sleep => 3,
            Dead => 4,
            Mate => 5,
            Pregnant => 6,
            Breed => 7,
            Hunt => 8,
            Other(id) => id,
        }
    }

    pub fn is_dead(self) -> bool {
        self == Action::Dead
    }

    /// What an entity shows once its motion run ends
    /// ┌──────────────────────────┬──────────────────────────────┐
    /// │ action                   │ resting animation            │
    /// ├──────────────────────────┼──────────────────────────────┤
    /// │ Dead                     │ Dead (bones, rendered once)  │
    /// │ Mate / Pregnant / Breed  │ same, secondary sheet        │
    /// │ Eat / Sleep              │ same                         │
    /// │ anything else            │ Idle                         │
    /// └──────────────────────────┴──────────────────────────────┘
    pub fn after_motion(self) -> Action {
        use Action::*;
        match self {
            Dead | Mate | Pregnant | Breed | Eat | Sleep => self,
            _ => Idle,
        }
    }
}
