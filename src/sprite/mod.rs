// TABLE:
// ┌──────────────────────────────────────────────────────────────────────────┐
// │                   Sprite Configuration At A Glance                       │
// ├────────────────┬──────────────────────┬──────────────────────────────────┤
// │   Code File    │   Code Component     │         What It Answers          │
// ├────────────────┼──────────────────────┼──────────────────────────────────┤
// │   mod.rs       │ MAX_SCALE            │ resolution the sheets are drawn  │
// │                │ SheetKind            │ which image a node shows         │
// │                │ Background           │ sheet + offset written to a node │
// ├────────────────┼──────────────────────┼──────────────────────────────────┤
// │   action.rs    │ Action               │ server action code -> behaviour  │
// ├────────────────┼──────────────────────┼──────────────────────────────────┤
// │   species.rs   │ SpeciesConfig        │ frame size, speed, shadow ratio  │
// │                │ ActionSprite         │ row, frame count, frame delay    │
// │                │ SpeciesTable         │ built-in or loaded species.json  │
// └────────────────┴──────────────────────┴──────────────────────────────────┘
pub mod action;
pub mod species;

pub use action::Action;
pub use species::{ActionSprite, GrowthRange, SpeciesConfig, SpeciesTable, SpriteSize};

use crate::engine::Point;
use serde::{Deserialize, Serialize};

/// Sheets are authored for the largest zoom level, smaller levels shrink
/// every frame by `scale_level / MAX_SCALE`
pub const MAX_SCALE: f64 = 4.0;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetKind {
    #[default]
    Primary,
    /// mating, pregnancy and breeding poses
    Secondary,
    /// terminal remains, painted once
    Bones,
}

impl SheetKind {
    pub fn name(self) -> &'static str {
        match self {
            SheetKind::Primary => "primary",
            SheetKind::Secondary => "secondary",
            SheetKind::Bones => "bones",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Background {
    pub sheet: SheetKind,
    pub offset: Point,
}

impl Background {
    pub fn css_position(&self) -> String {
        format!("{}px {}px", self.offset.x, self.offset.y)
    }
}
