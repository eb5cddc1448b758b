use super::action::Action;
use super::{SheetKind, MAX_SCALE};
use crate::engine::{Point, Size};
use crate::browser;
use crate::entity::Species;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One row of a species sprite sheet
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSprite {
    pub action: Action,
    #[serde(default)]
    pub sheet: SheetKind,
    #[serde(default)]
    pub row: u32,
    pub frames: u32,
    pub delay_ms: f64,
}

impl ActionSprite {
    const FALLBACK: ActionSprite = ActionSprite {
        action: Action::Idle,
        sheet: SheetKind::Primary,
        row: 0,
        frames: 1,
        delay_ms: 0.0,
    };

    /// single frame entries are painted once and never cycled
    pub fn cycles(&self) -> bool {
        self.frames > 1 && self.sheet != SheetKind::Bones
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteSize {
    pub width: f64,
    pub height: f64,
}

/// Everything that differs between rabbits and wolves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesConfig {
    pub species: Species,
    /// frame size as authored, i.e. at `MAX_SCALE`
    pub sprite: SpriteSize,
    /// tiles per second
    pub speed: f64,
    #[serde(default = "default_shadow_ratio")]
    pub shadow_ratio: f64,
    pub growth: GrowthRange,
    pub moving_actions: Vec<Action>,
    pub actions: Vec<ActionSprite>,
}

fn default_shadow_ratio() -> f64 {
    1.0
}

impl SpeciesConfig {
    pub fn sprite_for(&self, action: Action) -> ActionSprite {
        self.actions
            .iter()
            .find(|entry| entry.action == action)
            .or_else(|| self.actions.iter().find(|entry| entry.action == Action::Idle))
            .copied()
            .unwrap_or(ActionSprite::FALLBACK)
    }

    pub fn resolves_to_movement(&self, action: Action) -> bool {
        self.moving_actions.contains(&action)
    }

    /// Clamps `growth` into the species range and maps it onto a render
    /// scale in [0.5, 1.0]. Missing or negative growth renders at minimum.
    pub fn growth_scale(&self, growth: Option<i64>) -> (u32, f64) {
        let GrowthRange { min, max } = self.growth;
        let growth = match growth {
            Some(value) if value >= 0 => (value.min(u32::MAX as i64) as u32).clamp(min, max.max(min)),
            _ => min,
        };
        let span = max.saturating_sub(min);
        let ratio = if span == 0 {
            1.0
        } else {
            (growth - min) as f64 / span as f64
        };
        (growth, 0.5 + 0.5 * ratio)
    }

    /// Node size in pixels at the given camera scale level
    pub fn layout_size(&self, scale_level: f64) -> Size {
        Size {
            width: self.sprite.width / MAX_SCALE * scale_level,
            height: self.sprite.height / MAX_SCALE * scale_level,
        }
    }

    /// Background position showing `frame` of `entry`
    pub fn sheet_offset(&self, entry: &ActionSprite, frame: u32, scale_level: f64) -> Point {
        let step = self.layout_size(scale_level);
        Point {
            x: -(frame as f64 * step.width),
            y: -(entry.row as f64 * step.height),
        }
    }
}

/// Species configuration, usually the built-in one or `species.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTable {
    pub species: Vec<SpeciesConfig>,
}

static RABBIT: Lazy<SpeciesConfig> = Lazy::new(|| SpeciesConfig {
    species: Species::Rabbit,
    sprite: SpriteSize {
        width: 128.0,
        height: 128.0,
    },
    speed: 1.5,
    shadow_ratio: 1.0,
    growth: GrowthRange { min: 1, max: 10 },
    moving_actions: vec![
        Action::Idle,
        Action::Walk,
        Action::Eat,
        Action::Sleep,
        Action::Dead,
    ],
    actions: vec![
        sprite(Action::Idle, SheetKind::Primary, 0, 4, 240.0),
        sprite(Action::Walk, SheetKind::Primary, 1, 6, 120.0),
        sprite(Action::Eat, SheetKind::Primary, 2, 4, 300.0),
        sprite(Action::Sleep, SheetKind::Primary, 3, 2, 600.0),
        sprite(Action::Dead, SheetKind::Bones, 0, 1, 0.0),
        sprite(Action::Mate, SheetKind::Secondary, 0, 1, 0.0),
        sprite(Action::Pregnant, SheetKind::Secondary, 1, 1, 0.0),
        sprite(Action::Breed, SheetKind::Secondary, 2, 1, 0.0),
    ],
});

static WOLF: Lazy<SpeciesConfig> = Lazy::new(|| SpeciesConfig {
    species: Species::Wolf,
    sprite: SpriteSize {
        width: 192.0,
        height: 160.0,
    },
    speed: 2.5,
    shadow_ratio: 1.4,
    growth: GrowthRange { min: 1, max: 20 },
    moving_actions: vec![
        Action::Idle,
        Action::Walk,
        Action::Eat,
        Action::Sleep,
        Action::Dead,
        Action::Hunt,
    ],
    actions: vec![
        sprite(Action::Idle, SheetKind::Primary, 0, 4, 300.0),
        sprite(Action::Walk, SheetKind::Primary, 1, 8, 90.0),
        sprite(Action::Eat, SheetKind::Primary, 2, 6, 180.0),
        sprite(Action::Sleep, SheetKind::Primary, 3, 2, 720.0),
        sprite(Action::Hunt, SheetKind::Primary, 4, 8, 60.0),
        sprite(Action::Dead, SheetKind::Bones, 0, 1, 0.0),
        sprite(Action::Mate, SheetKind::Secondary, 0, 1, 0.0),
        sprite(Action::Pregnant, SheetKind::Secondary, 1, 1, 0.0),
        sprite(Action::Breed, SheetKind::Secondary, 2, 1, 0.0),
    ],
});

fn sprite(action: Action, sheet: SheetKind, row: u32, frames: u32, delay_ms: f64) -> ActionSprite {
    ActionSprite {
        action,
        sheet,
        row,
        frames,
        delay_ms,
    }
}

impl SpeciesTable {
    pub fn builtin() -> Self {
        SpeciesTable {
            species: vec![RABBIT.clone(), WOLF.clone()],
        }
    }

    /// Entry for `species`, falling back to the built-in one when a loaded
    /// table leaves it out
    pub fn get(&self, species: Species) -> &SpeciesConfig {
        self.species
            .iter()
            .find(|config| config.species == species)
            .unwrap_or_else(|| match species {
                Species::Rabbit => &*RABBIT,
                Species::Wolf => &*WOLF,
            })
    }

    /// Fetches a species table (same shape as [`SpeciesTable::builtin`])
    pub async fn load(path: &str) -> Result<SpeciesTable> {
        let table = browser::fetch_json::<SpeciesTable>(path)
            .await
            .with_context(|| format!("Could not load species table {}", path))?;
        log!("loaded {} species from {}", table.species.len(), path);
        Ok(table)
    }
}
