// ==================== Entity State ====================
// what every animal currently looks like and is doing, independent of how
// it got there

use crate::sprite::{Action, ActionSprite, SpeciesConfig};
use anyhow::{anyhow, Context, Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Rabbit,
    Wolf,
}

impl Species {
    pub fn name(self) -> &'static str {
        match self {
            Species::Rabbit => "rabbit",
            Species::Wolf => "wolf",
        }
    }

    pub fn from_name(name: &str) -> Option<Species> {
        match name {
            "rabbit" => Some(Species::Rabbit),
            "wolf" => Some(Species::Wolf),
            _ => None,
        }
    }
}

/// Stable identity of one animal, the join key of every component
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub species: Species,
    pub id: u32,
}

impl EntityKey {
    pub fn new(species: Species, id: u32) -> Self {
        EntityKey { species, id }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.species.name(), self.id)
    }
}

/// Tile coordinate in the server's sub-tile space, written `"x:y"` on the wire
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub fn new(x: i32, y: i32) -> Self {
        TilePos { x, y }
    }

    pub fn distance(self, other: TilePos) -> f64 {
        let dx = other.x as f64 - self.x as f64;
        let dy = other.y as f64 - self.y as f64;
        dx.hypot(dy)
    }
}

impl FromStr for TilePos {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let (x, y) = value
            .split_once(':')
            .ok_or_else(|| anyhow!("tile '{}' is not of the form x:y", value))?;
        Ok(TilePos {
            x: x.trim()
                .parse()
                .with_context(|| format!("bad x in tile '{}'", value))?,
            y: y.trim()
                .parse()
                .with_context(|| format!("bad y in tile '{}'", value))?,
        })
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// Sum of the straight tile-to-tile hops along `waypoints`
pub fn path_length(waypoints: &[TilePos]) -> f64 {
    waypoints
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum()
}

/// One decoded server message about an animal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdate {
    pub species: Option<Species>,
    pub id: u32,
    #[serde(default)]
    pub action_id: u8,
    #[serde(default)]
    pub current_position: Option<String>,
    #[serde(default)]
    pub moved_tile_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_growth")]
    pub growth: Option<i64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub reserved_tiles: Vec<String>,
    /// rabbits only: the weed tile finished while eating
    #[serde(default, rename = "ateWeedTileId")]
    pub ate_weed_tile_id: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

impl EntityUpdate {
    pub fn key(&self) -> Result<EntityKey> {
        let species = self
            .species
            .ok_or_else(|| anyhow!("update for id {} carries no species", self.id))?;
        Ok(EntityKey::new(species, self.id))
    }

    pub fn waypoints(&self) -> Vec<TilePos> {
        self.moved_tile_ids
            .iter()
            .filter_map(|tile| match tile.parse() {
                Ok(tile) => Some(tile),
                Err(err) => {
                    warn!("dropping waypoint: {:#}", err);
                    None
                }
            })
            .collect()
    }

    pub fn position(&self) -> Option<TilePos> {
        let raw = self.current_position.as_deref()?;
        match raw.parse() {
            Ok(tile) => Some(tile),
            Err(err) => {
                warn!("ignoring position: {:#}", err);
                None
            }
        }
    }
}

// growth arrives as a number, sometimes as a string, sometimes as garbage
fn lenient_growth<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Loose::deserialize(deserializer)? {
        Loose::Int(value) => Some(value),
        Loose::Float(value) if value.is_finite() => Some(value.round() as i64),
        Loose::Text(text) => text.trim().parse().ok(),
        Loose::Float(_) | Loose::Other(_) => None,
    })
}

/// Conceptual per-entity state machine
/// ┌──────────── Lifecycle ─────────────────────────────────┐
/// │  Idle    →  path (≥ 2 waypoints)      →  Moving        │
/// │  Moving  →  run completes / cancels   →  Idle | Dead   │
/// │  Idle    →  dead, nothing in flight   →  Dead          │
/// │  Dead    →  terminal for animation                     │
/// └────────────────────────────────────────────────────────┘
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Moving,
    Dead,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub key: EntityKey,
    pub action: Action,
    /// what the sprite plays, movement collapses onto `Walk`
    pub animation: Action,
    pub position: Option<TilePos>,
    pub waypoints: Vec<TilePos>,
    pub growth: u32,
    pub scale: f64,
    pub gender: Option<String>,
    pub reserved_tiles: Vec<String>,
    pub frame: u32,
    pub frame_count: u32,
    pub frame_delay: f64,
    pub lifecycle: Lifecycle,
}

impl EntityRecord {
    pub fn sprite(&self, config: &SpeciesConfig) -> ActionSprite {
        config.sprite_for(self.animation)
    }

    /// Where the entity ends up once everything in flight has settled
    pub fn rest_tile(&self) -> Option<TilePos> {
        self.waypoints.last().copied().or(self.position)
    }

    /// Switches the played animation, restarting the cycle if it changed
    pub fn set_animation(&mut self, config: &SpeciesConfig, animation: Action) {
        if animation != self.animation {
            self.frame = 0;
        }
        self.animation = animation;
        let sprite = config.sprite_for(animation);
        self.frame_count = sprite.frames.max(1);
        // young animals cycle faster
        self.frame_delay = sprite.delay_ms * self.scale;
        self.frame %= self.frame_count;
    }
}

/// Result of an upsert the orchestrator needs to act on
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    pub created: bool,
    pub previous: Option<Lifecycle>,
    pub consumed_tile: Option<TilePos>,
    pub scale_changed: bool,
}

/// Exactly one record per key
#[derive(Debug, Default)]
pub struct EntityStore {
    records: HashMap<EntityKey, EntityRecord>,
}

impl EntityStore {
    pub fn new() -> Self {
        EntityStore::default()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&EntityRecord> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &EntityKey) -> Option<&mut EntityRecord> {
        self.records.get_mut(key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> Vec<EntityKey> {
        self.records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds a fresh record from `update` and swaps it in whole. Nothing
    /// of the previous record survives, the frame cursor included.
    pub fn upsert(&mut self, key: EntityKey, config: &SpeciesConfig, update: &EntityUpdate) -> Upserted {
        let previous = self.records.get(&key);
        let action = Action::from_id(update.action_id);
        let position = update.position();
        let mut waypoints = update.waypoints();

        // a lone waypoint is a hop from wherever we last saw the animal
        if let (1, Some(from)) = (waypoints.len(), previous.and_then(|p| p.position)) {
            if waypoints[0] != from {
                waypoints.insert(0, from);
            }
        }

        let consumed_tile = match previous {
            Some(previous) if previous.action == Action::Eat => update
                .ate_weed_tile_id
                .as_deref()
                .and_then(|tile| tile.parse().ok()),
            _ => None,
        };

        let animation = if !waypoints.is_empty() && config.resolves_to_movement(action) {
            Action::Walk
        } else {
            action
        };
        let lifecycle = if waypoints.len() >= 2 {
            Lifecycle::Moving
        } else if action.is_dead() {
            Lifecycle::Dead
        } else {
            Lifecycle::Idle
        };
        let (growth, scale) = config.growth_scale(update.growth);

        let sprite = config.sprite_for(animation);
        let frame_count = sprite.frames.max(1);
        let upserted = Upserted {
            created: previous.is_none(),
            previous: previous.map(|previous| previous.lifecycle),
            consumed_tile,
            scale_changed: previous.map_or(true, |previous| previous.scale != scale),
        };

        let record = EntityRecord {
            key,
            action,
            animation,
            position,
            waypoints,
            growth,
            scale,
            gender: update.gender.clone(),
            reserved_tiles: update.reserved_tiles.clone(),
            frame: 0,
            frame_count,
            frame_delay: sprite.delay_ms * scale,
            lifecycle,
        };
        self.records.insert(key, record);
        upserted
    }

    pub fn remove(&mut self, key: &EntityKey) -> Option<EntityRecord> {
        self.records.remove(key)
    }
}
