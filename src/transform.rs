use crate::collab::Surface;
use crate::engine::Point;
use crate::entity::{EntityKey, TilePos};
use anyhow::Result;
use std::collections::HashMap;

/// Display node identity, derived from the entity key
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Body(EntityKey),
    Shadow(EntityKey),
}

impl NodeId {
    pub fn key(self) -> EntityKey {
        match self {
            NodeId::Body(key) | NodeId::Shadow(key) => key,
        }
    }

    pub fn dom_id(self) -> String {
        match self {
            NodeId::Body(key) => key.to_string(),
            NodeId::Shadow(key) => format!("{}-shadow", key),
        }
    }

    pub fn class_name(self) -> String {
        match self {
            NodeId::Body(key) => format!("animal {}", key.species.name()),
            NodeId::Shadow(key) => format!("shadow {}", key.species.name()),
        }
    }
}

/// Sprites are drawn facing right
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Left,
    #[default]
    Right,
}

impl Direction {
    /// Heading from `from` to `to`. Same column: +y faces right, -y faces
    /// left. Otherwise the sign of the x delta decides. `None` when the tiles
    /// are equal.
    pub fn of_travel(from: TilePos, to: TilePos) -> Option<Direction> {
        let delta = if from.x == to.x {
            i64::from(to.y) - i64::from(from.y)
        } else {
            i64::from(to.x) - i64::from(from.x)
        };
        match delta.signum() {
            1 => Some(Direction::Right),
            -1 => Some(Direction::Left),
            _ => None,
        }
    }

    fn scale_x(self) -> i8 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

/// Translate, scale and flip of one node, always written in that order
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformComposite {
    pub translate: Point,
    pub scale: f64,
    pub direction: Direction,
}

impl Default for TransformComposite {
    fn default() -> Self {
        TransformComposite {
            translate: Point::default(),
            scale: 1.0,
            direction: Direction::default(),
        }
    }
}

impl TransformComposite {
    pub fn to_css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({}) scaleX({})",
            self.translate.x,
            self.translate.y,
            self.scale,
            self.direction.scale_x()
        )
    }
}

/// One composite per node. Writers go through [`TransformStore::update`] so
/// nobody sets a raw transform string.
#[derive(Debug, Default)]
pub struct TransformStore {
    composites: HashMap<NodeId, TransformComposite>,
}

impl TransformStore {
    pub fn new() -> Self {
        TransformStore::default()
    }

    pub fn get(&self, node: NodeId) -> TransformComposite {
        self.composites.get(&node).copied().unwrap_or_default()
    }

    /// Read-modify-write of one composite, then pushes the full transform
    /// to the node
    pub fn update(
        &mut self,
        node: NodeId,
        surface: &mut dyn Surface,
        f: impl FnOnce(&mut TransformComposite),
    ) -> Result<TransformComposite> {
        let composite = self.composites.entry(node).or_default();
        f(composite);
        let composite = *composite;
        surface.set_transform(node, &composite.to_css())?;
        Ok(composite)
    }

    pub fn forget(&mut self, key: &EntityKey) {
        self.composites.remove(&NodeId::Body(*key));
        self.composites.remove(&NodeId::Shadow(*key));
    }
}
