#![allow(dead_code)]

use anyhow::{anyhow, Result};
use breathing_world_client::collab::{CoordinateMapper, Ports, Scenery, ScreenPosition, Surface, TreeBox, Vegetation};
use breathing_world_client::engine::Size;
use breathing_world_client::entity::{EntityKey, EntityUpdate, Species, TilePos};
use breathing_world_client::sprite::{Background, SheetKind, SpeciesTable};
use breathing_world_client::transform::NodeId;
use breathing_world_client::world::World;
use std::collections::HashSet;

pub const TILE_PX: f64 = 32.0;

/// Tiles laid out on a plain grid, `TILE_PX` per tile
pub struct FakeMapper {
    pub scale_level: f64,
    pub unresolved: HashSet<TilePos>,
}

impl Default for FakeMapper {
    fn default() -> Self {
        FakeMapper {
            scale_level: 2.0,
            unresolved: HashSet::new(),
        }
    }
}

impl CoordinateMapper for FakeMapper {
    fn resolve_screen_position(&self, tile: TilePos, _key: &EntityKey) -> Option<ScreenPosition> {
        if self.unresolved.contains(&tile) {
            return None;
        }
        Some(ScreenPosition {
            left: tile.x as f64 * TILE_PX,
            top: tile.y as f64 * TILE_PX,
            size: TILE_PX,
        })
    }

    fn scale_level(&self) -> f64 {
        self.scale_level
    }
}

#[derive(Default)]
pub struct FakeScenery {
    pub trees: Vec<TreeBox>,
}

impl Scenery for FakeScenery {
    fn tree_bounding_boxes(&self) -> Vec<TreeBox> {
        self.trees.clone()
    }
}

#[derive(Default)]
pub struct FakeVegetation {
    pub consumed: Vec<TilePos>,
}

impl Vegetation for FakeVegetation {
    fn notify_tile_consumed(&mut self, tile: TilePos) {
        self.consumed.push(tile);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Create(NodeId),
    Remove(NodeId),
    Transform(NodeId, String),
    Background(NodeId, Background),
    Size(NodeId, Size),
    AttachBeside(NodeId, String),
    AttachToLayer(NodeId),
    StackIndex(NodeId, Option<i32>),
}

/// Remembers every write. Writes to nodes that were never created fail,
/// like a missing DOM element would.
#[derive(Default)]
pub struct RecordingSurface {
    pub ops: Vec<Op>,
    pub nodes: HashSet<NodeId>,
}

impl RecordingSurface {
    fn existing(&self, node: NodeId) -> Result<()> {
        if self.nodes.contains(&node) {
            Ok(())
        } else {
            Err(anyhow!("no node {}", node.dom_id()))
        }
    }

    pub fn mark(&self) -> usize {
        self.ops.len()
    }

    pub fn since(&self, mark: usize) -> &[Op] {
        &self.ops[mark..]
    }

    pub fn bones_painted(&self, key: EntityKey) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Background(NodeId::Body(k), bg) if *k == key && bg.sheet == SheetKind::Bones))
            .count()
    }

    pub fn last_background(&self, node: NodeId) -> Option<Background> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::Background(n, background) if *n == node => Some(*background),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn create_node(&mut self, node: NodeId) -> Result<()> {
        self.nodes.insert(node);
        self.ops.push(Op::Create(node));
        Ok(())
    }

    fn remove_node(&mut self, node: NodeId) -> Result<()> {
        self.existing(node)?;
        self.nodes.remove(&node);
        self.ops.push(Op::Remove(node));
        Ok(())
    }

    fn set_transform(&mut self, node: NodeId, css: &str) -> Result<()> {
        self.existing(node)?;
        self.ops.push(Op::Transform(node, css.to_string()));
        Ok(())
    }

    fn set_background(&mut self, node: NodeId, background: &Background) -> Result<()> {
        self.existing(node)?;
        self.ops.push(Op::Background(node, *background));
        Ok(())
    }

    fn set_size(&mut self, node: NodeId, size: Size) -> Result<()> {
        self.existing(node)?;
        self.ops.push(Op::Size(node, size));
        Ok(())
    }

    fn attach_beside(&mut self, node: NodeId, anchor_id: &str) -> Result<()> {
        self.existing(node)?;
        self.ops.push(Op::AttachBeside(node, anchor_id.to_string()));
        Ok(())
    }

    fn attach_to_layer(&mut self, node: NodeId) -> Result<()> {
        self.existing(node)?;
        self.ops.push(Op::AttachToLayer(node));
        Ok(())
    }

    fn set_stack_index(&mut self, node: NodeId, index: Option<i32>) -> Result<()> {
        self.existing(node)?;
        self.ops.push(Op::StackIndex(node, index));
        Ok(())
    }
}

/// A world wired to fakes
pub struct Harness {
    pub world: World,
    pub mapper: FakeMapper,
    pub scenery: FakeScenery,
    pub vegetation: FakeVegetation,
    pub surface: RecordingSurface,
}

impl Harness {
    pub fn new() -> Self {
        Harness {
            world: World::new(SpeciesTable::builtin()),
            mapper: FakeMapper::default(),
            scenery: FakeScenery::default(),
            vegetation: FakeVegetation::default(),
            surface: RecordingSurface::default(),
        }
    }

    fn with_ports<R>(&mut self, f: impl FnOnce(&mut World, &mut Ports<'_>) -> R) -> R {
        let mut ports = Ports {
            mapper: &self.mapper,
            scenery: &self.scenery,
            vegetation: &mut self.vegetation,
            surface: &mut self.surface,
        };
        f(&mut self.world, &mut ports)
    }

    pub fn apply(&mut self, update: &EntityUpdate, now: f64) -> Result<()> {
        self.with_ports(|world, ports| world.apply(update, now, ports))
    }

    pub fn frame(&mut self, now: f64) -> bool {
        self.with_ports(|world, ports| world.frame(now, ports))
    }

    /// display frames every 16ms from `from` up to and including `to`
    pub fn run_until(&mut self, from: f64, to: f64) {
        let mut now = from;
        while now <= to {
            self.frame(now);
            now += 16.0;
        }
    }

    pub fn remove(&mut self, key: EntityKey) {
        self.with_ports(|world, ports| world.remove(key, ports))
    }

    pub fn rescale(&mut self) {
        self.with_ports(|world, ports| world.rescale(ports))
    }
}

pub fn rabbit(id: u32) -> EntityKey {
    EntityKey::new(Species::Rabbit, id)
}

pub fn wolf(id: u32) -> EntityKey {
    EntityKey::new(Species::Wolf, id)
}

pub fn update(key: EntityKey, action_id: u8, position: &str, moved: &[&str]) -> EntityUpdate {
    EntityUpdate {
        species: Some(key.species),
        id: key.id,
        action_id,
        current_position: Some(position.to_string()),
        moved_tile_ids: moved.iter().map(|tile| tile.to_string()).collect(),
        growth: Some(10),
        ..EntityUpdate::default()
    }
}

pub fn tile(raw: &str) -> TilePos {
    raw.parse().expect("test tile")
}
