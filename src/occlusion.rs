use crate::collab::{Surface, TreeBox};
use crate::engine::Rect;
use crate::entity::EntityKey;
use crate::transform::NodeId;
use std::collections::{BTreeSet, HashMap};

/// display frames between two reflow passes
pub const REFLOW_CADENCE: u64 = 60;

/// Feet below the tree's base while the head is above it, and some
/// horizontal overlap
pub fn straddles_base(entity: &Rect, tree: &Rect) -> bool {
    entity.overlaps_horizontally(tree)
        && entity.bottom() > tree.bottom()
        && entity.top() < tree.bottom()
}

/// Fakes depth ordering against trees by moving entity nodes next to the
/// tree they overlap, at a low fixed cadence
#[derive(Debug, Default)]
pub struct OcclusionReflow {
    tracked: BTreeSet<EntityKey>,
    /// entity -> id of the tree it was moved beside
    adopted: HashMap<EntityKey, String>,
    frame_counter: u64,
}

impl OcclusionReflow {
    pub fn new() -> Self {
        OcclusionReflow::default()
    }

    pub fn track(&mut self, key: EntityKey) {
        self.tracked.insert(key);
    }

    pub fn untrack(&mut self, key: &EntityKey) {
        self.tracked.remove(key);
    }

    /// forget everything about a removed entity
    pub fn forget(&mut self, key: &EntityKey) {
        self.tracked.remove(key);
        self.adopted.remove(key);
    }

    pub fn is_tracking(&self) -> bool {
        !self.tracked.is_empty()
    }

    pub fn tracked(&self) -> Vec<EntityKey> {
        self.tracked.iter().copied().collect()
    }

    pub fn adopted_by(&self, key: &EntityKey) -> Option<&str> {
        self.adopted.get(key).map(String::as_str)
    }

    /// Counts one display frame, true when a pass is due
    pub fn tick(&mut self) -> bool {
        if self.tracked.is_empty() {
            self.frame_counter = 0;
            return false;
        }
        self.frame_counter += 1;
        self.frame_counter % REFLOW_CADENCE == 0
    }

    pub fn reflow(&mut self, boxes: &[(EntityKey, Rect)], trees: &[TreeBox], surface: &mut dyn Surface) {
        for (key, rect) in boxes {
            self.reflow_one(*key, rect, trees, surface);
        }
    }

    pub fn reflow_one(&mut self, key: EntityKey, rect: &Rect, trees: &[TreeBox], surface: &mut dyn Surface) {
        let node = NodeId::Body(key);
        let hit = trees.iter().find(|tree| straddles_base(rect, &tree.rect()));
        match hit {
            Some(tree) => {
                if self.adopted_by(&key) == Some(tree.id.as_str()) {
                    return;
                }
                let moved = surface
                    .attach_beside(node, &tree.id)
                    .and_then(|_| surface.set_stack_index(node, Some(tree.stack_index)));
                match moved {
                    Ok(()) => {
                        self.adopted.insert(key, tree.id.clone());
                    }
                    Err(err) => warn!("{}: {:#}", key, err),
                }
            }
            None => {
                if self.adopted.remove(&key).is_none() {
                    return;
                }
                let reverted = surface
                    .attach_to_layer(node)
                    .and_then(|_| surface.set_stack_index(node, None));
                if let Err(err) = reverted {
                    warn!("{}: {:#}", key, err);
                }
            }
        }
    }
}
