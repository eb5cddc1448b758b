use crate::collab::Surface;
use crate::entity::{EntityKey, EntityStore};
use crate::sprite::{Background, SpeciesTable};
use crate::transform::NodeId;
use std::collections::BTreeSet;

/// nominal display tick the frame delays are divided by
pub const FRAME_TICK_MS: f64 = 60.0;

/// How many ticks one sprite frame is held, at least one
pub fn frame_divisor(delay_ms: f64) -> u64 {
    let divisor = (delay_ms / FRAME_TICK_MS).floor();
    if divisor.is_finite() && divisor >= 1.0 {
        divisor as u64
    } else {
        1
    }
}

/// Advances sprite-sheet frames for the entities in its active set. Runs
/// only while that set is non-empty.
#[derive(Debug, Default)]
pub struct FrameAnimationScheduler {
    active: BTreeSet<EntityKey>,
    running: bool,
    frame_counter: u64,
}

impl FrameAnimationScheduler {
    pub fn new() -> Self {
        FrameAnimationScheduler::default()
    }

    pub fn add_active(&mut self, key: EntityKey) {
        self.active.insert(key);
        self.sync_running();
    }

    pub fn remove_active(&mut self, key: &EntityKey) {
        self.active.remove(key);
        self.sync_running();
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.active.contains(key)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    fn sync_running(&mut self) {
        self.running = !self.active.is_empty();
    }

    /// One display frame. Entities whose record or node vanished are dropped
    /// from the active set, the next resting update re-adds them.
    pub fn tick(
        &mut self,
        entities: &mut EntityStore,
        species: &SpeciesTable,
        scale_level: f64,
        surface: &mut dyn Surface,
    ) {
        if !self.running {
            return;
        }
        let counter = self.frame_counter;
        let mut vanished = Vec::new();
        for key in &self.active {
            let Some(record) = entities.get_mut(key) else {
                vanished.push(*key);
                continue;
            };
            if counter % frame_divisor(record.frame_delay) != 0 {
                continue;
            }
            record.frame = (record.frame + 1) % record.frame_count.max(1);

            let config = species.get(key.species);
            let sprite = record.sprite(config);
            let background = Background {
                sheet: sprite.sheet,
                offset: config.sheet_offset(&sprite, record.frame, scale_level),
            };
            if let Err(err) = surface.set_background(NodeId::Body(*key), &background) {
                warn!("{}: {:#}, frame cycling stopped", key, err);
                vanished.push(*key);
            }
        }
        for key in vanished {
            self.active.remove(&key);
        }
        self.sync_running();
        self.frame_counter = counter.wrapping_add(1);
    }
}
