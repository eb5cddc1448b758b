use crate::collab::Ports;
use crate::engine::{Point, Rect};
use crate::entity::{EntityKey, EntityRecord, EntityStore, EntityUpdate, Lifecycle};
use crate::frames::FrameAnimationScheduler;
use crate::movement::{MotionHandle, MotionRequest, MovementScheduler};
use crate::occlusion::OcclusionReflow;
use crate::shadow::ShadowCoupler;
use crate::sprite::{Background, SpeciesConfig, SpeciesTable};
use crate::transform::{NodeId, TransformStore};
use anyhow::Result;
use std::rc::Rc;

/// TABLE
/// ┌───────────────────────── Update Flow ───────────────────────────────────┐
/// │                                                                         │
/// │  server update ──► EntityStore::upsert ──► path (≥ 2 tiles)?            │
/// │                                             │ yes         │ no          │
/// │                                             ▼             ▼             │
/// │                          MovementScheduler::start   cancel run, snap,   │
/// │                          (+ shadow track)           resting animation   │
/// │                          walk frames active         frames on / off     │
/// │                          occlusion tracked                              │
/// │                                                                         │
/// ├────────────────────────── Per Frame ────────────────────────────────────┤
/// │  1. advance motion runs, complete finished ones (snap, rest, settle)    │
/// │  2. tick sprite frames (only while some entity cycles)                  │
/// │  3. every 60th tracked frame, reflow against trees                      │
/// │  4. report whether anything is left to do                               │
/// └─────────────────────────────────────────────────────────────────────────┘
pub struct World {
    species: Rc<SpeciesTable>,
    entities: EntityStore,
    transforms: TransformStore,
    movement: MovementScheduler,
    frames: FrameAnimationScheduler,
    shadows: ShadowCoupler,
    occlusion: OcclusionReflow,
}

fn contain(key: EntityKey, result: Result<()>) {
    if let Err(err) = result {
        warn!("{}: {:#}", key, err);
    }
}

impl World {
    pub fn new(species: SpeciesTable) -> Self {
        World {
            species: Rc::new(species),
            entities: EntityStore::new(),
            transforms: TransformStore::new(),
            movement: MovementScheduler::new(),
            frames: FrameAnimationScheduler::new(),
            shadows: ShadowCoupler::new(),
            occlusion: OcclusionReflow::new(),
        }
    }

    pub fn entity(&self, key: &EntityKey) -> Option<&EntityRecord> {
        self.entities.get(key)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn transforms(&self) -> &TransformStore {
        &self.transforms
    }

    pub fn movement(&self) -> &MovementScheduler {
        &self.movement
    }

    pub fn frames(&self) -> &FrameAnimationScheduler {
        &self.frames
    }

    pub fn shadows(&self) -> &ShadowCoupler {
        &self.shadows
    }

    pub fn occlusion(&self) -> &OcclusionReflow {
        &self.occlusion
    }

    /// Anything left for the next display frame
    pub fn is_busy(&self) -> bool {
        self.movement.has_runs() || self.frames.is_running() || self.occlusion.is_tracking()
    }

    /// Routes one server message, removal or upsert. Fails only when the
    /// message names no entity.
    pub fn apply(&mut self, update: &EntityUpdate, now: f64, ports: &mut Ports<'_>) -> Result<()> {
        let key = update.key()?;
        if update.removed {
            self.remove(key, ports);
        } else {
            self.upsert(key, update, now, ports);
        }
        Ok(())
    }

    pub fn upsert(&mut self, key: EntityKey, update: &EntityUpdate, now: f64, ports: &mut Ports<'_>) {
        let species = Rc::clone(&self.species);
        let config = species.get(key.species);
        let upserted = self.entities.upsert(key, config, update);
        let layout = config.layout_size(ports.mapper.scale_level());

        if upserted.created {
            contain(key, ports.surface.create_node(NodeId::Body(key)));
            contain(key, ports.surface.create_node(NodeId::Shadow(key)));
            contain(key, ports.surface.set_size(NodeId::Body(key), layout));
        }
        if let Some(tile) = upserted.consumed_tile {
            ports.vegetation.notify_tile_consumed(tile);
        }

        let Some(record) = self.entities.get(&key) else {
            return;
        };
        let scale = record.scale;
        let lifecycle = record.lifecycle;
        let waypoints = record.waypoints.clone();

        if upserted.scale_changed {
            contain(
                key,
                self.transforms
                    .update(NodeId::Body(key), ports.surface, |composite| {
                        composite.scale = scale
                    })
                    .map(|_| ()),
            );
            contain(
                key,
                self.shadows
                    .resize(key, config, layout, scale, ports.surface)
                    .map(|_| ()),
            );
        }

        if lifecycle == Lifecycle::Moving {
            let request = MotionRequest {
                key,
                waypoints: &waypoints,
                config,
                scale,
                now,
            };
            self.movement.start(
                request,
                ports.mapper,
                &self.shadows,
                &mut self.transforms,
                ports.surface,
            );
            self.occlusion.track(key);
            self.show_current_frame(key, config, ports);
        } else {
            let canceled = self.movement.cancel(&key).is_some();
            if canceled {
                log!("{}: motion canceled by stationary update", key);
            }
            self.place_at_rest(key, config, ports);
            self.show_resting(key, config, upserted.previous == Some(Lifecycle::Dead), ports);
            // the snap may have left the tree it was stacked beside
            if canceled || self.occlusion.adopted_by(&key).is_some() {
                self.settle(key, ports);
            }
        }
    }

    /// Cancels everything in flight for `key`, then drops its record and nodes
    pub fn remove(&mut self, key: EntityKey, ports: &mut Ports<'_>) {
        self.cancel_all_for(&key);
        self.occlusion.forget(&key);
        self.shadows.forget(&key);
        self.transforms.forget(&key);
        if self.entities.remove(&key).is_none() {
            return;
        }
        contain(key, ports.surface.remove_node(NodeId::Shadow(key)));
        contain(key, ports.surface.remove_node(NodeId::Body(key)));
    }

    /// Stops motion, frame cycling and occlusion tracking for `key`, leaving
    /// the record and nodes where they are
    pub fn cancel_all_for(&mut self, key: &EntityKey) {
        self.movement.cancel(key);
        self.frames.remove_active(key);
        self.occlusion.untrack(key);
    }

    /// Camera zoom changed: every run is invalid. Each entity is snapped to
    /// its latest tile and repainted at the new scale level.
    pub fn rescale(&mut self, ports: &mut Ports<'_>) {
        let species = Rc::clone(&self.species);
        let canceled = self.movement.cancel_all();
        for key in self.entities.keys() {
            let config = species.get(key.species);
            let layout = config.layout_size(ports.mapper.scale_level());
            contain(key, ports.surface.set_size(NodeId::Body(key), layout));
            if let Some(record) = self.entities.get(&key) {
                let scale = record.scale;
                contain(
                    key,
                    self.shadows
                        .resize(key, config, layout, scale, ports.surface)
                        .map(|_| ()),
                );
            }
            if canceled.iter().any(|run| run.handle.key == key) {
                self.arrive(key, config, None, ports);
            } else {
                self.place_at_rest(key, config, ports);
                let dead = self.entities.get(&key).map(|record| record.lifecycle) == Some(Lifecycle::Dead);
                if !dead {
                    self.show_current_frame(key, config, ports);
                }
            }
        }
    }

    /// One display frame, returns whether another is needed
    pub fn frame(&mut self, now: f64, ports: &mut Ports<'_>) -> bool {
        let finished = self.movement.advance(now, &mut self.transforms, ports.surface);
        for handle in finished {
            self.finish_motion(handle, ports);
        }

        let scale_level = ports.mapper.scale_level();
        self.frames
            .tick(&mut self.entities, &self.species, scale_level, ports.surface);

        if self.occlusion.tick() {
            let boxes: Vec<(EntityKey, Rect)> = self
                .occlusion
                .tracked()
                .into_iter()
                .filter_map(|key| Some((key, self.visual_box(&key, scale_level)?)))
                .collect();
            let trees = ports.scenery.tree_bounding_boxes();
            self.occlusion.reflow(&boxes, &trees, ports.surface);
        }

        self.is_busy()
    }

    /// Painted box of the body: node box at its current translate, scaled
    /// about its center by the growth scale
    pub fn visual_box(&self, key: &EntityKey, scale_level: f64) -> Option<Rect> {
        let record = self.entities.get(key)?;
        let layout = self.species.get(key.species).layout_size(scale_level);
        let translate = self.transforms.get(NodeId::Body(*key)).translate;
        Some(Rect::new(translate, layout).scaled_about_center(record.scale))
    }

    fn finish_motion(&mut self, handle: MotionHandle, ports: &mut Ports<'_>) {
        let Some(run) = self.movement.complete(handle) else {
            return;
        };
        let species = Rc::clone(&self.species);
        let config = species.get(handle.key.species);
        self.arrive(handle.key, config, run.shadow().last(), ports);
    }

    /// Motion is over: snap body and shadow, pick the resting animation,
    /// settle occlusion once
    fn arrive(&mut self, key: EntityKey, config: &SpeciesConfig, shadow_end: Option<Point>, ports: &mut Ports<'_>) {
        if let Some(end) = shadow_end {
            contain(
                key,
                self.transforms
                    .update(NodeId::Shadow(key), ports.surface, |composite| {
                        composite.translate = end
                    })
                    .map(|_| ()),
            );
        }
        self.place_at_rest(key, config, ports);

        let Some(record) = self.entities.get_mut(&key) else {
            return;
        };
        let rest = record.action.after_motion();
        let was_dead = record.lifecycle == Lifecycle::Dead;
        record.lifecycle = if rest.is_dead() {
            Lifecycle::Dead
        } else {
            Lifecycle::Idle
        };
        record.set_animation(config, rest);
        let scale = record.scale;

        let layout = config.layout_size(ports.mapper.scale_level());
        contain(
            key,
            self.shadows
                .resize(key, config, layout, scale, ports.surface)
                .map(|_| ()),
        );
        contain(
            key,
            self.shadows.follow(
                key,
                config,
                layout,
                scale,
                &mut self.transforms,
                ports.surface,
            ),
        );
        self.show_resting(key, config, was_dead, ports);
        self.settle(key, ports);
    }

    /// One immediate occlusion check where the entity now stands, then it
    /// leaves the periodic passes
    fn settle(&mut self, key: EntityKey, ports: &mut Ports<'_>) {
        let scale_level = ports.mapper.scale_level();
        if let Some(rect) = self.visual_box(&key, scale_level) {
            let trees = ports.scenery.tree_bounding_boxes();
            self.occlusion.reflow_one(key, &rect, &trees, ports.surface);
        }
        self.occlusion.untrack(&key);
    }

    /// Snaps the body onto its latest tile and the shadow under it. An
    /// unresolvable tile keeps the last transform.
    fn place_at_rest(&mut self, key: EntityKey, config: &SpeciesConfig, ports: &mut Ports<'_>) {
        let Some(record) = self.entities.get(&key) else {
            return;
        };
        let scale = record.scale;
        let Some(tile) = record.rest_tile() else {
            return;
        };
        let layout = config.layout_size(ports.mapper.scale_level());
        match ports.mapper.resolve_screen_position(tile, &key) {
            Some(position) => {
                let target = position.anchor(layout);
                contain(
                    key,
                    self.transforms
                        .update(NodeId::Body(key), ports.surface, |composite| {
                            composite.translate = target
                        })
                        .map(|_| ()),
                );
            }
            None => warn!("{}: no screen position for tile {}", key, tile),
        }
        contain(
            key,
            self.shadows.follow(
                key,
                config,
                layout,
                scale,
                &mut self.transforms,
                ports.surface,
            ),
        );
    }

    /// Stationary look: bones once on death, otherwise the current frame and
    /// frame cycling when the sheet entry has more than one frame
    fn show_resting(&mut self, key: EntityKey, config: &SpeciesConfig, was_dead: bool, ports: &mut Ports<'_>) {
        let Some(record) = self.entities.get(&key) else {
            return;
        };
        if record.lifecycle == Lifecycle::Dead {
            self.frames.remove_active(&key);
            if !was_dead {
                let bones = record.sprite(config);
                let background = Background {
                    sheet: bones.sheet,
                    offset: Point::default(),
                };
                contain(key, ports.surface.set_background(NodeId::Body(key), &background));
                log!("{}: decayed", key);
            }
            return;
        }
        self.show_current_frame(key, config, ports);
    }

    fn show_current_frame(&mut self, key: EntityKey, config: &SpeciesConfig, ports: &mut Ports<'_>) {
        let Some(record) = self.entities.get(&key) else {
            return;
        };
        let sprite = record.sprite(config);
        let background = Background {
            sheet: sprite.sheet,
            offset: config.sheet_offset(&sprite, record.frame, ports.mapper.scale_level()),
        };
        contain(key, ports.surface.set_background(NodeId::Body(key), &background));
        if sprite.cycles() {
            self.frames.add_active(key);
        } else {
            self.frames.remove_active(&key);
        }
    }
}
