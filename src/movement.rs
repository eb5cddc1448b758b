// TABLE: one timed, cancelable translate animation per entity
// ┌──────────────── Run Lifecycle ──────────────────────────────────┐
// │  start()     cancel old run (body + shadow) → build keyframes    │
// │              → store new run under a fresh generation            │
// │  advance()   write sampled translate, report finished handles    │
// │  complete()  generation matches → hand the run back for snapping │
// │              generation stale   → discarded                      │
// │  cancel()    drop the run, no completion                         │
// └──────────────────────────────────────────────────────────────────┘

use crate::collab::{CoordinateMapper, Surface};
use crate::engine::{Point, Tween};
use crate::entity::{path_length, EntityKey, TilePos};
use crate::shadow::{ShadowCoupler, ShadowTrack};
use crate::sprite::SpeciesConfig;
use crate::transform::{Direction, NodeId, TransformStore};
use std::collections::HashMap;

// ==================== Duration ====================
/// Shortest run, whatever the distance or speed
pub const MIN_MOTION_MS: f64 = 100.0;

/// `max(MIN_MOTION_MS, distance / speed * 1000)`. Degenerate speeds fall
/// back to the floor.
pub fn motion_duration(waypoints: &[TilePos], speed: f64) -> f64 {
    let duration = path_length(waypoints) / speed * 1000.0;
    if duration.is_finite() {
        duration.max(MIN_MOTION_MS)
    } else {
        MIN_MOTION_MS
    }
}

// ==================== Runs ====================
/// Identity of one run. A completion only counts if its generation is still
/// the live one for that key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MotionHandle {
    pub key: EntityKey,
    pub generation: u64,
}

#[derive(Debug)]
pub struct MotionRun {
    pub handle: MotionHandle,
    pub waypoints: Vec<TilePos>,
    pub duration: f64,
    tween: Tween,
    shadow: ShadowTrack,
    missing_node_reported: bool,
}

impl MotionRun {
    pub fn keyframes(&self) -> &[Point] {
        self.tween.frames()
    }

    pub fn final_translate(&self) -> Option<Point> {
        self.tween.last()
    }

    pub fn shadow(&self) -> &ShadowTrack {
        &self.shadow
    }
}

pub struct MotionRequest<'a> {
    pub key: EntityKey,
    pub waypoints: &'a [TilePos],
    pub config: &'a SpeciesConfig,
    /// growth scale of the body
    pub scale: f64,
    pub now: f64,
}

#[derive(Debug, Default)]
pub struct MovementScheduler {
    runs: HashMap<EntityKey, MotionRun>,
    generation: u64,
}

impl MovementScheduler {
    pub fn new() -> Self {
        MovementScheduler::default()
    }

    /// Replaces whatever run `request.key` had with a new one. Fewer than two
    /// waypoints only cancels.
    pub fn start(
        &mut self,
        request: MotionRequest<'_>,
        mapper: &dyn CoordinateMapper,
        shadows: &ShadowCoupler,
        transforms: &mut TransformStore,
        surface: &mut dyn Surface,
    ) -> Option<MotionHandle> {
        let MotionRequest {
            key,
            waypoints,
            config,
            scale,
            now,
        } = request;
        // the old run and its shadow are gone before any keyframe is built
        self.cancel(&key);
        let (first, last) = match waypoints {
            [first, .., last] => (*first, *last),
            _ => return None,
        };

        let body = NodeId::Body(key);
        if let Some(direction) = Direction::of_travel(first, last) {
            if let Err(err) = transforms.update(body, surface, |composite| {
                composite.direction = direction
            }) {
                warn!("{}: {:#}", key, err);
            }
        }

        let duration = motion_duration(waypoints, config.speed);
        let layout = config.layout_size(mapper.scale_level());
        let mut last_valid = transforms.get(body).translate;
        let frames: Vec<Point> = waypoints
            .iter()
            .map(|tile| {
                match mapper.resolve_screen_position(*tile, &key) {
                    Some(position) => last_valid = position.anchor(layout),
                    None => warn!("{}: no screen position for tile {}", key, tile),
                }
                last_valid
            })
            .collect();
        let shadow = shadows.attach_motion(key, config, &frames, layout, scale, now, duration);

        self.generation += 1;
        let handle = MotionHandle {
            key,
            generation: self.generation,
        };
        self.runs.insert(
            key,
            MotionRun {
                handle,
                waypoints: waypoints.to_vec(),
                duration,
                tween: Tween::new(frames, now, duration),
                shadow,
                missing_node_reported: false,
            },
        );
        Some(handle)
    }

    /// Drops the run together with its shadow track. No completion fires.
    pub fn cancel(&mut self, key: &EntityKey) -> Option<MotionRun> {
        self.runs.remove(key)
    }

    pub fn cancel_all(&mut self) -> Vec<MotionRun> {
        self.runs.drain().map(|(_, run)| run).collect()
    }

    pub fn is_moving(&self, key: &EntityKey) -> bool {
        self.runs.contains_key(key)
    }

    pub fn run(&self, key: &EntityKey) -> Option<&MotionRun> {
        self.runs.get(key)
    }

    pub fn has_runs(&self) -> bool {
        !self.runs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Writes the sampled body and shadow translate of every run and
    /// returns the runs whose time is up. Those stay live until
    /// [`MovementScheduler::complete`].
    pub fn advance(
        &mut self,
        now: f64,
        transforms: &mut TransformStore,
        surface: &mut dyn Surface,
    ) -> Vec<MotionHandle> {
        let mut finished = Vec::new();
        for run in self.runs.values_mut() {
            let key = run.handle.key;
            let writes = [
                (NodeId::Body(key), run.tween.sample(now)),
                (NodeId::Shadow(key), run.shadow.sample(now)),
            ];
            for (node, target) in writes {
                let Some(target) = target else {
                    continue;
                };
                let written = transforms.update(node, surface, |composite| {
                    composite.translate = target
                });
                if let Err(err) = written {
                    if !run.missing_node_reported {
                        warn!("{}: {:#}", node.dom_id(), err);
                        run.missing_node_reported = true;
                    }
                }
            }
            if run.tween.is_finished(now) {
                finished.push(run.handle);
            }
        }
        finished
    }

    /// Takes the run out if `handle` is still the live one
    pub fn complete(&mut self, handle: MotionHandle) -> Option<MotionRun> {
        match self.runs.get(&handle.key) {
            Some(run) if run.handle == handle => self.runs.remove(&handle.key),
            _ => {
                log!(
                    "{}: discarding stale completion of run {}",
                    handle.key,
                    handle.generation
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tiles(raw: &[(i32, i32)]) -> Vec<TilePos> {
        raw.iter().map(|(x, y)| TilePos::new(*x, *y)).collect()
    }

    #[test]
    fn duration_follows_path_length() {
        let path = tiles(&[(3, 3), (3, 4), (3, 5)]);
        assert_relative_eq!(motion_duration(&path, 1.5), 2.0 / 1.5 * 1000.0);
    }

    #[test]
    fn duration_never_drops_below_the_floor() {
        let still = tiles(&[(3, 3), (3, 3)]);
        assert_eq!(motion_duration(&still, 1.5), MIN_MOTION_MS);
        let path = tiles(&[(0, 0), (40, 30)]);
        assert_eq!(motion_duration(&path, 1.0e9), MIN_MOTION_MS);
        assert_eq!(motion_duration(&path, 0.0), MIN_MOTION_MS);
        assert_eq!(motion_duration(&still, 0.0), MIN_MOTION_MS);
        assert_eq!(motion_duration(&path, -2.0), MIN_MOTION_MS);
        assert_eq!(motion_duration(&[], 3.0), MIN_MOTION_MS);
    }
}
