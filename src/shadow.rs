use crate::collab::Surface;
use crate::engine::{Point, Rect, Size, Tween};
use crate::entity::EntityKey;
use crate::sprite::SpeciesConfig;
use crate::transform::{NodeId, TransformStore};
use anyhow::Result;
use std::collections::HashMap;

/// part of the body width the shadow does not cover
const BODY_INSET: f64 = 0.6;
const ASPECT: f64 = 2.0 / 5.0;

/// Shadow half of a motion run. Owned by the run itself, so the two are
/// finished or dropped together.
#[derive(Debug, Clone)]
pub struct ShadowTrack {
    tween: Tween,
}

impl ShadowTrack {
    pub fn sample(&self, now: f64) -> Option<Point> {
        self.tween.sample(now)
    }

    /// last keyframe, where a finished track rests
    pub fn last(&self) -> Option<Point> {
        self.tween.last()
    }

    pub fn duration(&self) -> f64 {
        self.tween.duration()
    }
}

/// Keeps each shadow node sized and positioned under its animal
#[derive(Debug, Default)]
pub struct ShadowCoupler {
    sizes: HashMap<EntityKey, Size>,
}

impl ShadowCoupler {
    pub fn new() -> Self {
        ShadowCoupler::default()
    }

    pub fn shadow_size(config: &SpeciesConfig, layout: Size, scale: f64) -> Size {
        let width = (layout.width - layout.width * BODY_INSET) * scale * config.shadow_ratio;
        Size {
            width,
            height: width * ASPECT,
        }
    }

    /// Top-left of a shadow centered under the painted body. `body` is the
    /// unscaled node box, `scale` the growth scale applied around its center.
    pub fn placement(body: Rect, scale: f64, shadow: Size) -> Point {
        let painted = body.scaled_about_center(scale);
        Point {
            x: painted.center_x() - shadow.width * 0.5,
            y: painted.bottom() - shadow.height,
        }
    }

    pub fn size_of(&self, key: &EntityKey) -> Option<Size> {
        self.sizes.get(key).copied()
    }

    /// Recomputes the shadow size, writing it only when it changed
    pub fn resize(
        &mut self,
        key: EntityKey,
        config: &SpeciesConfig,
        layout: Size,
        scale: f64,
        surface: &mut dyn Surface,
    ) -> Result<Size> {
        let size = Self::shadow_size(config, layout, scale);
        if self.sizes.get(&key) != Some(&size) {
            surface.set_size(NodeId::Shadow(key), size)?;
            self.sizes.insert(key, size);
        }
        Ok(size)
    }

    /// Builds the shadow keyframes for a body moving through `body_frames`,
    /// over the same window as the body
    pub fn attach_motion(
        &self,
        key: EntityKey,
        config: &SpeciesConfig,
        body_frames: &[Point],
        layout: Size,
        scale: f64,
        start: f64,
        duration: f64,
    ) -> ShadowTrack {
        let size = self
            .size_of(&key)
            .unwrap_or_else(|| Self::shadow_size(config, layout, scale));
        let frames = body_frames
            .iter()
            .map(|body| Self::placement(Rect::new(*body, layout), scale, size))
            .collect();
        ShadowTrack {
            tween: Tween::new(frames, start, duration),
        }
    }

    /// Snaps the shadow under wherever the body currently is
    pub fn follow(
        &self,
        key: EntityKey,
        config: &SpeciesConfig,
        layout: Size,
        scale: f64,
        transforms: &mut TransformStore,
        surface: &mut dyn Surface,
    ) -> Result<()> {
        let body = transforms.get(NodeId::Body(key)).translate;
        let size = self
            .size_of(&key)
            .unwrap_or_else(|| Self::shadow_size(config, layout, scale));
        let target = Self::placement(Rect::new(body, layout), scale, size);
        transforms.update(NodeId::Shadow(key), surface, |composite| {
            composite.translate = target
        })?;
        Ok(())
    }

    pub fn forget(&mut self, key: &EntityKey) {
        self.sizes.remove(key);
    }
}
