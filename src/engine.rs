use crate::browser;
use anyhow::{anyhow, Result};
// ELI5: web assembly is a single threaded environment, so Rc RefCell > Mutex
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ==================== Geometry ====================
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// straight line blend, t in [0, 1]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn scaled(self, factor: f64) -> Size {
        Size {
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn left(&self) -> f64 {
        self.position.x
    }

    pub fn top(&self) -> f64 {
        self.position.y
    }

    pub fn right(&self) -> f64 {
        self.position.x + self.size.width
    }

    pub fn bottom(&self) -> f64 {
        self.position.y + self.size.height
    }

    pub fn center_x(&self) -> f64 {
        self.position.x + self.size.width * 0.5
    }

    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.left() < other.right() && self.right() > other.left()
    }

    /// Rect of the same center scaled by `factor`, which is what a CSS
    /// `scale()` with the default centered transform origin paints
    pub fn scaled_about_center(&self, factor: f64) -> Rect {
        let size = self.size.scaled(factor);
        Rect {
            position: Point {
                x: self.position.x + (self.size.width - size.width) * 0.5,
                y: self.position.y + (self.size.height - size.height) * 0.5,
            },
            size,
        }
    }
}

// ==================== Tween ====================
/// Linear interpolation across evenly spaced keyframes, the same offsets a
/// web animation assigns when none are given.
#[derive(Debug, Clone)]
pub struct Tween {
    frames: Vec<Point>,
    start: f64,
    duration: f64,
}

impl Tween {
    pub fn new(frames: Vec<Point>, start: f64, duration: f64) -> Self {
        Tween {
            frames,
            start,
            duration,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn frames(&self) -> &[Point] {
        &self.frames
    }

    pub fn progress(&self, now: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.duration).clamp(0.0, 1.0)
    }

    pub fn sample(&self, now: f64) -> Option<Point> {
        match self.frames.len() {
            0 => None,
            1 => Some(self.frames[0]),
            len => {
                let scaled = self.progress(now) * (len - 1) as f64;
                let index = (scaled.floor() as usize).min(len - 2);
                let t = scaled - index as f64;
                Some(self.frames[index].lerp(self.frames[index + 1], t))
            }
        }
    }

    pub fn last(&self) -> Option<Point> {
        self.frames.last().copied()
    }

    pub fn is_finished(&self, now: f64) -> bool {
        now >= self.start + self.duration
    }
}

// ==================== Frame Loop ====================
/// Anything driven once per display frame by [`FrameLoop`]
pub trait Stage {
    /// Runs one display frame and returns whether another one is needed
    fn frame(&mut self, now: f64) -> bool;
}

/// requestAnimationFrame loop that only keeps itself scheduled while the
/// stage reports pending work. `wake()` restarts it.
pub struct FrameLoop<S: Stage + 'static> {
    inner: Rc<LoopInner<S>>,
}

struct LoopInner<S> {
    stage: RefCell<S>,
    closure: RefCell<Option<browser::LoopClosure>>,
    /// request id of the frame JS still owes us
    pending: Cell<Option<i32>>,
}

impl<S: Stage + 'static> FrameLoop<S> {
    pub fn new(stage: S) -> Self {
        let inner = Rc::new(LoopInner {
            stage: RefCell::new(stage),
            closure: RefCell::new(None),
            pending: Cell::new(None),
        });
        // Weak so the closure does not keep its own loop alive
        let weak = Rc::downgrade(&inner);
        *inner.closure.borrow_mut() = Some(browser::create_raf_closure(move |now: f64| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.pending.set(None);
            let busy = inner.stage.borrow_mut().frame(now);
            if busy {
                if let Err(err) = inner.schedule() {
                    warn!("FrameLoop: {:#}", err);
                }
            }
        }));
        FrameLoop { inner }
    }

    pub fn with_stage<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.inner.stage.borrow_mut())
    }

    /// Schedules the next frame unless one is already pending
    pub fn wake(&self) -> Result<()> {
        self.inner.schedule()
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner.pending.get().is_some()
    }
}

impl<S: Stage + 'static> Drop for FrameLoop<S> {
    // the closure dies with the loop, JS must not call it afterwards
    fn drop(&mut self) {
        if let Some(id) = self.inner.pending.take() {
            if let Err(err) = browser::cancel_animation_frame(id) {
                warn!("FrameLoop: {:#}", err);
            }
        }
    }
}

impl<S> LoopInner<S> {
    fn schedule(&self) -> Result<()> {
        if self.pending.get().is_some() {
            return Ok(());
        }
        let closure = self.closure.borrow();
        let closure = closure
            .as_ref()
            .ok_or_else(|| anyhow!("FrameLoop: Loop is None"))?;
        let id = browser::request_animation_frame(closure)?;
        self.pending.set(Some(id));
        Ok(())
    }
}
