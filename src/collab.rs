// ==================== Collaborators ====================
// everything outside the animation core: camera math, scenery, vegetation
// and the display nodes themselves

use crate::engine::{Point, Rect, Size};
use crate::entity::{EntityKey, TilePos};
use crate::sprite::Background;
use crate::transform::NodeId;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Where a tile lands on screen for a given entity
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenPosition {
    pub left: f64,
    pub top: f64,
    /// rendered tile edge in pixels
    pub size: f64,
}

impl ScreenPosition {
    /// Top-left of a `layout` sized node standing on the tile, i.e. with its
    /// bottom-center on the tile's bottom-center
    pub fn anchor(&self, layout: Size) -> Point {
        Point {
            x: self.left + (self.size - layout.width) * 0.5,
            y: self.top + self.size - layout.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeBox {
    /// DOM id of the tree node
    pub id: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub stack_index: i32,
}

impl TreeBox {
    pub fn rect(&self) -> Rect {
        Rect::new(
            Point::new(self.left, self.top),
            Size {
                width: self.width,
                height: self.height,
            },
        )
    }
}

/// Camera math. Pure with respect to the current camera and zoom.
pub trait CoordinateMapper {
    fn resolve_screen_position(&self, tile: TilePos, key: &EntityKey) -> Option<ScreenPosition>;
    fn scale_level(&self) -> f64;
}

pub trait Scenery {
    fn tree_bounding_boxes(&self) -> Vec<TreeBox>;
}

pub trait Vegetation {
    /// fire and forget
    fn notify_tile_consumed(&mut self, tile: TilePos);
}

/// Display nodes. Every call may fail with a missing node, callers log and
/// move on.
pub trait Surface {
    fn create_node(&mut self, node: NodeId) -> Result<()>;
    fn remove_node(&mut self, node: NodeId) -> Result<()>;
    fn set_transform(&mut self, node: NodeId, css: &str) -> Result<()>;
    fn set_background(&mut self, node: NodeId, background: &Background) -> Result<()>;
    fn set_size(&mut self, node: NodeId, size: Size) -> Result<()>;
    /// make `node` the next sibling of the element with id `anchor_id`
    fn attach_beside(&mut self, node: NodeId, anchor_id: &str) -> Result<()>;
    /// move `node` back into the default entity layer
    fn attach_to_layer(&mut self, node: NodeId) -> Result<()>;
    fn set_stack_index(&mut self, node: NodeId, index: Option<i32>) -> Result<()>;
}

/// The collaborators handed to every world operation
pub struct Ports<'a> {
    pub mapper: &'a dyn CoordinateMapper,
    pub scenery: &'a dyn Scenery,
    pub vegetation: &'a mut dyn Vegetation,
    pub surface: &'a mut dyn Surface,
}
