// ==================== Host Object ====================
// Collaborators backed by a plain JS object shaped like
// {
//   resolveScreenPosition(tile, entityId) -> { left, top, size } | null
//   scaleLevel() -> number
//   getTreeBoundingBoxes() -> [{ id, left, top, width, height, stackIndex }]
//   notifyTileConsumed(tile)
// }

use crate::collab::{CoordinateMapper, Scenery, ScreenPosition, TreeBox, Vegetation};
use crate::entity::{EntityKey, TilePos};
use anyhow::{anyhow, Result};
use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};

#[derive(Clone)]
pub struct JsHost {
    object: JsValue,
}

impl JsHost {
    pub fn new(object: JsValue) -> Result<Self> {
        if !object.is_object() {
            return Err(anyhow!("host must be an object, got {:#?}", object));
        }
        Ok(JsHost { object })
    }

    fn call(&self, name: &str, args: &[JsValue]) -> Result<JsValue> {
        let function = Reflect::get(&self.object, &JsValue::from_str(name))
            .map_err(|err| anyhow!("host.{} lookup failed : {:#?}", name, err))?
            .dyn_into::<Function>()
            .map_err(|_| anyhow!("host.{} is not a function", name))?;
        let result = match args {
            [] => function.call0(&self.object),
            [first] => function.call1(&self.object, first),
            [first, second, ..] => function.call2(&self.object, first, second),
        };
        result.map_err(|err| anyhow!("host.{} threw : {:#?}", name, err))
    }

    /// one handle per collaborator so they can be borrowed independently
    pub fn split(&self) -> (JsMapper, JsScenery, JsVegetation) {
        (
            JsMapper(self.clone()),
            JsScenery(self.clone()),
            JsVegetation(self.clone()),
        )
    }
}

pub struct JsMapper(JsHost);
pub struct JsScenery(JsHost);
pub struct JsVegetation(JsHost);

impl CoordinateMapper for JsMapper {
    fn resolve_screen_position(&self, tile: TilePos, key: &EntityKey) -> Option<ScreenPosition> {
        let args = [
            JsValue::from_str(&tile.to_string()),
            JsValue::from_str(&key.to_string()),
        ];
        let value = match self.0.call("resolveScreenPosition", &args) {
            Ok(value) => value,
            Err(err) => {
                warn!("{:#}", err);
                return None;
            }
        };
        if value.is_null() || value.is_undefined() {
            return None;
        }
        serde_wasm_bindgen::from_value(value)
            .map_err(|err| warn!("bad screen position for {} : {}", key, err))
            .ok()
    }

    fn scale_level(&self) -> f64 {
        match self.0.call("scaleLevel", &[]) {
            Ok(value) => value.as_f64().unwrap_or(1.0),
            Err(err) => {
                warn!("{:#}", err);
                1.0
            }
        }
    }
}

impl Scenery for JsScenery {
    fn tree_bounding_boxes(&self) -> Vec<TreeBox> {
        self.0
            .call("getTreeBoundingBoxes", &[])
            .and_then(|value| {
                serde_wasm_bindgen::from_value(value)
                    .map_err(|err| anyhow!("bad tree bounding boxes : {}", err))
            })
            .unwrap_or_else(|err| {
                warn!("{:#}", err);
                Vec::new()
            })
    }
}

impl Vegetation for JsVegetation {
    fn notify_tile_consumed(&mut self, tile: TilePos) {
        if let Err(err) = self
            .0
            .call("notifyTileConsumed", &[JsValue::from_str(&tile.to_string())])
        {
            warn!("{:#}", err);
        }
    }
}
