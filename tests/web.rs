#![cfg(target_arch = "wasm32")]

use breathing_world_client::collab::Surface;
use breathing_world_client::dom::DomSurface;
use breathing_world_client::engine::{FrameLoop, Stage};
use breathing_world_client::entity::{EntityKey, EntityUpdate, Species, TilePos};
use breathing_world_client::transform::NodeId;
use js_sys::{Array, Object, Promise, Reflect};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn set(object: &Object, key: &str, value: JsValue) {
    Reflect::set(object, &JsValue::from_str(key), &value).unwrap();
}

fn layer(id: &str) {
    let document = web_sys::window().unwrap().document().unwrap();
    let div = document.create_element("div").unwrap();
    div.set_id(id);
    document.body().unwrap().append_child(&div).unwrap();
}

#[wasm_bindgen_test]
fn decodes_updates_from_js_objects() {
    let message = Object::new();
    set(&message, "species", JsValue::from_str("wolf"));
    set(&message, "id", JsValue::from_f64(2.0));
    set(&message, "actionId", JsValue::from_f64(8.0));
    set(&message, "currentPosition", JsValue::from_str("5:5"));
    let moved = Array::of2(&JsValue::from_str("5:5"), &JsValue::from_str("6:5"));
    set(&message, "movedTileIds", moved.into());
    set(&message, "growth", JsValue::from_str("3"));

    let update: EntityUpdate = serde_wasm_bindgen::from_value(message.into()).unwrap();
    assert_eq!(update.species, Some(Species::Wolf));
    assert_eq!(update.id, 2);
    assert_eq!(update.growth, Some(3));
    assert_eq!(update.waypoints(), vec![TilePos::new(5, 5), TilePos::new(6, 5)]);
}

#[wasm_bindgen_test]
fn dom_surface_manages_entity_nodes() {
    layer("animals");
    let mut surface = DomSurface::new("animals").unwrap();
    let key = EntityKey::new(Species::Rabbit, 7);
    let body = NodeId::Body(key);

    surface.create_node(body).unwrap();
    surface.create_node(body).unwrap();
    let document = web_sys::window().unwrap().document().unwrap();
    let animals = document.get_element_by_id("animals").unwrap();
    assert_eq!(animals.child_element_count(), 1);

    surface
        .set_transform(body, "translate(1px, 2px) scale(1) scaleX(1)")
        .unwrap();
    surface.set_stack_index(body, Some(4)).unwrap();
    surface.set_stack_index(body, None).unwrap();

    surface.remove_node(body).unwrap();
    assert!(document.get_element_by_id("rabbit-7").is_none());
    assert!(surface.set_transform(body, "none").is_err());
}

struct CountingStage {
    frames: Rc<Cell<u32>>,
}

impl Stage for CountingStage {
    fn frame(&mut self, _now: f64) -> bool {
        self.frames.set(self.frames.get() + 1);
        true
    }
}

async fn next_animation_frame() {
    let promise = Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .unwrap()
            .request_animation_frame(&resolve)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

#[wasm_bindgen_test]
async fn dropped_loop_cancels_its_pending_frame() {
    let frames = Rc::new(Cell::new(0));
    let frame_loop = FrameLoop::new(CountingStage {
        frames: Rc::clone(&frames),
    });
    frame_loop.wake().unwrap();
    assert!(frame_loop.is_scheduled());
    drop(frame_loop);

    next_animation_frame().await;
    next_animation_frame().await;
    assert_eq!(frames.get(), 0);
}
