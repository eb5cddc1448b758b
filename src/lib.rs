// ==================== Imports ====================
use anyhow::{anyhow, Result};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

#[macro_use]
mod browser;
pub mod bridge;
pub mod collab;
pub mod dom;
pub mod engine;
pub mod entity;
pub mod frames;
pub mod movement;
pub mod occlusion;
pub mod shadow;
pub mod sprite;
pub mod transform;
pub mod world;

use bridge::{JsHost, JsMapper, JsScenery, JsVegetation};
use collab::Ports;
use dom::DomSurface;
use engine::{FrameLoop, Stage};
use entity::{EntityKey, EntityUpdate, Species};
use sprite::SpeciesTable;
use world::World;

// ==================== Stage ====================
/// The world wired to the page: DOM nodes plus the host's collaborators
struct ClientStage {
    world: World,
    surface: DomSurface,
    mapper: JsMapper,
    scenery: JsScenery,
    vegetation: JsVegetation,
}

impl ClientStage {
    fn with_ports<R>(&mut self, f: impl FnOnce(&mut World, &mut Ports<'_>) -> R) -> R {
        let mut ports = Ports {
            mapper: &self.mapper,
            scenery: &self.scenery,
            vegetation: &mut self.vegetation,
            surface: &mut self.surface,
        };
        f(&mut self.world, &mut ports)
    }
}

impl Stage for ClientStage {
    fn frame(&mut self, now: f64) -> bool {
        self.with_ports(|world, ports| world.frame(now, ports))
    }
}

fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

fn entity_key(species: &str, id: u32) -> Result<EntityKey> {
    let species = Species::from_name(species).ok_or_else(|| anyhow!("unknown species '{}'", species))?;
    Ok(EntityKey::new(species, id))
}

// ==================== Client ====================
/// Handle the page keeps for the lifetime of the map view
#[wasm_bindgen]
pub struct Client {
    frame_loop: FrameLoop<ClientStage>,
}

impl Client {
    fn build(host: JsValue, layer_id: &str, species: SpeciesTable) -> Result<Client> {
        let (mapper, scenery, vegetation) = JsHost::new(host)?.split();
        let stage = ClientStage {
            world: World::new(species),
            surface: DomSurface::new(layer_id)?,
            mapper,
            scenery,
            vegetation,
        };
        Ok(Client {
            frame_loop: FrameLoop::new(stage),
        })
    }

    fn wake(&self) -> Result<()> {
        let busy = self.frame_loop.with_stage(|stage| stage.world.is_busy());
        if busy {
            self.frame_loop.wake()?;
        }
        Ok(())
    }
}

#[wasm_bindgen]
impl Client {
    /// Client with the built-in species table
    #[wasm_bindgen(constructor)]
    pub fn new(host: JsValue, layer_id: &str) -> Result<Client, JsValue> {
        console_error_panic_hook::set_once();
        Client::build(host, layer_id, SpeciesTable::builtin()).map_err(to_js)
    }

    /// One server entity message, upsert or removal
    pub fn apply(&self, update: JsValue) -> Result<(), JsValue> {
        let update: EntityUpdate = serde_wasm_bindgen::from_value(update)
            .map_err(|err| JsValue::from_str(&format!("bad entity update : {}", err)))?;
        let now = browser::now().map_err(to_js)?;
        self.frame_loop
            .with_stage(|stage| stage.with_ports(|world, ports| world.apply(&update, now, ports)))
            .map_err(to_js)?;
        self.wake().map_err(to_js)
    }

    pub fn remove(&self, species: &str, id: u32) -> Result<(), JsValue> {
        let key = entity_key(species, id).map_err(to_js)?;
        self.frame_loop
            .with_stage(|stage| stage.with_ports(|world, ports| world.remove(key, ports)));
        Ok(())
    }

    #[wasm_bindgen(js_name = cancelAllFor)]
    pub fn cancel_all_for(&self, species: &str, id: u32) -> Result<(), JsValue> {
        let key = entity_key(species, id).map_err(to_js)?;
        self.frame_loop
            .with_stage(|stage| stage.world.cancel_all_for(&key));
        Ok(())
    }

    /// Call after the camera zoom changed
    pub fn rescale(&self) -> Result<(), JsValue> {
        self.frame_loop
            .with_stage(|stage| stage.with_ports(|world, ports| world.rescale(ports)));
        self.wake().map_err(to_js)
    }

    #[wasm_bindgen(js_name = entityCount)]
    pub fn entity_count(&self) -> usize {
        self.frame_loop.with_stage(|stage| stage.world.entity_count())
    }
}

// ==================== Main Functions ====================
/// Builds a client after fetching the species table from `species_url`.
/// Falls back to the built-in table when the fetch fails.
#[wasm_bindgen(js_name = loadClient)]
pub async fn load_client(host: JsValue, layer_id: String, species_url: Option<String>) -> Result<Client, JsValue> {
    console_error_panic_hook::set_once();
    let species = match species_url {
        Some(url) => SpeciesTable::load(&url).await.unwrap_or_else(|err| {
            warn!("{:#}, using built-in species", err);
            SpeciesTable::builtin()
        }),
        None => SpeciesTable::builtin(),
    };
    Client::build(host, &layer_id, species).map_err(to_js)
}
