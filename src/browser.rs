use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

#[rustfmt::skip]
use web_sys::{
    Document,
    Element,
    HtmlElement,
    Response,
    Window,
};

// ==================== Logging ====================
// console on wasm32, stderr everywhere else (native test runs)
macro_rules! log {
    ($($t:tt)*) => {
        $crate::browser::console_log(&format!($($t)*))
    };
}

macro_rules! warn {
    ($($t:tt)*) => {
        $crate::browser::console_warn(&format!($($t)*))
    };
}

pub fn console_log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("{}", message);
}

pub fn console_warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("warning: {}", message);
}

// ==================== DOM ====================
pub type LoopClosure = Closure<dyn FnMut(f64)>;

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("Window not found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

pub fn element(id: &str) -> Result<Element> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| anyhow!("No element found with ID : '{}'", id))
}

pub fn html_element(id: &str) -> Result<HtmlElement> {
    element(id)?
        .dyn_into::<HtmlElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlElement", element))
}

pub fn create_element(tag: &str) -> Result<Element> {
    document()?
        .create_element(tag)
        .map_err(|err| anyhow!("Could not create element '{}' : {:#?}", tag, err))
}

/// Milliseconds since page load, same clock the animation frame callback
/// receives
pub fn now() -> Result<f64> {
    Ok(window()?
        .performance()
        .ok_or_else(|| anyhow!("Performance object not found"))?
        .now())
}

pub fn create_raf_closure(f: impl FnMut(f64) + 'static) -> LoopClosure {
    Closure::wrap(Box::new(f) as Box<dyn FnMut(f64)>)
}

pub fn request_animation_frame(callback: &LoopClosure) -> Result<i32> {
    window()?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot request animation frame : {:#?}", err))
}

pub fn cancel_animation_frame(id: i32) -> Result<()> {
    window()?
        .cancel_animation_frame(id)
        .map_err(|err| anyhow!("Cannot cancel animation frame {} : {:#?}", id, err))
}

// ==================== Fetch ====================
pub async fn fetch_json<T>(json_path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let resp_value = fetch_with_str(json_path).await?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|element| anyhow!("error converting [{:#?}] to Response", element))?;
    if !resp.ok() {
        return Err(anyhow!(
            "fetching [{}] failed with status {}",
            json_path,
            resp.status()
        ));
    }
    let json = resp
        .json()
        .map_err(|err| anyhow!("Could not get JSON from response [{:#?}]", err))?;

    let json_value = JsFuture::from(json)
        .await
        .map_err(|err| anyhow!("error fetching [{:#?}]", err))?;

    serde_wasm_bindgen::from_value(json_value)
        .map_err(|err| anyhow!("error converting response : {:#?}", err))
}

async fn fetch_with_str(resource: &str) -> Result<JsValue> {
    let resp = window()?.fetch_with_str(resource);

    JsFuture::from(resp)
        .await
        .map_err(|err| anyhow!("error fetching : {:#?}", err))
}
