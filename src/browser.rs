/// Browser collaborator: reads windows/groups/tabs, applies tab commands

use serde::de::DeserializeOwned;
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::snapshot::BrowserSnapshot;
use crate::tab_data::{GroupId, Tab, TabGroup, TabId, Window, WindowId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrowserError {
    #[error("{call} failed: {message}")]
    Call { call: &'static str, message: String },

    #[error("could not decode {call} result: {message}")]
    Decode { call: &'static str, message: String },
}

/// What the panel needs from the browser
#[allow(async_fn_in_trait)]
pub trait Browser {
    async fn current_window_id(&self) -> Result<Option<WindowId>, BrowserError>;
    async fn current_tab(&self) -> Result<Option<Tab>, BrowserError>;
    async fn windows(&self) -> Result<Vec<Window>, BrowserError>;
    async fn groups(&self) -> Result<Vec<TabGroup>, BrowserError>;
    async fn tabs(&self) -> Result<Vec<Tab>, BrowserError>;

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), BrowserError>;
    async fn remove_tab(&self, tab_id: TabId) -> Result<(), BrowserError>;
    /// Move a tab into `group_id`, or into a new group when `None`
    async fn group_tab(&self, tab_id: TabId, group_id: Option<GroupId>) -> Result<(), BrowserError>;
}

/// Fetch everything and build a fresh snapshot
pub async fn load_snapshot<B: Browser>(browser: &B) -> Result<BrowserSnapshot, BrowserError> {
    let current_window_id = browser.current_window_id().await?;
    let current_tab_id = browser.current_tab().await?.and_then(|tab| tab.id);
    let windows = browser.windows().await?;
    let groups = browser.groups().await?;
    let tabs = browser.tabs().await?;

    log::debug!(
        "Snapshot: {} windows, {} groups, {} tabs",
        windows.len(),
        groups.len(),
        tabs.len()
    );

    Ok(BrowserSnapshot::new(current_window_id, current_tab_id, windows, groups, tabs))
}

// Import JS bridge functions
#[wasm_bindgen(module = "/sidepanel.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getCurrentWindow() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getCurrentTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getAllWindows() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getAllGroups() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getAllTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn activateTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn groupTab(tab_id: i32, group_id: JsValue) -> Result<(), JsValue>;

    fn subscribeBrowserEvents(callback: &js_sys::Function);
}

/// `Browser` over the chrome extension APIs
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChromeBrowser;

fn call_error(call: &'static str) -> impl FnOnce(JsValue) -> BrowserError {
    move |e| BrowserError::Call {
        call,
        message: format!("{:?}", e),
    }
}

fn decode<T: DeserializeOwned>(call: &'static str, value: JsValue) -> Result<T, BrowserError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| BrowserError::Decode {
        call,
        message: format!("{:?}", e),
    })
}

/// `None` for `undefined`/`null`, otherwise decode
fn decode_optional<T: DeserializeOwned>(call: &'static str, value: JsValue) -> Result<Option<T>, BrowserError> {
    if value.is_null() || value.is_undefined() {
        Ok(None)
    } else {
        decode(call, value).map(Some)
    }
}

impl Browser for ChromeBrowser {
    async fn current_window_id(&self) -> Result<Option<WindowId>, BrowserError> {
        let window_js = getCurrentWindow().await.map_err(call_error("windows.getCurrent"))?;
        let window: Option<Window> = decode_optional("windows.getCurrent", window_js)?;
        Ok(window.and_then(|w| w.id))
    }

    async fn current_tab(&self) -> Result<Option<Tab>, BrowserError> {
        let tab_js = getCurrentTab().await.map_err(call_error("tabs.query"))?;
        decode_optional("tabs.query", tab_js)
    }

    async fn windows(&self) -> Result<Vec<Window>, BrowserError> {
        let windows_js = getAllWindows().await.map_err(call_error("windows.getAll"))?;
        decode("windows.getAll", windows_js)
    }

    async fn groups(&self) -> Result<Vec<TabGroup>, BrowserError> {
        let groups_js = getAllGroups().await.map_err(call_error("tabGroups.query"))?;
        decode("tabGroups.query", groups_js)
    }

    async fn tabs(&self) -> Result<Vec<Tab>, BrowserError> {
        let tabs_js = getAllTabs().await.map_err(call_error("tabs.query"))?;
        decode("tabs.query", tabs_js)
    }

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), BrowserError> {
        activateTab(tab_id).await.map_err(call_error("tabs.update"))
    }

    async fn remove_tab(&self, tab_id: TabId) -> Result<(), BrowserError> {
        removeTab(tab_id).await.map_err(call_error("tabs.remove"))
    }

    async fn group_tab(&self, tab_id: TabId, group_id: Option<GroupId>) -> Result<(), BrowserError> {
        let group_js = group_id.map(JsValue::from).unwrap_or(JsValue::UNDEFINED);
        groupTab(tab_id, group_js).await.map_err(call_error("tabs.group"))
    }
}

/// Call `on_change` on every window, group or tab lifecycle event. The
/// listener lives for the rest of the page.
pub fn subscribe_browser_events(on_change: impl Fn() + 'static) {
    let listener = Closure::wrap(Box::new(on_change) as Box<dyn Fn()>);
    subscribeBrowserEvents(listener.as_ref().unchecked_ref());
    listener.forget();
}
