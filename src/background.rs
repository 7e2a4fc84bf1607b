//! Background-process glue: receives host tab events and runtime
//! messages, drives the coordinator, and carries out its decisions
//! through the JS bridge. Every host call is awaited so failures land
//! here as values instead of dying in a callback.

use std::cell::RefCell;

use serde::Deserialize;
use wasm_bindgen::prelude::*;

use crate::classifier::PageClassifier;
use crate::coordinator::{
    CreatedOutcome, PromptCoordinator, PromptRequest, RECHECK_DELAY_MS, prompt_window_spec,
};
use crate::messages::{
    Ack, CurrentTab, CurrentTabResponse, Request, SaveIntentResponse, validate_save_request,
};
use crate::store::{STORAGE_KEY, TabIntentRecord, TabStore};
use crate::tab_data::{TabChangeInfo, TabId, TabSnapshot};

// Import JS bridge functions
#[wasm_bindgen(module = "/background.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getTab(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryActiveTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(url: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createWindow(props: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeWindow(window_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    async fn delay(ms: u32);

    fn extensionBaseUrl() -> String;

    fn screenSize() -> JsValue;
}

struct Background {
    coordinator: PromptCoordinator,
    classifier: PageClassifier,
}

thread_local! {
    // Lives exactly as long as the background process; a host restart
    // starts over with an empty slot.
    static BACKGROUND: RefCell<Option<Background>> = const { RefCell::new(None) };
}

/// Runs `f` against the process-wide state, creating it on first touch.
/// The closure is synchronous, so no borrow survives across an await.
fn with_background<R>(f: impl FnOnce(&mut Background) -> R) -> R {
    BACKGROUND.with(|slot| {
        let mut slot = slot.borrow_mut();
        let background = slot.get_or_insert_with(|| Background {
            coordinator: PromptCoordinator::new(),
            classifier: PageClassifier::new(&extensionBaseUrl()),
        });
        f(background)
    })
}

#[derive(Debug, Deserialize)]
struct ScreenSize {
    width: i32,
    height: i32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        ScreenSize {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageSender {
    tab: Option<TabSnapshot>,
}

/// Seeds the persisted store on first install so every later read finds
/// a well-formed value.
#[wasm_bindgen(js_name = onInstalled)]
pub async fn on_installed() {
    match getStorage(STORAGE_KEY).await {
        Ok(value) if value.is_null() || value.is_undefined() => {
            match save_store(&TabStore::new()).await {
                Ok(()) => log::info!("tab store initialized"),
                Err(e) => log::error!("tab store initialization failed: {}", e),
            }
        }
        Ok(_) => {}
        Err(e) => log::error!("tab store initialization failed: {:?}", e),
    }
}

/// Host onCreated hook. Decides whether the new tab warrants a prompt,
/// waiting out the URL-settling delay before committing.
#[wasm_bindgen(js_name = onTabCreated)]
pub async fn on_tab_created(tab: JsValue) {
    let tab: TabSnapshot = match serde_wasm_bindgen::from_value(tab) {
        Ok(tab) => tab,
        Err(e) => {
            log::warn!("unreadable created-tab payload: {:?}", e);
            return;
        }
    };

    let outcome = with_background(|bg| bg.coordinator.on_created(&tab, &bg.classifier));
    let CreatedOutcome::Recheck { tab_id } = outcome else {
        return;
    };

    // Give the host time to fill in the tab's real destination.
    delay(RECHECK_DELAY_MS).await;

    let current: Option<TabSnapshot> = match getTab(tab_id).await {
        Ok(value) => serde_wasm_bindgen::from_value(value).ok(),
        // The tab closed during the delay; nothing to do.
        Err(_) => None,
    };

    let request =
        with_background(|bg| bg.coordinator.on_recheck(tab_id, current.as_ref(), &bg.classifier));
    if let Some(request) = request {
        open_prompt_window(request).await;
    }
}

/// Host onUpdated hook. Catches navigations whose final URL was not yet
/// known when the tab was created.
#[wasm_bindgen(js_name = onTabUpdated)]
pub async fn on_tab_updated(tab_id: TabId, change_info: JsValue, tab: JsValue) {
    let change: TabChangeInfo = serde_wasm_bindgen::from_value(change_info).unwrap_or_default();
    let tab: TabSnapshot = match serde_wasm_bindgen::from_value(tab) {
        Ok(tab) => tab,
        Err(e) => {
            log::warn!("unreadable updated-tab payload: {:?}", e);
            return;
        }
    };

    let request =
        with_background(|bg| bg.coordinator.on_updated(tab_id, &change, &tab, &bg.classifier));
    if let Some(request) = request {
        open_prompt_window(request).await;
    }
}

/// Host onRemoved hook.
#[wasm_bindgen(js_name = onTabRemoved)]
pub fn on_tab_removed(tab_id: TabId) {
    with_background(|bg| bg.coordinator.on_removed(tab_id));
}

/// Host onMessage hook; always resolves to exactly one terminal response.
#[wasm_bindgen(js_name = onMessage)]
pub async fn on_message(message: JsValue, sender: JsValue) -> JsValue {
    let request: Request = match serde_wasm_bindgen::from_value(message) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("unrecognized message: {:?}", e);
            return to_js(&SaveIntentResponse::fail("Unrecognized message"));
        }
    };

    match request {
        Request::SaveIntent {
            tab_id,
            intent,
            auto_triggered,
        } => {
            let sender: MessageSender = serde_wasm_bindgen::from_value(sender).unwrap_or_default();
            to_js(&handle_save_intent(tab_id, &intent, auto_triggered, sender.tab).await)
        }
        Request::GetCurrentTab => to_js(&handle_get_current_tab().await),
        Request::OpenDashboard => to_js(&handle_open_dashboard().await),
    }
}

/// Records an intent for one tab: validate first, then look the tab up,
/// refuse the dashboard, and upsert into the store. A prompt window that
/// the system opened is closed afterwards whatever the outcome.
async fn handle_save_intent(
    tab_id: Option<TabId>,
    intent: &str,
    auto_triggered: bool,
    sender_tab: Option<TabSnapshot>,
) -> SaveIntentResponse {
    let (tab_id, intent) = match validate_save_request(tab_id, intent) {
        Ok(valid) => valid,
        Err(e) => return SaveIntentResponse::fail(e),
    };

    let tab: TabSnapshot = match getTab(tab_id).await {
        Ok(value) => match serde_wasm_bindgen::from_value(value) {
            Ok(tab) => tab,
            Err(e) => {
                return SaveIntentResponse::fail(format!("Failed to parse tab details: {:?}", e));
            }
        },
        Err(e) => {
            return SaveIntentResponse::fail(format!("Failed to get tab details: {:?}", e));
        }
    };

    let url = tab.effective_url().to_string();
    if with_background(|bg| bg.classifier.is_dashboard(&url)) {
        log::warn!("refusing to record an intent for the dashboard tab");
        if auto_triggered {
            close_sender_window(sender_tab).await;
        }
        return SaveIntentResponse::fail("Cannot save intent for dashboard tab");
    }

    let record = TabIntentRecord::new(tab_id, url, intent, js_sys::Date::now() as i64);
    let mut store = match load_store().await {
        Ok(store) => store,
        Err(e) => return SaveIntentResponse::fail(e),
    };
    store.upsert(record);
    if let Err(e) = save_store(&store).await {
        return SaveIntentResponse::fail(e);
    }
    log::info!("intent recorded for tab {}", tab_id);

    if auto_triggered {
        close_sender_window(sender_tab).await;
    }
    SaveIntentResponse::ok()
}

/// Answers a manually opened prompt surface asking which tab to target.
async fn handle_get_current_tab() -> CurrentTabResponse {
    let active: Option<TabSnapshot> = match queryActiveTab().await {
        Ok(value) => serde_wasm_bindgen::from_value(value).ok(),
        Err(e) => {
            log::warn!("active-tab query failed: {:?}", e);
            None
        }
    };

    let resolved = with_background(|bg| {
        bg.coordinator
            .resolve_current_tab(active.as_ref(), &bg.classifier)
    });

    match resolved {
        Ok(tab) => CurrentTabResponse {
            tab: Some(current_tab_info(&tab)),
            error: None,
        },
        Err(reason) => CurrentTabResponse {
            tab: None,
            error: Some(reason),
        },
    }
}

/// Shapes a resolved tab for the wire. A tab still settling has no URL
/// worth showing; the surface gets a placeholder instead.
fn current_tab_info(tab: &TabSnapshot) -> CurrentTab {
    let url = tab.effective_url();
    CurrentTab {
        id: tab.id,
        url: if url.is_empty() {
            "Loading...".to_string()
        } else {
            url.to_string()
        },
    }
}

/// Opens the dashboard as a normal tab.
async fn handle_open_dashboard() -> Ack {
    let url = with_background(|bg| bg.classifier.dashboard_url().to_string());
    match createTab(&url).await {
        Ok(_) => Ack { success: true },
        Err(e) => {
            log::error!("failed to open dashboard: {:?}", e);
            Ack { success: false }
        }
    }
}

/// Opens the small centered prompt window. Failure is logged and dropped;
/// the tab simply goes unprompted this time.
async fn open_prompt_window(request: PromptRequest) {
    let size: ScreenSize =
        serde_wasm_bindgen::from_value(screenSize()).unwrap_or_default();
    let spec = prompt_window_spec(request.tab_id, size.width, size.height);

    let props = match serde_wasm_bindgen::to_value(&spec) {
        Ok(props) => props,
        Err(e) => {
            log::error!("failed to serialize prompt window props: {:?}", e);
            return;
        }
    };
    match createWindow(props).await {
        Ok(_) => log::info!("intent prompt opened for tab {}", request.tab_id),
        Err(e) => log::error!(
            "failed to open intent prompt for tab {}: {:?}",
            request.tab_id,
            e
        ),
    }
}

/// Closes the window hosting a system-opened prompt. A failure is logged
/// and ignored; a stray popup is not worth failing a save over.
async fn close_sender_window(sender_tab: Option<TabSnapshot>) {
    let Some(window_id) = sender_tab.and_then(|tab| tab.window_id) else {
        return;
    };
    if let Err(e) = removeWindow(window_id).await {
        log::warn!("failed to close prompt window {}: {:?}", window_id, e);
    }
}

async fn load_store() -> Result<TabStore, String> {
    let value = getStorage(STORAGE_KEY)
        .await
        .map_err(|e| format!("Failed to get storage: {:?}", e))?;

    if value.is_null() || value.is_undefined() {
        Ok(TabStore::new())
    } else {
        serde_wasm_bindgen::from_value(value)
            .map_err(|e| format!("Failed to parse storage: {:?}", e))
    }
}

async fn save_store(store: &TabStore) -> Result<(), String> {
    let value = serde_wasm_bindgen::to_value(store)
        .map_err(|e| format!("Failed to serialize storage: {:?}", e))?;

    setStorage(STORAGE_KEY, value)
        .await
        .map_err(|e| format!("Failed to save storage: {:?}", e))
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}
