//! Dashboard page: the recorded session grouped by intent, with rename,
//! close-group and export controls.

use std::collections::HashSet;

use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, console};
use yew::prelude::*;

use crate::aggregator::{
    export_filename, export_session, favicon_url, group_by_intent, group_tab_ids, session_stats,
    sorted_group_names,
};
use crate::store::{STORAGE_KEY, TabIntentRecord, TabStore};
use crate::tab_data::TabId;

// Import JS bridge functions
#[wasm_bindgen(module = "/dashboard.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTabs(tab_ids: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn createBlankTab() -> Result<JsValue, JsValue>;

    fn exportToFile(data: &str, filename: &str);
}

#[derive(Clone, PartialEq)]
enum ViewState {
    Loading,
    Idle,
    Error(String),
}

#[function_component(Dashboard)]
pub fn dashboard() -> Html {
    let state = use_state(|| ViewState::Loading);
    let store = use_state(TabStore::new);
    let renaming_group = use_state(|| None::<String>);
    let rename_input_value = use_state(String::new);
    let notice = use_state(|| None::<String>);

    // Load the recorded session on mount
    {
        let state = state.clone();
        let store = store.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                match load_store().await {
                    Ok(data) => {
                        store.set(data);
                        state.set(ViewState::Idle);
                    }
                    Err(e) => {
                        state.set(ViewState::Error(format!("Failed to load: {}", e)));
                    }
                }
            });
            || ()
        });
    }

    // Reload handler
    let on_refresh = {
        let state = state.clone();
        let store = store.clone();
        let notice = notice.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let store = store.clone();
            notice.set(None);
            state.set(ViewState::Loading);

            spawn_local(async move {
                match load_store().await {
                    Ok(data) => {
                        store.set(data);
                        state.set(ViewState::Idle);
                    }
                    Err(e) => {
                        state.set(ViewState::Error(format!("Failed to load: {}", e)));
                    }
                }
            });
        })
    };

    // New tab handler; the background takes it from there
    let on_new_tab = {
        Callback::from(move |_| {
            spawn_local(async move {
                if let Err(e) = createBlankTab().await {
                    console::log_1(&format!("Failed to open tab: {:?}", e).into());
                }
            });
        })
    };

    // Start renaming a group
    let on_start_rename = {
        let renaming_group = renaming_group.clone();
        let rename_input_value = rename_input_value.clone();

        Callback::from(move |intent: String| {
            rename_input_value.set(intent.clone());
            renaming_group.set(Some(intent));
        })
    };

    // Rename input change
    let on_rename_input = {
        let rename_input_value = rename_input_value.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                rename_input_value.set(input.value());
            }
        })
    };

    // Commit the rename. An empty or unchanged name changes nothing and
    // writes nothing.
    let on_save_rename = {
        let renaming_group = renaming_group.clone();
        let rename_input_value = rename_input_value.clone();
        let store = store.clone();
        let state = state.clone();

        Callback::from(move |_| {
            if let Some(old_intent) = (*renaming_group).clone() {
                let new_intent = rename_input_value.trim().to_string();
                let mut updated = (*store).clone();

                if updated.rename_intent(&old_intent, &new_intent) > 0 {
                    store.set(updated.clone());

                    let state = state.clone();
                    spawn_local(async move {
                        if let Err(e) = save_store(&updated).await {
                            state.set(ViewState::Error(format!("Failed to save: {}", e)));
                        }
                    });
                }

                renaming_group.set(None);
            }
        })
    };

    // Cancel renaming
    let on_cancel_rename = {
        let renaming_group = renaming_group.clone();
        Callback::from(move |_| {
            renaming_group.set(None);
        })
    };

    // Close every tab of a group. The records go regardless of whether
    // the live tabs could be closed; storage is the source of truth.
    let on_close_group = {
        let store = store.clone();
        let state = state.clone();

        Callback::from(move |label: String| {
            let tab_ids = group_tab_ids(store.records(), &label);
            let id_set: HashSet<TabId> = tab_ids.iter().copied().collect();
            let mut updated = (*store).clone();
            updated.remove_ids(&id_set);
            store.set(updated.clone());

            let state = state.clone();
            spawn_local(async move {
                if let Err(e) = close_tabs(tab_ids).await {
                    console::log_1(&format!("Some tabs could not be closed: {}", e).into());
                }
                if let Err(e) = save_store(&updated).await {
                    state.set(ViewState::Error(format!("Failed to save: {}", e)));
                }
            });
        })
    };

    // Export the whole session as JSON
    let on_export = {
        let store = store.clone();
        let notice = notice.clone();

        Callback::from(move |_| {
            let now = js_sys::Date::new_0();
            match export_session(store.records(), &date_iso(&now)) {
                Some(payload) => match serde_json::to_string_pretty(&payload) {
                    Ok(json) => {
                        notice.set(None);
                        exportToFile(&json, &export_filename(&date_ymd(&now)));
                    }
                    Err(e) => {
                        console::log_1(&format!("Export failed: {:?}", e).into());
                    }
                },
                None => {
                    notice.set(Some("No tab data to export".to_string()));
                }
            }
        })
    };

    let stats = session_stats(store.records());
    let groups = group_by_intent(store.records());
    let group_names = sorted_group_names(&groups);

    html! {
        <div class="container">
            <div class="header">
                <h1 class="main-title">{"TabSage Dashboard"}</h1>
                <div class="header-actions">
                    <Button onclick={on_new_tab} variant={ButtonVariant::Secondary}>
                        {"➕ New Tab"}
                    </Button>
                    <Button onclick={on_refresh} variant={ButtonVariant::Secondary}>
                        {"🔄 Refresh"}
                    </Button>
                    <Button onclick={on_export}>
                        {"📥 Export Session"}
                    </Button>
                </div>
            </div>

            // Session stats
            <div class="stats-bar">
                <div class="stat-item">
                    <span class="stat-value">{stats.tab_count}</span>
                    <span class="stat-label">{"tabs"}</span>
                </div>
                <div class="stat-item">
                    <span class="stat-value">{stats.group_count}</span>
                    <span class="stat-label">{"groups"}</span>
                </div>
                <div class="stat-item">
                    <span class="stat-value">
                        {match stats.session_start {
                            Some(ts) => format_timestamp(ts),
                            None => "-".to_string(),
                        }}
                    </span>
                    <span class="stat-label">{"session start"}</span>
                </div>
            </div>

            // Status display
            {match &*state {
                ViewState::Loading => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{"Loading session..."}</p>
                    </div>
                },
                ViewState::Error(err) => html! {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {err.clone()}
                    </Alert>
                },
                ViewState::Idle => html! {}
            }}

            if let Some(message) = (*notice).clone() {
                <Alert r#type={AlertType::Info} title={message} inline={true}>
                </Alert>
            }

            // Intent groups
            if store.is_empty() {
                if matches!(*state, ViewState::Idle) {
                    <div class="empty-state">
                        <p>{"No tabs recorded yet."}</p>
                        <p class="empty-state-hint">{"Open a new tab and tell TabSage why."}</p>
                    </div>
                }
            } else {
                <div class="groups-list">
                    {for group_names.iter().map(|intent| {
                        let records = groups.get(intent).unwrap();
                        let is_renaming = (*renaming_group).as_ref() == Some(intent);

                        html! {
                            <IntentGroupCard
                                key={intent.clone()}
                                intent={intent.clone()}
                                records={records.clone()}
                                is_renaming={is_renaming}
                                rename_value={(*rename_input_value).clone()}
                                on_start_rename={on_start_rename.clone()}
                                on_save_rename={on_save_rename.clone()}
                                on_cancel_rename={on_cancel_rename.clone()}
                                on_rename_input={on_rename_input.clone()}
                                on_close={on_close_group.clone()}
                            />
                        }
                    })}
                </div>
            }

            // Footer stats
            <div class="footer">
                {format!("{} groups • {} tabs recorded", stats.group_count, stats.tab_count)}
            </div>
        </div>
    }
}

// Intent group card component
#[derive(Properties, PartialEq)]
struct IntentGroupCardProps {
    intent: String,
    records: Vec<TabIntentRecord>,
    is_renaming: bool,
    rename_value: String,
    on_start_rename: Callback<String>,
    on_save_rename: Callback<()>,
    on_cancel_rename: Callback<()>,
    on_rename_input: Callback<InputEvent>,
    on_close: Callback<String>,
}

#[function_component(IntentGroupCard)]
fn intent_group_card(props: &IntentGroupCardProps) -> Html {
    html! {
        <div class="intent-group">
            // Header
            <div class="group-header">
                <div class="group-title-container">
                    if props.is_renaming {
                        <div class="group-title-edit-mode">
                            <input
                                type="text"
                                value={props.rename_value.clone()}
                                oninput={props.on_rename_input.clone()}
                                class="group-title-input"
                            />
                            <Button
                                onclick={props.on_save_rename.reform(|_| ())}
                            >
                                {"✓"}
                            </Button>
                            <Button
                                onclick={props.on_cancel_rename.reform(|_| ())}
                                variant={ButtonVariant::Secondary}
                            >
                                {"✗"}
                            </Button>
                        </div>
                    } else {
                        <div class="group-title-view-mode">
                            <h3
                                class="group-title"
                                onclick={props.on_start_rename.reform({
                                    let intent = props.intent.clone();
                                    move |_| intent.clone()
                                })}
                            >
                                {&props.intent}
                            </h3>
                            <span class="edit-icon">{"✏️"}</span>
                        </div>
                    }
                    <span class="group-count">
                        {format!("{} tabs", props.records.len())}
                    </span>
                </div>

                <div class="group-actions">
                    <Button
                        onclick={props.on_close.reform({
                            let intent = props.intent.clone();
                            move |_| intent.clone()
                        })}
                        variant={ButtonVariant::Danger}
                    >
                        {"✕ Close Group"}
                    </Button>
                </div>
            </div>

            // Recorded tabs
            <div class="tabs-list">
                {for props.records.iter().map(|record| html! {
                    <div key={record.id.to_string()} class="tab-item">
                        <img src={favicon_url(&record.url)} class="favicon" alt="" />
                        <div class="tab-content">
                            <a
                                href={record.url.clone()}
                                target="_blank"
                                class="tab-url"
                                title={record.url.clone()}
                            >
                                {&record.url}
                            </a>
                            <small class="tab-date">{format_timestamp(record.timestamp)}</small>
                        </div>
                    </div>
                })}
            </div>
        </div>
    }
}

// Helper functions

async fn load_store() -> Result<TabStore, String> {
    let storage_js = getStorage(STORAGE_KEY)
        .await
        .map_err(|e| format!("Failed to get storage: {:?}", e))?;

    if storage_js.is_null() || storage_js.is_undefined() {
        Ok(TabStore::new())
    } else {
        serde_wasm_bindgen::from_value(storage_js)
            .map_err(|e| format!("Failed to parse storage: {:?}", e))
    }
}

async fn save_store(store: &TabStore) -> Result<(), String> {
    let storage_js = serde_wasm_bindgen::to_value(store)
        .map_err(|e| format!("Failed to serialize storage: {:?}", e))?;

    setStorage(STORAGE_KEY, storage_js)
        .await
        .map_err(|e| format!("Failed to save storage: {:?}", e))
}

/// Best-effort close; tabs the user already closed by hand are expected.
async fn close_tabs(tab_ids: Vec<TabId>) -> Result<(), String> {
    if tab_ids.is_empty() {
        return Ok(());
    }

    let tab_ids_js = serde_wasm_bindgen::to_value(&tab_ids)
        .map_err(|e| format!("Failed to serialize tab ids: {:?}", e))?;

    removeTabs(tab_ids_js)
        .await
        .map_err(|e| format!("{:?}", e))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    let date = js_sys::Date::new(&JsValue::from_f64(timestamp_ms as f64));
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}",
        date.get_full_year(),
        date.get_month() + 1,
        date.get_date(),
        date.get_hours(),
        date.get_minutes()
    )
}

fn date_iso(date: &js_sys::Date) -> String {
    date.to_iso_string().as_string().unwrap_or_default()
}

fn date_ymd(date: &js_sys::Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.get_full_year(),
        date.get_month() + 1,
        date.get_date()
    )
}
