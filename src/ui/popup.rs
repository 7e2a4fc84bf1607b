//! Intent prompt surface: a small window asking why a tab was opened.
//! Opened by the background process for new tabs (with `tabId` and
//! `autoTrigger` query parameters) or manually from the toolbar.

use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::classifier::{PageClassifier, is_blank_or_new_tab};
use crate::messages::{CurrentTabResponse, Request, SaveIntentResponse};
use crate::tab_data::{TabId, TabSnapshot};

// Import JS bridge functions
#[wasm_bindgen(module = "/popup.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn sendMessage(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTab(tab_id: i32) -> Result<JsValue, JsValue>;

    async fn delay(ms: u32);
}

/// Fixed intent suggestions; "Other..." reveals a free-text field.
const INTENT_SUGGESTIONS: &[&str] = &[
    "Research",
    "Work",
    "Shopping",
    "Entertainment",
    "Learning",
    "Social",
];

const OTHER_VALUE: &str = "other";

#[derive(Clone, PartialEq)]
enum TargetTab {
    Loading,
    Found {
        id: Option<TabId>,
        url: String,
        /// Extension page; recording an intent for it makes no sense.
        locked: bool,
    },
    Missing(String),
}

#[derive(Clone, PartialEq)]
enum SaveState {
    Idle,
    Saving,
    Saved,
    Failed(String),
}

#[derive(Clone, PartialEq)]
struct PromptParams {
    tab_id: Option<TabId>,
    auto_triggered: bool,
}

#[function_component(App)]
pub fn app() -> Html {
    let target = use_state(|| TargetTab::Loading);
    let selection = use_state(String::new);
    let other_text = use_state(String::new);
    let save_state = use_state(|| SaveState::Idle);
    let invalid = use_state(|| false);
    let params = use_state(prompt_params);

    // Resolve the target tab on mount
    {
        let target = target.clone();
        let tab_id = params.tab_id;
        use_effect_with((), move |_| {
            spawn_local(async move {
                target.set(fetch_target_tab(tab_id).await);
            });
            || ()
        });
    }

    // Suggestion dropdown change
    let on_select = {
        let selection = selection.clone();
        let invalid = invalid.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                selection.set(select.value());
                invalid.set(false);
            }
        })
    };

    // Free-text intent input
    let on_other_input = {
        let other_text = other_text.clone();
        let invalid = invalid.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                other_text.set(input.value());
                invalid.set(false);
            }
        })
    };

    // Save handler, shared by the button and the Enter key
    let on_save = {
        let target = target.clone();
        let selection = selection.clone();
        let other_text = other_text.clone();
        let save_state = save_state.clone();
        let invalid = invalid.clone();
        let auto_triggered = params.auto_triggered;

        Callback::from(move |_: ()| {
            let tab_id = match &*target {
                TargetTab::Found {
                    id: Some(id),
                    locked: false,
                    ..
                } => *id,
                _ => {
                    save_state.set(SaveState::Failed("No tab identified".to_string()));
                    return;
                }
            };

            let intent = if *selection == OTHER_VALUE {
                other_text.trim().to_string()
            } else {
                (*selection).clone()
            };
            if intent.is_empty() {
                invalid.set(true);
                save_state.set(SaveState::Failed(
                    "Please select or enter an intent".to_string(),
                ));
                return;
            }

            invalid.set(false);
            save_state.set(SaveState::Saving);

            let save_state = save_state.clone();
            spawn_local(async move {
                let request = Request::SaveIntent {
                    tab_id: Some(tab_id),
                    intent,
                    auto_triggered,
                };
                match send_request(&request).await {
                    Ok(value) => {
                        let response: SaveIntentResponse = serde_wasm_bindgen::from_value(value)
                            .unwrap_or_else(|_| SaveIntentResponse::fail("Malformed response"));
                        if response.success {
                            save_state.set(SaveState::Saved);
                            // The background closes system-opened prompt
                            // windows; this covers the manual case.
                            delay(750).await;
                            close_window();
                        } else {
                            save_state.set(SaveState::Failed(response.error.unwrap_or_else(
                                || "Failed to save intent".to_string(),
                            )));
                        }
                    }
                    Err(e) => save_state.set(SaveState::Failed(e)),
                }
            });
        })
    };

    // Enter in the free-text field saves immediately
    let on_other_keypress = {
        let on_save = on_save.clone();
        Callback::from(move |e: KeyboardEvent| {
            if e.key() == "Enter" {
                e.prevent_default();
                on_save.emit(());
            }
        })
    };

    // Open dashboard handler
    let on_open_dashboard = {
        Callback::from(move |_: MouseEvent| {
            spawn_local(async move {
                let _ = send_request(&Request::OpenDashboard).await;
                close_window();
            });
        })
    };

    let inputs_disabled = matches!(
        &*target,
        TargetTab::Found { locked: true, .. } | TargetTab::Missing(_)
    );
    let save_disabled = matches!(*save_state, SaveState::Saving)
        || !matches!(
            &*target,
            TargetTab::Found {
                id: Some(_),
                locked: false,
                ..
            }
        );

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"TabSage"}</h1>
            <p class="popup-subtitle">{"Why did you open this tab?"}</p>

            // Target tab display
            {match &*target {
                TargetTab::Loading => html! {
                    <p class="current-url">{"Loading..."}</p>
                },
                TargetTab::Found { url, locked, .. } => html! {
                    <>
                        <p class="current-url" title={url.clone()}>{url.clone()}</p>
                        if *locked {
                            <Alert r#type={AlertType::Warning} title={"Cannot set intent for this page"} inline={true}>
                            </Alert>
                        }
                    </>
                },
                TargetTab::Missing(reason) => html! {
                    <Alert r#type={AlertType::Warning} title={reason.clone()} inline={true}>
                    </Alert>
                },
            }}

            // Intent picker
            <div class="intent-form">
                <select
                    class={classes!("intent-select", (*invalid && *selection != OTHER_VALUE).then_some("is-invalid"))}
                    onchange={on_select}
                    disabled={inputs_disabled}
                >
                    <option value="" selected={selection.is_empty()} disabled={true}>
                        {"Select an intent..."}
                    </option>
                    {for INTENT_SUGGESTIONS.iter().map(|intent| html! {
                        <option value={*intent} selected={*selection == *intent}>{*intent}</option>
                    })}
                    <option value={OTHER_VALUE} selected={*selection == OTHER_VALUE}>{"Other..."}</option>
                </select>

                if *selection == OTHER_VALUE {
                    <input
                        type="text"
                        class={classes!("other-intent", (*invalid).then_some("is-invalid"))}
                        placeholder="What is this tab for?"
                        value={(*other_text).clone()}
                        oninput={on_other_input}
                        onkeypress={on_other_keypress}
                        disabled={inputs_disabled}
                    />
                }
            </div>

            // Status display
            {match &*save_state {
                SaveState::Saving => html! {
                    <div class="loading-text-center">
                        <Spinner />
                    </div>
                },
                SaveState::Saved => html! {
                    <Alert r#type={AlertType::Success} title={"Intent saved!"} inline={true}>
                    </Alert>
                },
                SaveState::Failed(err) => html! {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {err.clone()}
                    </Alert>
                },
                SaveState::Idle => html! {}
            }}

            <div class="flex-column-gap">
                <Button onclick={on_save.reform(|_| ())} disabled={save_disabled} block={true}>
                    {"Save Intent"}
                </Button>
                <Button onclick={on_open_dashboard} variant={ButtonVariant::Secondary} block={true}>
                    {"Open Dashboard"}
                </Button>
            </div>

            <p class="footer-popup">
                {"TabSage v0.1.0"}
            </p>
        </div>
    }
}

// Helper functions

/// Query parameters a system-opened prompt window arrives with.
fn prompt_params() -> PromptParams {
    let search = web_sys::window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default();

    match web_sys::UrlSearchParams::new_with_str(&search) {
        Ok(query) => PromptParams {
            tab_id: query.get("tabId").and_then(|v| v.parse().ok()),
            auto_triggered: query.get("autoTrigger").as_deref() == Some("true"),
        },
        Err(_) => PromptParams {
            tab_id: None,
            auto_triggered: false,
        },
    }
}

/// Looks up the tab this prompt should record an intent for: directly by
/// id when the background opened us, otherwise by asking the background
/// which tab is current.
async fn fetch_target_tab(tab_id: Option<TabId>) -> TargetTab {
    match tab_id {
        Some(id) => match getTab(id).await {
            Ok(value) => match serde_wasm_bindgen::from_value::<TabSnapshot>(value) {
                Ok(tab) => target_from(tab.id.or(Some(id)), tab.effective_url()),
                Err(e) => TargetTab::Missing(format!("Error loading tab info: {:?}", e)),
            },
            Err(e) => TargetTab::Missing(format!("Error loading tab info: {:?}", e)),
        },
        None => match send_request(&Request::GetCurrentTab).await {
            Ok(value) => match serde_wasm_bindgen::from_value::<CurrentTabResponse>(value) {
                Ok(response) => match response.tab {
                    Some(tab) => target_from(tab.id, &tab.url),
                    None => TargetTab::Missing(
                        response
                            .error
                            .unwrap_or_else(|| "No active tab found".to_string()),
                    ),
                },
                Err(e) => TargetTab::Missing(format!("Error finding current tab: {:?}", e)),
            },
            Err(e) => TargetTab::Missing(e),
        },
    }
}

fn target_from(id: Option<TabId>, url: &str) -> TargetTab {
    let classifier = own_classifier();
    let locked = classifier.is_dashboard(url) || classifier.is_prompt_surface(url);
    let display = if url.is_empty() || is_blank_or_new_tab(url) {
        "New Tab".to_string()
    } else {
        url.to_string()
    };

    TargetTab::Found {
        id,
        url: display,
        locked,
    }
}

/// Classifier for the installation this page is running in.
fn own_classifier() -> PageClassifier {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default();
    PageClassifier::new(&origin)
}

async fn send_request(request: &Request) -> Result<JsValue, String> {
    let message = serde_wasm_bindgen::to_value(request)
        .map_err(|e| format!("Failed to serialize message: {:?}", e))?;

    sendMessage(message)
        .await
        .map_err(|e| format!("Message failed: {:?}", e))
}

fn close_window() {
    if let Some(window) = web_sys::window() {
        let _ = window.close();
    }
}
