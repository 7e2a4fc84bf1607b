//! Wire types for the runtime messages exchanged between the surfaces
//! and the background process, tagged by `action` as they appear on the
//! wire.

use serde::{Deserialize, Serialize};

use crate::tab_data::TabId;

/// Requests a surface can send to the background process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Record `intent` for the tab `tab_id`. `auto_triggered` marks saves
    /// coming from a system-opened prompt window, which the background
    /// closes afterwards.
    #[serde(rename_all = "camelCase")]
    SaveIntent {
        #[serde(default)]
        tab_id: Option<TabId>,
        #[serde(default)]
        intent: String,
        #[serde(default)]
        auto_triggered: bool,
    },
    /// Ask which tab a manually opened prompt surface should target.
    GetCurrentTab,
    /// Open the dashboard as a normal tab.
    OpenDashboard,
}

/// Terminal response to a save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveIntentResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveIntentResponse {
    pub fn ok() -> SaveIntentResponse {
        SaveIntentResponse {
            success: true,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> SaveIntentResponse {
        SaveIntentResponse {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Response to `getCurrentTab`: the resolved target, or why there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTabResponse {
    #[serde(default)]
    pub tab: Option<CurrentTab>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The tab a prompt surface should record an intent for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTab {
    pub id: Option<TabId>,
    pub url: String,
}

/// Bare acknowledgement for fire-and-forget actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

/// Pre-write validation of a save request: the tab id and a non-blank
/// intent must both be present. Returns the id and the trimmed intent.
pub fn validate_save_request(
    tab_id: Option<TabId>,
    intent: &str,
) -> Result<(TabId, String), String> {
    let intent = intent.trim();
    match tab_id {
        Some(id) if !intent.is_empty() => Ok((id, intent.to_string())),
        _ => Err("Missing tabId or intent".to_string()),
    }
}
