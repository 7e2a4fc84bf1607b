//! Data structures shared with the host browser.

use serde::{Deserialize, Serialize};

/// Tab identifier assigned by the host browser.
pub type TabId = i32;

/// A browser tab as delivered by the host's events and queries.
///
/// Only the fields this extension reads are kept; anything else the host
/// attaches is ignored during deserialization. Every field is optional
/// because the host omits them freely (a tab mid-creation has no committed
/// URL, a devtools window has no id).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabSnapshot {
    pub id: Option<TabId>,
    pub url: Option<String>,
    pub pending_url: Option<String>,
    pub status: Option<String>,
    pub window_id: Option<i32>,
}

impl TabSnapshot {
    /// URL to judge the tab by once it has settled: the committed URL,
    /// falling back to the not-yet-committed one.
    pub fn effective_url(&self) -> &str {
        self.url
            .as_deref()
            .or(self.pending_url.as_deref())
            .unwrap_or("")
    }

    /// URL known at creation time. Creation events usually carry only
    /// `pendingUrl`; a restored tab may have `url` filled in first.
    pub fn creation_url(&self) -> &str {
        self.pending_url
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("")
    }
}

/// The `changeInfo` payload of a tab update notification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TabChangeInfo {
    pub status: Option<String>,
}

impl TabChangeInfo {
    /// True once the host reports the tab finished loading.
    pub fn is_complete(&self) -> bool {
        self.status.as_deref() == Some("complete")
    }
}

/// Properties for a host `windows.create` call, shaped for direct
/// marshalling to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSpec {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub width: i32,
    pub height: i32,
    pub left: i32,
    pub top: i32,
    pub focused: bool,
}
