//! URL classification: decides which pages may ever receive an intent
//! prompt. All checks are pure string predicates, total over arbitrary
//! input; the empty string always classifies as "skip".

use url::Url;

/// Path of the dashboard page inside the extension origin.
pub const DASHBOARD_PATH: &str = "dashboard/dashboard.html";

/// Path fragment identifying the intent prompt surface.
pub const PROMPT_PATH: &str = "popup/popup.html";

/// Sentinel addresses the host uses for brand-new tabs.
const NEW_TAB_URLS: &[&str] = &["about:blank", "chrome://newtab/"];

/// Classifies URLs relative to one extension installation.
///
/// The extension's origin is assigned by the host at install time, so the
/// classifier is built once from the runtime base URL and handed to
/// whoever needs it instead of reading ambient state.
#[derive(Debug, Clone, PartialEq)]
pub struct PageClassifier {
    origin: String,
    dashboard_url: String,
}

impl PageClassifier {
    /// `extension_base` is the extension origin with or without a trailing
    /// slash, e.g. `chrome-extension://abcdefgh/`.
    pub fn new(extension_base: &str) -> PageClassifier {
        let origin = extension_base.trim_end_matches('/').to_string();
        let dashboard_url = format!("{}/{}", origin, DASHBOARD_PATH);
        PageClassifier {
            origin,
            dashboard_url,
        }
    }

    /// The dashboard's canonical address.
    pub fn dashboard_url(&self) -> &str {
        &self.dashboard_url
    }

    /// True if `url` lives under this extension's origin (dashboard and
    /// prompt surface included).
    pub fn is_extension_owned(&self, url: &str) -> bool {
        !self.origin.is_empty() && !url.is_empty() && url.starts_with(&self.origin)
    }

    /// True if `url` is exactly the dashboard page.
    pub fn is_dashboard(&self, url: &str) -> bool {
        url == self.dashboard_url
    }

    /// True if `url` points at an intent prompt surface, query string or
    /// not, this installation or another.
    pub fn is_prompt_surface(&self, url: &str) -> bool {
        !url.is_empty() && url.contains(PROMPT_PATH)
    }

    /// Whether the prompt must never be offered for `url`.
    ///
    /// Skips empty URLs, this extension's own pages, and privileged or
    /// non-web schemes. `about:blank` stays eligible: a tab deliberately
    /// left blank deserves an intent as much as any other.
    pub fn should_skip_prompt(&self, url: &str) -> bool {
        if url.is_empty() || self.is_extension_owned(url) {
            return true;
        }
        if url.starts_with("about:blank") {
            return false;
        }
        url.starts_with("chrome://")
            || url.starts_with("chrome-extension://")
            || url.starts_with("about:")
            || url.starts_with("data:")
            || url.starts_with("javascript:")
            || url.starts_with("file:")
    }
}

/// True for the host's built-in blank and new-tab sentinel addresses.
pub fn is_blank_or_new_tab(url: &str) -> bool {
    NEW_TAB_URLS.contains(&url)
}

/// Host part of `url`, lowercased. `None` for anything without a
/// parseable host (data URLs, about pages, garbage).
pub fn extract_hostname(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(|h| h.to_lowercase())
}
