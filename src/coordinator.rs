//! Event-driven coordination of the intent prompt. Guarantees at most one
//! prompt per tab lifetime while creation and update notifications race,
//! and remembers the most recently created tab as a fallback for manual
//! prompt surfaces.

use std::collections::HashSet;

use crate::classifier::{PROMPT_PATH, PageClassifier};
use crate::tab_data::{TabChangeInfo, TabId, TabSnapshot, WindowSpec};

/// How long after creation a tab is re-examined, giving the host time to
/// fill in the real destination URL.
pub const RECHECK_DELAY_MS: u32 = 300;

/// Prompt surface dimensions.
pub const PROMPT_WIDTH: i32 = 400;
pub const PROMPT_HEIGHT: i32 = 280;

/// What the glue should do after a creation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedOutcome {
    /// Extension-owned or already-prompted tab; nothing to schedule.
    Ignore,
    /// Re-examine the tab after [`RECHECK_DELAY_MS`].
    Recheck { tab_id: TabId },
}

/// An instruction to open the prompt surface for one tab. Issued at most
/// once per tab lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub tab_id: TabId,
}

/// Per-tab prompt lifecycle. A tab id is Unseen (in neither set), has a
/// re-check pending (`pending`), or has been prompted (`prompted`).
/// Prompted is terminal until the tab is removed; removal releases the id
/// so host id reuse is treated as a fresh tab.
///
/// All state lives in this struct and dies with the background process.
/// Losing it on restart only means an already-prompted tab could be
/// prompted again, which the save path tolerates by overwriting.
#[derive(Debug, Default)]
pub struct PromptCoordinator {
    prompted: HashSet<TabId>,
    pending: HashSet<TabId>,
    most_recent: Option<TabSnapshot>,
}

impl PromptCoordinator {
    pub fn new() -> PromptCoordinator {
        PromptCoordinator::default()
    }

    /// Tab creation: remember the tab as the most recent one, then decide
    /// whether a delayed eligibility re-check is warranted.
    pub fn on_created(&mut self, tab: &TabSnapshot, classifier: &PageClassifier) -> CreatedOutcome {
        self.most_recent = Some(tab.clone());

        let Some(tab_id) = tab.id else {
            return CreatedOutcome::Ignore;
        };
        // Our own pages must never re-trigger the prompt.
        if classifier.is_extension_owned(tab.creation_url()) {
            return CreatedOutcome::Ignore;
        }
        if self.has_prompted(tab_id) {
            return CreatedOutcome::Ignore;
        }

        self.pending.insert(tab_id);
        CreatedOutcome::Recheck { tab_id }
    }

    /// The delayed re-check, fed the tab's re-fetched state. `None` means
    /// the tab vanished during the delay; that ends the attempt silently.
    pub fn on_recheck(
        &mut self,
        tab_id: TabId,
        current: Option<&TabSnapshot>,
        classifier: &PageClassifier,
    ) -> Option<PromptRequest> {
        self.pending.remove(&tab_id);

        let current = current?;
        if classifier.should_skip_prompt(current.effective_url()) {
            return None;
        }
        self.mark_prompted(tab_id)
    }

    /// Update notification. Only a completed load counts; this is the path
    /// for navigations whose final URL was not yet known at creation time.
    pub fn on_updated(
        &mut self,
        tab_id: TabId,
        change: &TabChangeInfo,
        tab: &TabSnapshot,
        classifier: &PageClassifier,
    ) -> Option<PromptRequest> {
        if !change.is_complete() || self.has_prompted(tab_id) {
            return None;
        }
        if classifier.should_skip_prompt(tab.effective_url()) {
            return None;
        }
        self.mark_prompted(tab_id)
    }

    /// Tab removal: release the id entirely. The host may hand the same id
    /// to a future tab.
    pub fn on_removed(&mut self, tab_id: TabId) {
        self.prompted.remove(&tab_id);
        self.pending.remove(&tab_id);
        // A closed tab is useless as a fallback target.
        if self.most_recent.as_ref().and_then(|r| r.id) == Some(tab_id) {
            self.most_recent = None;
        }
    }

    /// Check-and-set of the terminal state. The insert happens before any
    /// prompt window is opened, so racing creation and update paths cannot
    /// both get a request for the same tab.
    fn mark_prompted(&mut self, tab_id: TabId) -> Option<PromptRequest> {
        if self.prompted.insert(tab_id) {
            Some(PromptRequest { tab_id })
        } else {
            None
        }
    }

    pub fn has_prompted(&self, tab_id: TabId) -> bool {
        self.prompted.contains(&tab_id)
    }

    pub fn most_recent_tab(&self) -> Option<&TabSnapshot> {
        self.most_recent.as_ref()
    }

    /// Picks the tab a manually opened prompt surface should target: the
    /// host's focused tab if usable, otherwise the most recently created
    /// tab. A dashboard tab is returned as-is (the surface decides how to
    /// present it); another prompt surface is refused outright, since
    /// recording an intent for the prompt itself is never meaningful.
    pub fn resolve_current_tab(
        &self,
        active: Option<&TabSnapshot>,
        classifier: &PageClassifier,
    ) -> Result<TabSnapshot, String> {
        if let Some(tab) = active {
            if classifier.is_prompt_surface(tab.effective_url()) {
                return Err("Cannot set intent for the intent popup".to_string());
            }
            return Ok(tab.clone());
        }
        match self.most_recent_tab() {
            Some(recent) => Ok(recent.clone()),
            None => Err("No active tab found".to_string()),
        }
    }
}

/// Window properties for a system-initiated prompt: a small centered
/// focused popup carrying the target tab id and the auto-trigger marker
/// in its query string.
pub fn prompt_window_spec(tab_id: TabId, screen_width: i32, screen_height: i32) -> WindowSpec {
    WindowSpec {
        url: format!("{}?tabId={}&autoTrigger=true", PROMPT_PATH, tab_id),
        kind: "popup".to_string(),
        width: PROMPT_WIDTH,
        height: PROMPT_HEIGHT,
        left: (screen_width - PROMPT_WIDTH) / 2,
        top: (screen_height - PROMPT_HEIGHT) / 2,
        focused: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "chrome-extension://abcdefghijklmnopqrstuvwxyzabcdef/";

    fn classifier() -> PageClassifier {
        PageClassifier::new(BASE)
    }

    fn web_tab(id: TabId, url: &str) -> TabSnapshot {
        TabSnapshot {
            id: Some(id),
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn pending_tab(id: TabId, pending_url: &str) -> TabSnapshot {
        TabSnapshot {
            id: Some(id),
            pending_url: Some(pending_url.to_string()),
            ..Default::default()
        }
    }

    fn complete() -> TabChangeInfo {
        TabChangeInfo {
            status: Some("complete".to_string()),
        }
    }

    fn loading() -> TabChangeInfo {
        TabChangeInfo {
            status: Some("loading".to_string()),
        }
    }

    #[test]
    fn test_created_schedules_recheck() {
        let mut coordinator = PromptCoordinator::new();

        let outcome = coordinator.on_created(&pending_tab(1, "https://example.com/"), &classifier());

        assert_eq!(outcome, CreatedOutcome::Recheck { tab_id: 1 });
        assert!(coordinator.pending.contains(&1));
        assert!(!coordinator.has_prompted(1));
    }

    #[test]
    fn test_created_ignores_extension_pages_but_tracks_recency() {
        let mut coordinator = PromptCoordinator::new();
        let dashboard = pending_tab(2, classifier().dashboard_url());

        let outcome = coordinator.on_created(&dashboard, &classifier());

        assert_eq!(outcome, CreatedOutcome::Ignore);
        assert!(!coordinator.pending.contains(&2));
        assert_eq!(coordinator.most_recent_tab(), Some(&dashboard));
    }

    #[test]
    fn test_created_ignores_tab_without_id() {
        let mut coordinator = PromptCoordinator::new();
        let tab = TabSnapshot {
            url: Some("https://example.com/".to_string()),
            ..Default::default()
        };

        assert_eq!(coordinator.on_created(&tab, &classifier()), CreatedOutcome::Ignore);
    }

    #[test]
    fn test_recheck_prompts_eligible_tab_once() {
        let mut coordinator = PromptCoordinator::new();
        coordinator.on_created(&pending_tab(1, "https://example.com/"), &classifier());

        let settled = web_tab(1, "https://example.com/");
        let request = coordinator.on_recheck(1, Some(&settled), &classifier());

        assert_eq!(request, Some(PromptRequest { tab_id: 1 }));
        assert!(coordinator.has_prompted(1));
        assert!(!coordinator.pending.contains(&1));

        // A second pass over the same tab stays quiet.
        assert_eq!(coordinator.on_recheck(1, Some(&settled), &classifier()), None);
    }

    #[test]
    fn test_recheck_aborts_when_tab_vanished() {
        let mut coordinator = PromptCoordinator::new();
        coordinator.on_created(&pending_tab(1, "https://example.com/"), &classifier());

        assert_eq!(coordinator.on_recheck(1, None, &classifier()), None);
        assert!(!coordinator.has_prompted(1));
        assert!(!coordinator.pending.contains(&1));
    }

    #[test]
    fn test_recheck_skips_tab_that_settled_on_privileged_url() {
        let mut coordinator = PromptCoordinator::new();
        coordinator.on_created(&pending_tab(1, "https://example.com/"), &classifier());

        let settled = web_tab(1, "chrome://settings/");
        assert_eq!(coordinator.on_recheck(1, Some(&settled), &classifier()), None);
        assert!(!coordinator.has_prompted(1));
    }

    #[test]
    fn test_blank_tab_gets_prompted() {
        let mut coordinator = PromptCoordinator::new();
        coordinator.on_created(&pending_tab(3, "about:blank"), &classifier());

        let settled = web_tab(3, "about:blank");
        assert_eq!(
            coordinator.on_recheck(3, Some(&settled), &classifier()),
            Some(PromptRequest { tab_id: 3 })
        );
    }

    #[test]
    fn test_update_prompts_on_complete_load() {
        let mut coordinator = PromptCoordinator::new();
        let tab = web_tab(4, "https://example.com/article");

        let request = coordinator.on_updated(4, &complete(), &tab, &classifier());

        assert_eq!(request, Some(PromptRequest { tab_id: 4 }));
        assert!(coordinator.has_prompted(4));
    }

    #[test]
    fn test_update_ignores_incomplete_loads() {
        let mut coordinator = PromptCoordinator::new();
        let tab = web_tab(4, "https://example.com/");

        assert_eq!(coordinator.on_updated(4, &loading(), &tab, &classifier()), None);
        assert_eq!(
            coordinator.on_updated(4, &TabChangeInfo::default(), &tab, &classifier()),
            None
        );
        assert!(!coordinator.has_prompted(4));
    }

    #[test]
    fn test_update_ignores_already_prompted_tab() {
        let mut coordinator = PromptCoordinator::new();
        let tab = web_tab(4, "https://example.com/");
        coordinator.on_updated(4, &complete(), &tab, &classifier());

        assert_eq!(coordinator.on_updated(4, &complete(), &tab, &classifier()), None);
    }

    #[test]
    fn test_update_skips_ineligible_urls() {
        let mut coordinator = PromptCoordinator::new();

        let settings = web_tab(5, "chrome://settings/");
        assert_eq!(coordinator.on_updated(5, &complete(), &settings, &classifier()), None);

        let bare = TabSnapshot {
            id: Some(6),
            ..Default::default()
        };
        assert_eq!(coordinator.on_updated(6, &complete(), &bare, &classifier()), None);
    }

    #[test]
    fn test_race_between_update_and_recheck_yields_one_prompt() {
        let mut coordinator = PromptCoordinator::new();
        let c = classifier();

        // Creation schedules the re-check.
        let outcome = coordinator.on_created(&pending_tab(7, "https://example.com/"), &c);
        assert_eq!(outcome, CreatedOutcome::Recheck { tab_id: 7 });

        // The load completes before the re-check fires.
        let settled = web_tab(7, "https://example.com/");
        let mut requests = 0;
        if coordinator.on_updated(7, &complete(), &settled, &c).is_some() {
            requests += 1;
        }
        if coordinator.on_recheck(7, Some(&settled), &c).is_some() {
            requests += 1;
        }

        assert_eq!(requests, 1);
        assert!(coordinator.has_prompted(7));
        assert!(!coordinator.pending.contains(&7));
    }

    #[test]
    fn test_removal_releases_id_for_reuse() {
        let mut coordinator = PromptCoordinator::new();
        let c = classifier();
        let tab = web_tab(8, "https://example.com/");
        coordinator.on_updated(8, &complete(), &tab, &c);
        assert!(coordinator.has_prompted(8));

        coordinator.on_removed(8);
        assert!(!coordinator.has_prompted(8));

        // The host reuses the id for a brand-new tab.
        let outcome = coordinator.on_created(&pending_tab(8, "https://other.example/"), &c);
        assert_eq!(outcome, CreatedOutcome::Recheck { tab_id: 8 });
        let request = coordinator.on_recheck(8, Some(&web_tab(8, "https://other.example/")), &c);
        assert_eq!(request, Some(PromptRequest { tab_id: 8 }));
    }

    #[test]
    fn test_removal_forgets_most_recent_tab() {
        let mut coordinator = PromptCoordinator::new();
        coordinator.on_created(&pending_tab(9, "https://example.com/"), &classifier());

        coordinator.on_removed(9);

        assert_eq!(coordinator.most_recent_tab(), None);
    }

    #[test]
    fn test_created_ignores_already_prompted_id() {
        let mut coordinator = PromptCoordinator::new();
        let c = classifier();
        coordinator.on_updated(10, &complete(), &web_tab(10, "https://example.com/"), &c);

        let outcome = coordinator.on_created(&pending_tab(10, "https://example.com/next"), &c);

        assert_eq!(outcome, CreatedOutcome::Ignore);
    }

    #[test]
    fn test_resolve_prefers_active_tab() {
        let coordinator = PromptCoordinator::new();
        let active = web_tab(11, "https://example.com/");

        let resolved = coordinator.resolve_current_tab(Some(&active), &classifier());

        assert_eq!(resolved, Ok(active));
    }

    #[test]
    fn test_resolve_returns_dashboard_as_is() {
        let coordinator = PromptCoordinator::new();
        let dashboard = web_tab(12, classifier().dashboard_url());

        let resolved = coordinator.resolve_current_tab(Some(&dashboard), &classifier());

        assert_eq!(resolved, Ok(dashboard));
    }

    #[test]
    fn test_resolve_refuses_prompt_surface() {
        let coordinator = PromptCoordinator::new();
        let popup = web_tab(13, &format!("{}popup/popup.html?tabId=2", BASE));

        assert!(coordinator.resolve_current_tab(Some(&popup), &classifier()).is_err());
    }

    #[test]
    fn test_resolve_falls_back_to_most_recent() {
        let mut coordinator = PromptCoordinator::new();
        let recent = pending_tab(14, "https://example.com/");
        coordinator.on_created(&recent, &classifier());

        let resolved = coordinator.resolve_current_tab(None, &classifier());

        assert_eq!(resolved, Ok(recent));
    }

    #[test]
    fn test_resolve_with_nothing_available() {
        let coordinator = PromptCoordinator::new();

        assert!(coordinator.resolve_current_tab(None, &classifier()).is_err());
    }

    #[test]
    fn test_prompt_window_spec_is_centered() {
        let spec = prompt_window_spec(21, 1920, 1080);

        assert_eq!(spec.url, "popup/popup.html?tabId=21&autoTrigger=true");
        assert_eq!(spec.kind, "popup");
        assert_eq!(spec.width, PROMPT_WIDTH);
        assert_eq!(spec.height, PROMPT_HEIGHT);
        assert_eq!(spec.left, 760);
        assert_eq!(spec.top, 400);
        assert!(spec.focused);
    }
}
