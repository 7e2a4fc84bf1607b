//! Read-side operations behind the dashboard: grouping, statistics,
//! export. Everything here is pure over a slice of records.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::classifier::extract_hostname;
use crate::store::TabIntentRecord;
use crate::tab_data::TabId;

/// Group label for records saved with an empty intent.
pub const NO_INTENT_LABEL: &str = "No Intent";

/// Name stamped into exported session documents.
pub const EXPORT_NAME: &str = "TabSage Session Export";

fn record_label(record: &TabIntentRecord) -> &str {
    if record.intent.is_empty() {
        NO_INTENT_LABEL
    } else {
        &record.intent
    }
}

/// Buckets records by intent. Records with an empty intent fall into
/// [`NO_INTENT_LABEL`]. Within a group the store's insertion order is
/// preserved.
pub fn group_by_intent(records: &[TabIntentRecord]) -> HashMap<String, Vec<TabIntentRecord>> {
    let mut groups: HashMap<String, Vec<TabIntentRecord>> = HashMap::new();

    for record in records {
        groups
            .entry(record_label(record).to_string())
            .or_default()
            .push(record.clone());
    }

    groups
}

/// Group names in a stable presentation order.
pub fn sorted_group_names(groups: &HashMap<String, Vec<TabIntentRecord>>) -> Vec<String> {
    let mut names: Vec<String> = groups.keys().cloned().collect();
    names.sort();
    names
}

/// Ids of every record displayed under `label`; close-group operates on
/// this list. Passing [`NO_INTENT_LABEL`] returns the empty-intent records
/// along with any saved under that literal label.
pub fn group_tab_ids(records: &[TabIntentRecord], label: &str) -> Vec<TabId> {
    records
        .iter()
        .filter(|r| record_label(r) == label)
        .map(|r| r.id)
        .collect()
}

/// Header numbers for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    pub tab_count: usize,
    pub group_count: usize,
    /// Oldest record timestamp, i.e. when this session started recording.
    pub session_start: Option<i64>,
}

pub fn session_stats(records: &[TabIntentRecord]) -> SessionStats {
    let mut labels: HashSet<&str> = HashSet::new();
    for record in records {
        labels.insert(record_label(record));
    }

    SessionStats {
        tab_count: records.len(),
        group_count: labels.len(),
        session_start: records.iter().map(|r| r.timestamp).min(),
    }
}

/// Self-describing export document offered for download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub name: String,
    /// ISO-8601 export time.
    pub date: String,
    pub tab_count: usize,
    pub tabs: Vec<TabIntentRecord>,
}

/// Builds the export payload, or `None` when there is nothing to export;
/// the dashboard shows a notice instead of downloading an empty file.
pub fn export_session(records: &[TabIntentRecord], date_iso: &str) -> Option<SessionExport> {
    if records.is_empty() {
        return None;
    }
    Some(SessionExport {
        name: EXPORT_NAME.to_string(),
        date: date_iso.to_string(),
        tab_count: records.len(),
        tabs: records.to_vec(),
    })
}

/// Download filename for an export made on `date_ymd` (YYYY-MM-DD).
pub fn export_filename(date_ymd: &str) -> String {
    format!("tabsage-session-{}.json", date_ymd)
}

/// Favicon address for a recorded URL, falling back to the bundled icon
/// when the URL has no parseable host.
pub fn favicon_url(url: &str) -> String {
    match extract_hostname(url) {
        Some(host) => format!("https://www.google.com/s2/favicons?domain={}&sz=32", host),
        None => "../icons/icon_32.png".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: TabId, intent: &str, timestamp: i64) -> TabIntentRecord {
        TabIntentRecord {
            id,
            url: format!("https://example.com/{}", id),
            intent: intent.to_string(),
            timestamp,
        }
    }

    #[test]
    fn test_group_by_intent() {
        let records = vec![
            record(1, "Research", 100),
            record(2, "Shopping", 200),
            record(3, "Research", 300),
        ];

        let groups = group_by_intent(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups["Research"].len(), 2);
        assert_eq!(groups["Shopping"].len(), 1);
        assert_eq!(groups["Research"][0].id, 1);
        assert_eq!(groups["Research"][1].id, 3);
    }

    #[test]
    fn test_empty_intent_falls_into_default_group() {
        let records = vec![record(1, "", 100), record(2, "Work", 200)];

        let groups = group_by_intent(&records);

        assert_eq!(groups[NO_INTENT_LABEL].len(), 1);
        assert_eq!(groups[NO_INTENT_LABEL][0].id, 1);
    }

    #[test]
    fn test_grouping_partitions_records() {
        let records = vec![
            record(1, "Research", 100),
            record(2, "", 200),
            record(3, "Shopping", 300),
            record(4, "Research", 400),
        ];

        let groups = group_by_intent(&records);
        let total: usize = groups.values().map(|g| g.len()).sum();

        assert_eq!(total, records.len());
    }

    #[test]
    fn test_sorted_group_names() {
        let records = vec![
            record(1, "Work", 100),
            record(2, "Entertainment", 200),
            record(3, "Research", 300),
        ];

        let names = sorted_group_names(&group_by_intent(&records));

        assert_eq!(names, vec!["Entertainment", "Research", "Work"]);
    }

    #[test]
    fn test_group_tab_ids() {
        let records = vec![
            record(1, "Research", 100),
            record(2, "Shopping", 200),
            record(3, "Research", 300),
        ];

        assert_eq!(group_tab_ids(&records, "Research"), vec![1, 3]);
        assert_eq!(group_tab_ids(&records, "Shopping"), vec![2]);
        assert!(group_tab_ids(&records, "Gardening").is_empty());
    }

    #[test]
    fn test_group_tab_ids_covers_default_group() {
        let records = vec![
            record(1, "", 100),
            record(2, "Work", 200),
            record(3, NO_INTENT_LABEL, 300),
        ];

        assert_eq!(group_tab_ids(&records, NO_INTENT_LABEL), vec![1, 3]);
    }

    #[test]
    fn test_rename_merges_groups() {
        use crate::store::TabStore;

        let mut store = TabStore::new();
        store.upsert(record(1, "Research", 100));
        store.upsert(record(2, "Work", 200));
        store.upsert(record(3, "Research", 300));

        assert_eq!(store.rename_intent("Research", "Work"), 2);

        let groups = group_by_intent(store.records());
        assert!(!groups.contains_key("Research"));
        assert_eq!(groups["Work"].len(), 3);
    }

    #[test]
    fn test_session_stats() {
        let records = vec![
            record(1, "Research", 300),
            record(2, "Shopping", 100),
            record(3, "Research", 200),
        ];

        let stats = session_stats(&records);

        assert_eq!(stats.tab_count, 3);
        assert_eq!(stats.group_count, 2);
        assert_eq!(stats.session_start, Some(100));
    }

    #[test]
    fn test_session_stats_empty() {
        let stats = session_stats(&[]);

        assert_eq!(stats.tab_count, 0);
        assert_eq!(stats.group_count, 0);
        assert_eq!(stats.session_start, None);
    }

    #[test]
    fn test_export_session_carries_records_verbatim() {
        let records = vec![record(1, "Research", 100), record(2, "", 200)];

        let export = export_session(&records, "2024-11-02T10:30:00.000Z").unwrap();

        assert_eq!(export.name, EXPORT_NAME);
        assert_eq!(export.date, "2024-11-02T10:30:00.000Z");
        assert_eq!(export.tab_count, 2);
        assert_eq!(export.tabs, records);
    }

    #[test]
    fn test_export_session_refuses_empty() {
        assert!(export_session(&[], "2024-11-02T10:30:00.000Z").is_none());
    }

    #[test]
    fn test_export_json_field_names() {
        let export = export_session(&[record(1, "Work", 100)], "2024-11-02T10:30:00.000Z").unwrap();

        let json = serde_json::to_string(&export).unwrap();

        assert!(json.contains(r#""name":"TabSage Session Export""#));
        assert!(json.contains(r#""tabCount":1"#));
        assert!(json.contains(r#""tabs":["#));
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename("2024-11-02"), "tabsage-session-2024-11-02.json");
    }

    #[test]
    fn test_favicon_url() {
        assert_eq!(
            favicon_url("https://www.rust-lang.org/learn"),
            "https://www.google.com/s2/favicons?domain=www.rust-lang.org&sz=32"
        );
        assert_eq!(favicon_url("about:blank"), "../icons/icon_32.png");
    }
}
