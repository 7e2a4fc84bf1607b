//! Persisted intent records and the operations the extension applies
//! to them. The store is the source of truth for the recorded session;
//! live browser tabs are only ever consulted, never trusted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::tab_data::TabId;

/// Key holding the whole record list in host local storage.
pub const STORAGE_KEY: &str = "tabData";

/// One tab's recorded intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabIntentRecord {
    pub id: TabId,
    pub url: String,
    pub intent: String,
    /// Milliseconds since the Unix epoch, host clock.
    pub timestamp: i64,
}

impl TabIntentRecord {
    pub fn new(id: TabId, url: String, intent: String, timestamp: i64) -> TabIntentRecord {
        TabIntentRecord {
            id,
            url,
            intent,
            timestamp,
        }
    }
}

/// The recorded session: an ordered list of records, at most one per tab
/// id, persisted as a bare JSON array under [`STORAGE_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabStore {
    records: Vec<TabIntentRecord>,
}

impl TabStore {
    pub fn new() -> Self {
        TabStore {
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[TabIntentRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: TabId) -> Option<&TabIntentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Inserts or replaces the record for `record.id`. A replacement keeps
    /// the record's position so group ordering stays stable across repeat
    /// saves. Returns true if an existing record was replaced.
    pub fn upsert(&mut self, record: TabIntentRecord) -> bool {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record;
                true
            }
            None => {
                self.records.push(record);
                false
            }
        }
    }

    /// Rewrites the intent on every record currently labeled `old`.
    /// Returns how many records changed; 0 (and no mutation at all) when
    /// the new name is empty or equal to the old one.
    pub fn rename_intent(&mut self, old: &str, new: &str) -> usize {
        if new.is_empty() || new == old {
            return 0;
        }
        let mut renamed = 0;
        for record in self.records.iter_mut().filter(|r| r.intent == old) {
            record.intent = new.to_string();
            renamed += 1;
        }
        renamed
    }

    /// Drops every record whose id is in `ids`, returning how many were
    /// removed. Ids with no matching record are ignored.
    pub fn remove_ids(&mut self, ids: &HashSet<TabId>) -> usize {
        let original_len = self.records.len();
        self.records.retain(|r| !ids.contains(&r.id));
        original_len - self.records.len()
    }
}
