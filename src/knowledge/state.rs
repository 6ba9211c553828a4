//! Extraction cursor state, persisted as a small JSON file.
//!
//! Saves go through a temp file and rename so a crash mid-write never leaves
//! a truncated state file behind.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    pub timestamp: String,
    pub nodes_processed: usize,
    pub edges_created: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionState {
    /// `created_at` of the newest node processed so far; nodes at or before
    /// this cursor are skipped on the next run.
    pub last_sync_timestamp: Option<String>,
    pub last_message_count: usize,
    pub total_syncs: usize,
    #[serde(default)]
    pub sync_history: Vec<SyncRecord>,
}

impl ExtractionState {
    /// Load state from disk; a missing file yields the default (full scan).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read extraction state {}", path.display()))?;
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("invalid extraction state {}", path.display()))?;
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Record one completed sync and advance the cursor.
    pub fn record_sync(
        &mut self,
        cursor: Option<String>,
        node_count: usize,
        nodes_processed: usize,
        edges_created: usize,
    ) {
        if cursor.is_some() {
            self.last_sync_timestamp = cursor;
        }
        self.last_message_count = node_count;
        self.total_syncs += 1;
        self.sync_history.push(SyncRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            nodes_processed,
            edges_created,
        });
        if self.sync_history.len() > HISTORY_LIMIT {
            let excess = self.sync_history.len() - HISTORY_LIMIT;
            self.sync_history.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = ExtractionState::load(&dir.path().join("state.json")).unwrap();
        assert!(state.last_sync_timestamp.is_none());
        assert_eq!(state.total_syncs, 0);
    }

    #[test]
    fn roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = ExtractionState::default();
        state.record_sync(Some("2025-03-01T00:00:00+00:00".into()), 12, 12, 4);
        state.save(&path).unwrap();

        let loaded = ExtractionState::load(&path).unwrap();
        assert_eq!(
            loaded.last_sync_timestamp.as_deref(),
            Some("2025-03-01T00:00:00+00:00")
        );
        assert_eq!(loaded.last_message_count, 12);
        assert_eq!(loaded.total_syncs, 1);
        assert_eq!(loaded.sync_history.len(), 1);
        assert_eq!(loaded.sync_history[0].edges_created, 4);
    }

    #[test]
    fn empty_sync_keeps_cursor() {
        let mut state = ExtractionState::default();
        state.record_sync(Some("2025-03-01T00:00:00+00:00".into()), 10, 10, 2);
        state.record_sync(None, 10, 0, 0);
        assert_eq!(
            state.last_sync_timestamp.as_deref(),
            Some("2025-03-01T00:00:00+00:00")
        );
        assert_eq!(state.total_syncs, 2);
    }

    #[test]
    fn history_is_bounded() {
        let mut state = ExtractionState::default();
        for i in 0..60 {
            state.record_sync(Some(format!("2025-01-01T00:00:{i:02}+00:00")), i, 1, 0);
        }
        assert_eq!(state.sync_history.len(), HISTORY_LIMIT);
        assert_eq!(state.total_syncs, 60);
    }
}
