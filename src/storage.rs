// ABOUTME: Output-file writing and the persisted sync ledger
// ABOUTME: Ledger maps page id → last-seen edit time + local path for change detection

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = ".sync-state.json";

/// Ledger entry: what we knew about a page at its last successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub last_edited_time: String,
    pub local_path: String,
}

pub type SyncState = HashMap<String, PageState>;

pub fn state_path(output_dir: &Path) -> PathBuf {
    output_dir.join(STATE_FILE)
}

/// Load the ledger. Missing, corrupt, or non-object payloads all yield an
/// empty mapping; a broken ledger only costs redundant re-writes.
pub fn load_state(output_dir: &Path) -> SyncState {
    let Ok(raw) = fs::read_to_string(state_path(output_dir)) else {
        return SyncState::new();
    };
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(id, value)| {
                serde_json::from_value::<PageState>(value)
                    .ok()
                    .map(|entry| (id, entry))
            })
            .collect(),
        _ => SyncState::new(),
    }
}

/// Persist the whole ledger in one overwrite.
pub fn save_state(output_dir: &Path, state: &SyncState) -> Result<()> {
    let raw = serde_json::to_string_pretty(state)?;
    fs::write(state_path(output_dir), raw)?;
    Ok(())
}

/// A page has changed when it is absent from the ledger or its recorded
/// edit time differs (exact string comparison, not semantic time).
pub fn is_page_changed(state: &SyncState, page_id: &str, last_edited_time: &str) -> bool {
    match state.get(page_id) {
        Some(entry) => entry.last_edited_time != last_edited_time,
        None => true,
    }
}

pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Write a document, creating parent directories as needed. Existing files
/// are overwritten; writes are idempotent.
pub async fn write_markdown(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(time: &str, path: &str) -> PageState {
        PageState {
            last_edited_time: time.into(),
            local_path: path.into(),
        }
    }

    #[test]
    fn test_state_roundtrip() {
        let temp = TempDir::new().unwrap();
        let mut state = SyncState::new();
        state.insert("p1".into(), entry("2024-01-01T00:00:00.000Z", "/out/a.md"));
        state.insert("p2".into(), entry("2024-01-02T00:00:00.000Z", "/out/b.md"));

        save_state(temp.path(), &state).unwrap();
        let loaded = load_state(temp.path());
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_load_state_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(load_state(temp.path()).is_empty());
    }

    #[test]
    fn test_load_state_corrupt_json() {
        let temp = TempDir::new().unwrap();
        fs::write(state_path(temp.path()), "{not json").unwrap();
        assert!(load_state(temp.path()).is_empty());
    }

    #[test]
    fn test_load_state_non_object() {
        let temp = TempDir::new().unwrap();
        fs::write(state_path(temp.path()), "[1, 2, 3]").unwrap();
        assert!(load_state(temp.path()).is_empty());

        fs::write(state_path(temp.path()), "\"just a string\"").unwrap();
        assert!(load_state(temp.path()).is_empty());
    }

    #[test]
    fn test_is_page_changed() {
        let mut state = SyncState::new();
        state.insert("p1".into(), entry("2024-01-01T00:00:00.000Z", "/out/a.md"));

        // Absent id → changed
        assert!(is_page_changed(&state, "missing", "2024-01-01T00:00:00.000Z"));
        // Equal timestamp → unchanged
        assert!(!is_page_changed(&state, "p1", "2024-01-01T00:00:00.000Z"));
        // Any differing string → changed
        assert!(is_page_changed(&state, "p1", "2024-01-01T00:00:01.000Z"));
    }

    #[tokio::test]
    async fn test_write_markdown_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("deep").join("note.md");

        write_markdown(&path, "# Hello").await.unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Hello");

        // Overwrite is silent
        write_markdown(&path, "# Updated").await.unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Updated");
    }
}
