//! Local brief history keyed by opaque ids
//!
//! Stores are best-effort caches: reads of a missing or corrupt document see an
//! empty history, and failed writes are logged and dropped.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::brief::Brief;

pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBrief {
    pub id: String,
    pub saved_at: DateTime<Utc>,
    pub brief: Brief,
}

/// On-disk shape. `entries` is in insertion order; `retired` holds removed ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<StoredBrief>,
    #[serde(default)]
    pub retired: Vec<String>,
}

impl StoreDocument {
    fn is_taken(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id) || self.retired.iter().any(|r| r == id)
    }

    fn get(&self, id: &str) -> Option<Brief> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.brief.clone())
    }

    fn insert(&mut self, id: &str, brief: Brief) -> bool {
        if self.is_taken(id) {
            return false;
        }
        self.entries.push(StoredBrief {
            id: id.to_string(),
            saved_at: Utc::now(),
            brief,
        });
        true
    }

    fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        if removed {
            self.retired.push(id.to_string());
        }
        removed
    }

    fn clear(&mut self) {
        let ids: Vec<String> = self.entries.drain(..).map(|e| e.id).collect();
        self.retired.extend(ids);
    }

    fn recent(&self) -> Vec<StoredBrief> {
        self.entries.iter().rev().cloned().collect()
    }
}

/// Keyed brief persistence. Implementations must never panic on I/O failure.
pub trait BriefStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Brief>;

    /// Insert under `id`. Returns false if the id is live or was ever removed.
    fn insert(&self, id: &str, brief: Brief) -> bool;

    /// Most recently added first.
    fn list(&self) -> Vec<StoredBrief>;

    fn remove(&self, id: &str) -> bool;

    fn clear(&self);

    /// Save under a freshly generated id and return it.
    fn save(&self, brief: Brief) -> String {
        loop {
            let id = generate_id();
            if self.insert(&id, brief.clone()) {
                debug!("saved brief {}", id);
                return id;
            }
        }
    }

    fn recent(&self, limit: usize) -> Vec<StoredBrief> {
        let mut items = self.list();
        items.truncate(limit);
        items
    }
}

/// Base36 milliseconds followed by 8 random hex characters.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", to_base36(millis), &random[..8])
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// In-process store, used by tests and when no path is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_doc<T>(&self, f: impl FnOnce(&mut StoreDocument) -> T) -> T {
        let mut guard = match self.doc.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl BriefStore for MemoryStore {
    fn get(&self, id: &str) -> Option<Brief> {
        self.with_doc(|d| d.get(id))
    }

    fn insert(&self, id: &str, brief: Brief) -> bool {
        self.with_doc(|d| d.insert(id, brief))
    }

    fn list(&self) -> Vec<StoredBrief> {
        self.with_doc(|d| d.recent())
    }

    fn remove(&self, id: &str) -> bool {
        self.with_doc(|d| d.remove(id))
    }

    fn clear(&self) {
        self.with_doc(|d| d.clear())
    }
}

/// Single JSON document on disk, rewritten whole on every mutation.
///
/// The read-modify-write is serialized within this process only; another
/// process writing the same file concurrently wins if it writes last.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreDocument {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoreDocument::default(),
            Err(e) => {
                warn!("brief store {} unreadable: {}", self.path.display(), e);
                return StoreDocument::default();
            }
        };
        match serde_json::from_str::<StoreDocument>(&content) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "brief store {} is corrupt, treating as empty: {}",
                    self.path.display(),
                    e
                );
                StoreDocument::default()
            }
        }
    }

    fn write(&self, doc: &mut StoreDocument) {
        doc.version = STORE_VERSION;
        if let Err(e) = self.try_write(doc) {
            warn!("brief store write to {} failed: {}", self.path.display(), e);
        }
    }

    fn try_write(&self, doc: &StoreDocument) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(doc).map_err(std::io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path).inspect_err(|_| {
            let _ = std::fs::remove_file(&tmp);
        })
    }

    fn read_only<T>(&self, f: impl FnOnce(&StoreDocument) -> T) -> T {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        f(&self.read())
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut StoreDocument) -> (T, bool)) -> T {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut doc = self.read();
        let (out, changed) = f(&mut doc);
        if changed {
            self.write(&mut doc);
        }
        out
    }
}

impl BriefStore for JsonFileStore {
    fn get(&self, id: &str) -> Option<Brief> {
        self.read_only(|d| d.get(id))
    }

    fn insert(&self, id: &str, brief: Brief) -> bool {
        self.mutate(|d| {
            let inserted = d.insert(id, brief);
            (inserted, inserted)
        })
    }

    fn list(&self) -> Vec<StoredBrief> {
        self.read_only(|d| d.recent())
    }

    fn remove(&self, id: &str) -> bool {
        self.mutate(|d| {
            let removed = d.remove(id);
            (removed, removed)
        })
    }

    fn clear(&self) {
        self.mutate(|d| {
            d.clear();
            ((), true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::{make_demo_brief, pad_with_unknown};

    fn brief(q: &str) -> Brief {
        make_demo_brief(q, "", &pad_with_unknown(vec![]))
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: std::collections::HashSet<String> = (0..500).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemoryStore::new();
        assert_eq!(store.get("xyz123"), None);

        let a = store.save(brief("first"));
        let b = store.save(brief("second"));
        assert_ne!(a, b);
        assert_eq!(store.get(&a).map(|b| b.query), Some("first".to_string()));

        let listed: Vec<String> = store.list().into_iter().map(|e| e.id).collect();
        assert_eq!(listed, vec![b.clone(), a.clone()]);
        assert_eq!(store.recent(1).len(), 1);

        assert!(store.remove(&a));
        assert!(!store.remove(&a));
        assert_eq!(store.get(&a), None);
        assert!(!store.insert(&a, brief("reuse")), "removed ids are never reused");

        store.clear();
        assert!(store.list().is_empty());
        assert!(!store.insert(&b, brief("reuse")));
    }
}
