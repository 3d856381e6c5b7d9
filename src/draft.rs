//! 入力途中のフォームの保存先
//!
//! キーは `fleet-form-{operation}-{idFrota}`。値はシリアライズ済みの下書き（中身は見ない）。
//! 読み込みに失敗した下書きは捨てて新規扱いにする。

use crate::error::Result;
use fleet_checkin_common::FormDraft;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// キー・値ストア（get / set / clear）
pub trait DraftStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, blob: &str) -> Result<()>;

    /// 削除。存在した場合は true
    fn clear(&mut self, key: &str) -> Result<bool>;
}

/// 下書きを読み込む（なし・破損は None）
pub fn load_draft<S: DraftStore + ?Sized>(store: &S, key: &str) -> Option<FormDraft> {
    let blob = store.get(key)?;
    match serde_json::from_str(&blob) {
        Ok(draft) => Some(draft),
        Err(e) => {
            log::warn!("下書き {} を読めないため破棄: {}", key, e);
            None
        }
    }
}

pub fn save_draft<S: DraftStore + ?Sized>(store: &mut S, key: &str, draft: &FormDraft) -> Result<()> {
    let blob = serde_json::to_string(draft)?;
    store.set(key, &blob)
}

/// ファイル保存（キーのSHA-256をファイル名にする）
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

impl DraftStore for FileDraftStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), blob)?;
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// メモリ上のストア（テスト・一時利用）
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    entries: HashMap<String, String>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DraftStore for MemoryDraftStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<()> {
        self.entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryDraftStore::new();
        let mut draft = FormDraft::for_driver("Ana");
        draft.set_km("1200");
        save_draft(&mut store, "k", &draft).unwrap();
        assert_eq!(load_draft(&store, "k"), Some(draft));
        assert!(store.clear("k").unwrap());
        assert!(!store.clear("k").unwrap());
        assert_eq!(load_draft(&store, "k"), None);
    }

    #[test]
    fn test_corrupt_blob_is_ignored() {
        let mut store = MemoryDraftStore::new();
        store.set("k", "{not json").unwrap();
        assert_eq!(load_draft(&store, "k"), None);
    }

    #[test]
    fn test_file_name_is_hashed() {
        let store = FileDraftStore::new("/tmp/drafts");
        let path = store.path_for("fleet-form-checkin-../../etc");
        assert_eq!(path.parent(), Some(Path::new("/tmp/drafts")));
        assert_eq!(path.file_name().unwrap().len(), 64 + 5);
    }
}
