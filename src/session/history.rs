use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::store::KeyValueStore;

/// 記録の保存キー
pub const SESSION_KEY: &str = "poseSessions";

/// 既定の記録閾値（これを超えた精度のみ記録）
pub const DEFAULT_MIN_ACCURACY: u8 = 80;

/// 確定したポーズ1件の記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub pose: String,
    pub accuracy: u8,
    pub time: String,
}

/// ポーズごとの集計
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseSummary {
    pub pose: String,
    pub count: usize,
    pub best_accuracy: u8,
}

/// 永続化されたセッション記録
///
/// 読み込み・書き込みの失敗はログに残して握りつぶす。
/// 壊れたデータは空の記録として扱う。
pub struct SessionHistory {
    store: Box<dyn KeyValueStore>,
    min_accuracy: u8,
}

impl SessionHistory {
    pub fn new(store: Box<dyn KeyValueStore>, min_accuracy: u8) -> Self {
        Self { store, min_accuracy }
    }

    fn read_entries(&self) -> Result<Vec<SessionEntry>> {
        let raw = match self.store.get(SESSION_KEY).context("Failed to read session log")? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::warn!("Session log is corrupted, treating as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn write_entries(&mut self, entries: &[SessionEntry]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        self.store
            .set(SESSION_KEY, &json)
            .context("Failed to write session log")
    }

    /// 精度が閾値を超えていれば記録し、記録できたら true
    pub fn append(&mut self, label: &str, accuracy: u8, timestamp: &str) -> bool {
        if accuracy <= self.min_accuracy {
            return false;
        }

        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Session entry dropped: {:#}", e);
                return false;
            }
        };
        entries.push(SessionEntry {
            pose: label.to_string(),
            accuracy,
            time: timestamp.to_string(),
        });

        match self.write_entries(&entries) {
            Ok(()) => {
                log::debug!("Recorded {} ({}%) at {}", label, accuracy, timestamp);
                true
            }
            Err(e) => {
                log::warn!("Session entry dropped: {:#}", e);
                false
            }
        }
    }

    /// 記録順の一覧
    pub fn list(&self) -> Vec<SessionEntry> {
        self.read_entries().unwrap_or_else(|e| {
            log::warn!("{:#}", e);
            Vec::new()
        })
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            log::warn!("Failed to clear session log: {:#}", e);
        }
    }

    /// ポーズごとの件数と最高精度（初出順）
    pub fn summary(&self) -> Vec<PoseSummary> {
        let mut out: Vec<PoseSummary> = Vec::new();
        for entry in self.list() {
            match out.iter_mut().find(|s| s.pose == entry.pose) {
                Some(s) => {
                    s.count += 1;
                    s.best_accuracy = s.best_accuracy.max(entry.accuracy);
                }
                None => out.push(PoseSummary {
                    pose: entry.pose,
                    count: 1,
                    best_accuracy: entry.accuracy,
                }),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::tests::temp_dir;
    use crate::session::store::{JsonFileStore, MemoryStore};

    /// 常に失敗するストア
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("storage unavailable")
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("storage unavailable")
        }
        fn remove(&mut self, _key: &str) -> Result<()> {
            anyhow::bail!("storage unavailable")
        }
    }

    fn history() -> SessionHistory {
        SessionHistory::new(Box::new(MemoryStore::new()), DEFAULT_MIN_ACCURACY)
    }

    #[test]
    fn test_append_high_accuracy() {
        let mut h = history();
        assert!(h.append("T-Pose", 85, "2026/10/18 09:00:00"));
        assert_eq!(
            h.list(),
            vec![SessionEntry {
                pose: "T-Pose".into(),
                accuracy: 85,
                time: "2026/10/18 09:00:00".into(),
            }]
        );
    }

    #[test]
    fn test_append_low_accuracy_dropped() {
        let mut h = history();
        assert!(!h.append("T-Pose", 60, "t"));
        assert!(!h.append("T-Pose", 80, "t"));
        assert!(h.list().is_empty());
    }

    #[test]
    fn test_insertion_order() {
        let mut h = history();
        h.append("Warrior II", 90, "t1");
        h.append("Tree Pose", 95, "t2");
        h.append("Warrior II", 82, "t3");
        let times: Vec<String> = h.list().into_iter().map(|e| e.time).collect();
        assert_eq!(times, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_clear() {
        let mut h = history();
        h.append("T-Pose", 85, "t");
        h.clear();
        assert!(h.list().is_empty());
    }

    #[test]
    fn test_serialized_layout() {
        let mut store = MemoryStore::new();
        store
            .set(SESSION_KEY, r#"[{"pose":"Tree Pose","accuracy":91,"time":"t0"}]"#)
            .unwrap();
        let mut h = SessionHistory::new(Box::new(store), DEFAULT_MIN_ACCURACY);
        h.append("T-Pose", 88, "t1");
        let entries = h.list();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].pose, "Tree Pose");
        assert_eq!(entries[1].accuracy, 88);
    }

    #[test]
    fn test_corrupted_data_reads_empty() {
        let mut store = MemoryStore::new();
        store.set(SESSION_KEY, "{not json").unwrap();
        let mut h = SessionHistory::new(Box::new(store), DEFAULT_MIN_ACCURACY);
        assert!(h.list().is_empty());
        // 壊れた記録は上書きされる
        assert!(h.append("T-Pose", 90, "t"));
        assert_eq!(h.list().len(), 1);
    }

    #[test]
    fn test_broken_store_fails_soft() {
        let mut h = SessionHistory::new(Box::new(BrokenStore), DEFAULT_MIN_ACCURACY);
        assert!(!h.append("T-Pose", 90, "t"));
        assert!(h.list().is_empty());
        h.clear();
        assert!(h.summary().is_empty());
    }

    #[test]
    fn test_summary() {
        let mut h = history();
        h.append("Warrior II", 90, "t1");
        h.append("Tree Pose", 95, "t2");
        h.append("Warrior II", 97, "t3");
        let summary = h.summary();
        assert_eq!(
            summary,
            vec![
                PoseSummary { pose: "Warrior II".into(), count: 2, best_accuracy: 97 },
                PoseSummary { pose: "Tree Pose".into(), count: 1, best_accuracy: 95 },
            ]
        );
    }

    #[test]
    fn test_survives_restart() {
        let dir = temp_dir("history_restart");
        {
            let mut h = SessionHistory::new(Box::new(JsonFileStore::new(&dir)), DEFAULT_MIN_ACCURACY);
            h.append("Tree Pose", 92, "t");
        }
        let h = SessionHistory::new(Box::new(JsonFileStore::new(&dir)), DEFAULT_MIN_ACCURACY);
        assert_eq!(h.list().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
