use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use log::warn;
use serde::{Serialize, de::DeserializeOwned};

use crate::store::schema::{ProgressCacheData, TrainingQueueData};

const TRAINING_QUEUE_FILE: &str = "training_queue.json";
const PROGRESS_CACHE_FILE: &str = "progress_cache.json";

pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(Self::default_dir())
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexiread")
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Missing and unreadable files both load as `T::default()`.
    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.file_path(name);
        if !path.exists() {
            return T::default();
        }
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("{name} could not be parsed, starting fresh: {e}");
                T::default()
            }),
            Err(e) => {
                warn!("{name} could not be read: {e}");
                T::default()
            }
        }
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn load_training_queue(&self) -> TrainingQueueData {
        let data: TrainingQueueData = self.load(TRAINING_QUEUE_FILE);
        if data.needs_reset() {
            warn!(
                "training queue schema {} is stale, starting empty",
                data.schema_version
            );
            return TrainingQueueData::default();
        }
        data
    }

    pub fn save_training_queue(&self, data: &TrainingQueueData) -> Result<()> {
        self.save(TRAINING_QUEUE_FILE, data)
    }

    pub fn load_progress_cache(&self) -> ProgressCacheData {
        self.load(PROGRESS_CACHE_FILE)
    }

    pub fn save_progress_cache(&self, data: &ProgressCacheData) -> Result<()> {
        self.save(PROGRESS_CACHE_FILE, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress_index::ProgressRecord;
    use crate::session::training::TrainingWord;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_files_load_defaults() {
        let (_dir, store) = make_test_store();
        assert!(store.load_training_queue().queue.is_empty());
        assert!(store.load_progress_cache().records.is_empty());
    }

    #[test]
    fn test_training_queue_persists() {
        let (_dir, store) = make_test_store();
        let mut data = TrainingQueueData::default();
        data.queue.add_words([TrainingWord {
            id: 4,
            word: "Baum".to_string(),
            translation: "tree".to_string(),
        }]);
        store.save_training_queue(&data).unwrap();

        let loaded = store.load_training_queue();
        assert_eq!(loaded, data);
        assert!(!store.file_path("training_queue.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_loads_default() {
        let (_dir, store) = make_test_store();
        fs::write(store.file_path(TRAINING_QUEUE_FILE), "{ not json").unwrap();
        assert!(store.load_training_queue().queue.is_empty());
    }

    #[test]
    fn test_stale_schema_is_reset() {
        let (_dir, store) = make_test_store();
        fs::write(
            store.file_path(TRAINING_QUEUE_FILE),
            r#"{"schema_version": 0, "queue": {"words": [{"id": 1, "word": "a", "translation": "b"}]}}"#,
        )
        .unwrap();
        assert!(store.load_training_queue().queue.is_empty());
    }

    #[test]
    fn test_progress_cache_is_scoped_to_dictionary() {
        let (_dir, store) = make_test_store();
        let record = ProgressRecord {
            id: 1,
            word: "Baum".to_string(),
            progress: 4,
            highlight_disabled: false,
            count: 2,
            translation: String::new(),
        };
        store
            .save_progress_cache(&ProgressCacheData::new(3, vec![record.clone()]))
            .unwrap();

        assert_eq!(store.load_progress_cache().records_for(3), vec![record]);
        assert!(store.load_progress_cache().records_for(4).is_empty());
    }
}
