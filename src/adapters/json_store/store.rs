//! File-backed JSON store.
//!
//! One JSON document per collection under a single data directory. Every
//! collection has its own async mutex so that a load-mutate-save sequence is
//! serialized against other writers of the same file. Corrupt documents are
//! copied to `<backup_dir>/corrupt-YYYYmmdd-HHMMSS.mmm/` and reset to an empty
//! document instead of failing the caller.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::{json, Value};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ReconciliationState, Remarks, ScoreHistory, Settings, StorageConfig, Student,
};

/// File names of the persisted collections.
pub const STUDENTS_FILE: &str = "students.json";
pub const STATE_FILE: &str = "state.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const REMARKS_FILE: &str = "remarks.json";
pub const SCORE_HISTORY_FILE: &str = "score_history.json";

/// A collection persisted as one JSON document.
pub trait Collection: Default + Send + Sized {
    /// File name under the data directory.
    const FILE_NAME: &'static str;

    /// Decode a parsed document.
    ///
    /// Returns `None` when the document has an unusable shape, otherwise the
    /// value and whether the on-disk form should be rewritten.
    fn decode(raw: Value) -> Option<(Self, bool)>;

    /// Encode for persistence.
    fn encode(&self) -> DomainResult<Value>;

    /// The lock guarding this collection.
    fn lock(store: &JsonStore) -> &Mutex<()>;
}

impl Collection for Vec<Student> {
    const FILE_NAME: &'static str = STUDENTS_FILE;

    /// Accepts `{"students": [...]}` or a bare list. Records are normalized
    /// one by one; non-object records are dropped.
    fn decode(raw: Value) -> Option<(Self, bool)> {
        let items = match raw {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("students") {
                Some(Value::Array(items)) => items,
                _ => return None,
            },
            _ => return None,
        };

        let mut changed = false;
        let mut students = Vec::with_capacity(items.len());
        for item in &items {
            match Student::from_raw(item) {
                Some((student, record_changed)) => {
                    changed |= record_changed;
                    students.push(student);
                }
                None => changed = true,
            }
        }
        Some((students, changed))
    }

    fn encode(&self) -> DomainResult<Value> {
        Ok(json!({ "students": self }))
    }

    fn lock(store: &JsonStore) -> &Mutex<()> {
        &store.students_lock
    }
}

impl Collection for ReconciliationState {
    const FILE_NAME: &'static str = STATE_FILE;

    fn decode(raw: Value) -> Option<(Self, bool)> {
        serde_json::from_value(raw).ok().map(|state| (state, false))
    }

    fn encode(&self) -> DomainResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn lock(store: &JsonStore) -> &Mutex<()> {
        &store.state_lock
    }
}

impl Collection for Settings {
    const FILE_NAME: &'static str = SETTINGS_FILE;

    /// Settings never fail to decode; any shape normalizes to valid values.
    fn decode(raw: Value) -> Option<(Self, bool)> {
        Some((Self::normalize(&raw), false))
    }

    fn encode(&self) -> DomainResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn lock(store: &JsonStore) -> &Mutex<()> {
        &store.settings_lock
    }
}

impl Collection for Remarks {
    const FILE_NAME: &'static str = REMARKS_FILE;

    fn decode(raw: Value) -> Option<(Self, bool)> {
        serde_json::from_value(raw).ok().map(|remarks| (remarks, false))
    }

    fn encode(&self) -> DomainResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn lock(store: &JsonStore) -> &Mutex<()> {
        &store.remarks_lock
    }
}

impl Collection for ScoreHistory {
    const FILE_NAME: &'static str = SCORE_HISTORY_FILE;

    fn decode(raw: Value) -> Option<(Self, bool)> {
        serde_json::from_value(raw).ok().map(|history| (history, false))
    }

    fn encode(&self) -> DomainResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn lock(store: &JsonStore) -> &Mutex<()> {
        &store.history_lock
    }
}

/// JSON-file persistence for every collection.
#[derive(Debug)]
pub struct JsonStore {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    students_lock: Mutex<()>,
    state_lock: Mutex<()>,
    settings_lock: Mutex<()>,
    remarks_lock: Mutex<()>,
    history_lock: Mutex<()>,
}

impl JsonStore {
    /// Create a store rooted at `data_dir`. Nothing touches disk until the
    /// first save.
    pub fn new(data_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backup_dir: backup_dir.into(),
            students_lock: Mutex::new(()),
            state_lock: Mutex::new(()),
            settings_lock: Mutex::new(()),
            remarks_lock: Mutex::new(()),
            history_lock: Mutex::new(()),
        }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.data_dir, &config.backup_dir)
    }

    /// Directory holding the collection files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of a collection file.
    pub fn path_of<C: Collection>(&self) -> PathBuf {
        self.data_dir.join(C::FILE_NAME)
    }

    /// Load a collection.
    pub async fn load<C: Collection>(&self) -> DomainResult<C> {
        let _guard = C::lock(self).lock().await;
        self.read::<C>().await
    }

    /// Replace a collection.
    pub async fn save<C: Collection>(&self, value: &C) -> DomainResult<()> {
        let _guard = C::lock(self).lock().await;
        self.write(value).await
    }

    /// Load, mutate and save a collection while holding its lock.
    ///
    /// Nothing is written when `mutate` fails.
    pub async fn update<C, T, F>(&self, mutate: F) -> DomainResult<T>
    where
        C: Collection,
        F: FnOnce(&mut C) -> DomainResult<T> + Send,
    {
        let _guard = C::lock(self).lock().await;
        let mut value = self.read::<C>().await?;
        let result = mutate(&mut value)?;
        self.write(&value).await?;
        Ok(result)
    }

    /// Like [`update`](Self::update), but only writes when `mutate` reports
    /// a change. Returns that report.
    pub async fn update_if_changed<C, F>(&self, mutate: F) -> DomainResult<bool>
    where
        C: Collection,
        F: FnOnce(&mut C) -> bool + Send,
    {
        let _guard = C::lock(self).lock().await;
        let mut value = self.read::<C>().await?;
        let changed = mutate(&mut value);
        if changed {
            self.write(&value).await?;
        }
        Ok(changed)
    }

    /// Load the roster, normalizing and rewriting legacy records.
    pub async fn load_students(&self) -> DomainResult<Vec<Student>> {
        self.load().await
    }

    pub async fn save_students(&self, students: &[Student]) -> DomainResult<()> {
        self.save(&students.to_vec()).await
    }

    pub async fn load_state(&self) -> DomainResult<ReconciliationState> {
        self.load().await
    }

    pub async fn save_state(&self, state: &ReconciliationState) -> DomainResult<()> {
        self.save(state).await
    }

    pub async fn load_settings(&self) -> DomainResult<Settings> {
        self.load().await
    }

    /// Normalize and persist settings, returning what was stored.
    pub async fn save_settings(&self, raw: &Value) -> DomainResult<Settings> {
        let settings = Settings::normalize(raw);
        self.save(&settings).await?;
        Ok(settings)
    }

    pub async fn load_remarks(&self) -> DomainResult<Remarks> {
        self.load().await
    }

    pub async fn load_score_history(&self) -> DomainResult<ScoreHistory> {
        self.load().await
    }

    async fn read<C: Collection>(&self) -> DomainResult<C> {
        let path = self.path_of::<C>();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(C::default()),
            Err(e) => {
                return Err(DomainError::StorageError(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let parsed = match serde_json::from_slice::<Value>(&bytes) {
            Ok(raw) => C::decode(raw),
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "corrupt JSON document");
                None
            }
        };

        match parsed {
            Some((value, changed)) => {
                if changed {
                    tracing::info!(file = C::FILE_NAME, "rewriting normalized document");
                    self.write(&value).await?;
                }
                Ok(value)
            }
            None => {
                self.quarantine::<C>(&path).await;
                Ok(C::default())
            }
        }
    }

    async fn write<C: Collection>(&self, value: &C) -> DomainResult<()> {
        let path = self.path_of::<C>();
        let content = serde_json::to_vec_pretty(&value.encode()?)?;
        atomic_write(&path, &content).await
    }

    /// Copy a corrupt file aside and reset it to an empty document.
    ///
    /// When the backup cannot be taken the original file is left untouched.
    async fn quarantine<C: Collection>(&self, path: &Path) {
        let stamp = Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
        let backed_up = async {
            let target = self.free_backup_target::<C>(&stamp).await?;
            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir).await?;
            }
            fs::copy(path, &target).await.map(|_| target)
        }
        .await;
        let target = match backed_up {
            Ok(target) => target,
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "failed to back up corrupt document");
                return;
            }
        };
        tracing::error!(
            file = %path.display(),
            backup = %target.display(),
            "quarantined corrupt document"
        );

        if let Err(e) = self.write(&C::default()).await {
            tracing::error!(file = %path.display(), error = %e, "failed to reset corrupt document");
        }
    }

    /// First `corrupt-<stamp>[-n]/<file>` path that does not exist yet.
    async fn free_backup_target<C: Collection>(&self, stamp: &str) -> std::io::Result<PathBuf> {
        let mut suffix = 0u32;
        loop {
            let dir = match suffix {
                0 => format!("corrupt-{stamp}"),
                n => format!("corrupt-{stamp}-{n}"),
            };
            let target = self.backup_dir.join(dir).join(C::FILE_NAME);
            if !fs::try_exists(&target).await? {
                return Ok(target);
            }
            suffix += 1;
        }
    }
}

/// Write via a sibling temp file and rename, creating the parent directory.
async fn atomic_write(path: &Path, content: &[u8]) -> DomainResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            DomainError::StorageError(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)
        .await
        .map_err(|e| DomainError::StorageError(format!("Failed to write temp file: {e}")))?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|e| DomainError::StorageError(format!("Failed to rename temp file: {e}")))?;
    Ok(())
}
