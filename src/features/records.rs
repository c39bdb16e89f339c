//! Records and the persistence boundary
//!
//! The editor never performs I/O itself. A [`RecordStore`] fetches and saves
//! records; [`RecordEditor`] pairs one record with an [`EditorController`]
//! and runs saves in two phases so that at most one save is outstanding:
//!
//! ```text
//! begin_save() -> PendingSave ──(caller talks to the store)──> finish_save(pending, response)
//! ```
//!
//! Implementations:
//! - `MemoryRecordStore`: in-memory storage (testing, WASM, CLI sessions)

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::core::controller::{EditorController, EditorOptions};
use crate::utils::error::{EditorError, EditorResult, StoreError};

/// A stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub file_name: String,
    /// File name without its extension
    pub original_title: String,
    pub file_type: String,
    /// Table markup
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Data for a record created from an uploaded source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub file_name: String,
    pub file_type: String,
    pub content: String,
}

impl NewRecord {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let file_type = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        Self {
            file_name,
            file_type,
            content: content.into(),
        }
    }
}

/// Strip the last extension, unless the only dot is a leading one
pub fn title_of(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

/// Trait for fetching and persisting records
pub trait RecordStore: Send + Sync {
    /// Read one record
    fn fetch_record(&self, id: &str) -> Result<Record, StoreError>;

    /// Replace a record's content; blank content is rejected
    fn save_record(&mut self, id: &str, content: &str) -> Result<Record, StoreError>;

    /// Store a new record
    fn create_record(&mut self, upload: NewRecord) -> Result<Record, StoreError>;

    /// All records, newest first
    fn list_records(&self) -> Result<Vec<Record>, StoreError>;

    /// Delete records; unknown ids are skipped. Returns the number deleted.
    fn delete_records(&mut self, ids: &[String]) -> Result<usize, StoreError>;
}

/// Memory-based record store
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: IndexMap<String, Record>,
    next_id: u64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a fully formed record, replacing one with the same id
    pub fn insert(&mut self, record: Record) {
        self.records.insert(record.id.clone(), record);
    }
}

impl RecordStore for MemoryRecordStore {
    fn fetch_record(&self, id: &str) -> Result<Record, StoreError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save_record(&mut self, id: &str, content: &str) -> Result<Record, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::InvalidContent);
        }
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.content = content.to_string();
        Ok(record.clone())
    }

    fn create_record(&mut self, upload: NewRecord) -> Result<Record, StoreError> {
        if upload.content.trim().is_empty() {
            return Err(StoreError::InvalidContent);
        }
        self.next_id += 1;
        let record = Record {
            id: format!("rec-{:06}", self.next_id),
            original_title: title_of(&upload.file_name).to_string(),
            file_name: upload.file_name,
            file_type: upload.file_type,
            content: upload.content,
            created_at: Utc::now(),
        };
        self.insert(record.clone());
        Ok(record)
    }

    fn list_records(&self) -> Result<Vec<Record>, StoreError> {
        let mut records: Vec<Record> = self.records.values().rev().cloned().collect();
        // Stable sort keeps later insertions first among equal timestamps
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn delete_records(&mut self, ids: &[String]) -> Result<usize, StoreError> {
        Ok(ids
            .iter()
            .filter(|id| self.records.shift_remove(id.as_str()).is_some())
            .count())
    }
}

/// An outstanding save: the markup handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending save must be finished with RecordEditor::finish_save"]
pub struct PendingSave {
    pub id: String,
    pub content: String,
}

/// One record open in an editor
#[derive(Debug, Clone)]
pub struct RecordEditor {
    record: Record,
    editor: EditorController,
    saving: bool,
}

impl RecordEditor {
    /// Fetch `id` from `store` and load it
    pub fn open(store: &dyn RecordStore, id: &str, options: EditorOptions) -> EditorResult<Self> {
        let record = store
            .fetch_record(id)
            .map_err(|e| EditorError::load_failed(e.to_string()))?;
        Self::from_record(record, options)
    }

    pub fn from_record(record: Record, options: EditorOptions) -> EditorResult<Self> {
        let editor = EditorController::with_markup(&record.content, options)?;
        Ok(Self {
            record,
            editor,
            saving: false,
        })
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn editor(&self) -> &EditorController {
        &self.editor
    }

    /// Editing and selection stay available while a save is outstanding
    pub fn editor_mut(&mut self) -> &mut EditorController {
        &mut self.editor
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Prepare markup for the store; fails while another save is outstanding
    pub fn begin_save(&mut self) -> EditorResult<PendingSave> {
        if self.saving {
            return Err(EditorError::SaveInProgress);
        }
        let content = self.editor.save();
        self.saving = true;
        tracing::debug!(target: "gridedit::edit", id = %self.record.id, "save started");
        Ok(PendingSave {
            id: self.record.id.clone(),
            content,
        })
    }

    /// Apply the store's answer to a pending save
    ///
    /// On success the returned content is reloaded and the editor returns to
    /// preview; on failure nothing but the in-flight flag changes.
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        response: Result<Record, StoreError>,
    ) -> EditorResult<()> {
        self.saving = false;
        let record = response.map_err(|e| {
            tracing::warn!(target: "gridedit::edit", id = %pending.id, error = %e, "save failed");
            EditorError::save_failed(e.to_string())
        })?;
        self.editor.load(&record.content)?;
        self.record = record;
        Ok(())
    }

    /// Run both save phases against `store`
    pub fn save_to(&mut self, store: &mut dyn RecordStore) -> EditorResult<()> {
        let pending = self.begin_save()?;
        let response = store.save_record(&pending.id, &pending.content);
        self.finish_save(pending, response)
    }
}
