//! Saved-form repository
//!
//! All forms are kept as one JSON array of [`SavedForm`] under the storage
//! key. Reads are lenient: a missing or malformed blob reads as no forms and
//! records that do not decode are skipped. Writes are not: they edit the raw
//! records by id, keep records they cannot decode as they are, and refuse to
//! overwrite a blob that is not a JSON array.

use parking_lot::Mutex;
use serde_json::Value;

use formkit_core::config::DEFAULT_STORAGE_KEY;
use formkit_core::{FormSchema, SavedForm};

use crate::error::{StoreError, StoreResult};
use crate::kv::KeyValueStore;

pub struct FormRepository<S: KeyValueStore> {
    store: S,
    storage_key: String,
    // serialises read-modify-write of the blob
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> FormRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_storage_key(store, DEFAULT_STORAGE_KEY)
    }

    pub fn with_storage_key(store: S, storage_key: impl Into<String>) -> Self {
        Self { store, storage_key: storage_key.into(), write_lock: Mutex::new(()) }
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Persist the schema: replace the form with the same id, else append
    pub fn save_form(&self, form: &FormSchema) -> StoreResult<SavedForm> {
        let saved = form.to_saved();
        self.save_saved(saved.clone())?;
        Ok(saved)
    }

    /// Upsert an already-flattened record
    pub fn save_saved(&self, saved: SavedForm) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let mut records = self.records()?;
        let record = serde_json::to_value(&saved)?;
        match records.iter_mut().find(|r| record_id(r) == Some(saved.id.as_str())) {
            Some(existing) => {
                tracing::debug!(form_id = %saved.id, "replacing saved form");
                *existing = record;
            }
            None => {
                tracing::debug!(form_id = %saved.id, "appending saved form");
                records.push(record);
            }
        }
        self.write(&records)
    }

    /// Every readable saved form in save order
    pub fn saved_forms(&self) -> StoreResult<Vec<SavedForm>> {
        let records = match self.records() {
            Ok(records) => records,
            Err(StoreError::Serialization(e)) => {
                tracing::warn!(key = %self.storage_key, error = %e, "saved forms unreadable, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let forms = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let id = record_id(&record).unwrap_or_default().to_string();
                match serde_json::from_value(record) {
                    Ok(form) => Some(form),
                    Err(e) => {
                        tracing::warn!(index, form_id = %id, error = %e, "skipping unreadable saved form");
                        None
                    }
                }
            })
            .collect();
        Ok(forms)
    }

    pub fn form_by_id(&self, id: &str) -> StoreResult<Option<SavedForm>> {
        Ok(self.saved_forms()?.into_iter().find(|f| f.id == id))
    }

    /// Load a form for editing
    pub fn load_schema(&self, id: &str) -> StoreResult<FormSchema> {
        self.form_by_id(id)?
            .map(FormSchema::from_saved)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Remove the form with `id`. Returns whether one was removed.
    pub fn delete_form(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock();
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            return Ok(false);
        }
        self.write(&records)?;
        tracing::info!(form_id = %id, "deleted saved form");
        Ok(true)
    }

    pub fn clear_all(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        self.store.remove(&self.storage_key)?;
        tracing::info!(key = %self.storage_key, "cleared saved forms");
        Ok(())
    }

    /// Raw records; a blob that is not a JSON array is a `Serialization` error
    fn records(&self) -> StoreResult<Vec<Value>> {
        match self.store.get(&self.storage_key)? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, records: &[Value]) -> StoreResult<()> {
        let blob = serde_json::to_string(records)?;
        self.store.set(&self.storage_key, &blob).map_err(|e| {
            tracing::error!(key = %self.storage_key, error = %e, "failed to write saved forms");
            e
        })
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}
