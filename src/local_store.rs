// Local booking cache
// A string key-value layer (file backed or in-memory) holding every cached
// booking as one JSON array under a single key.

use crate::models::{BookingRecord, BookingStatus};
use crate::store::{BookingStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const BOOKINGS_KEY: &str = "airline_bookings";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// One `<key>.json` file per key inside a directory
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

fn storage_error(e: std::io::Error) -> StoreError {
    StoreError::Storage(e.to_string())
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(storage_error)?;
        // write then rename so readers never see a partial file
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, value).map_err(storage_error)?;
        fs::rename(&tmp, self.path(key)).map_err(storage_error)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(e)),
        }
    }
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

pub struct LocalBookingCache {
    kv: Arc<dyn KeyValueStore>,
    // serializes read-modify-write cycles on the bookings array
    write_lock: Mutex<()>,
}

impl LocalBookingCache {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<Vec<BookingRecord>, StoreError> {
        match self.kv.get(BOOKINGS_KEY)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Serialization(e.to_string())),
        }
    }

    fn write_all(&self, records: &[BookingRecord]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(records)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.kv.set(BOOKINGS_KEY, &raw)
    }

    fn modify<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<BookingRecord>) -> T,
    {
        let _guard = self.write_lock.lock();
        let mut records = self.read_all()?;
        let outcome = change(&mut records);
        self.write_all(&records)?;
        Ok(outcome)
    }

    pub fn list_records(&self, user_id: &str) -> Result<Vec<BookingRecord>, StoreError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|record| record.user_id == user_id)
            .collect())
    }

    pub fn get_record(
        &self,
        user_id: &str,
        booking_id: &str,
    ) -> Result<Option<BookingRecord>, StoreError> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|record| record.user_id == user_id && record.booking_id == booking_id))
    }

    // Inserts the record, replacing any cached copy with the same booking id
    pub fn upsert_record(&self, record: BookingRecord) -> Result<(), StoreError> {
        self.modify(|records| {
            match records
                .iter_mut()
                .find(|existing| existing.booking_id == record.booking_id)
            {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
        })
    }

    pub fn update_record_status(
        &self,
        user_id: &str,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<bool, StoreError> {
        self.modify(|records| {
            match records
                .iter_mut()
                .find(|r| r.user_id == user_id && r.booking_id == booking_id)
            {
                Some(record) => {
                    record.status = status;
                    true
                }
                None => false,
            }
        })
    }

    pub fn remove_record(&self, user_id: &str, booking_id: &str) -> Result<bool, StoreError> {
        self.modify(|records| {
            let before = records.len();
            records.retain(|r| !(r.user_id == user_id && r.booking_id == booking_id));
            records.len() != before
        })
    }

    // Makes the cached copy of one user's bookings match `records` exactly
    pub fn replace_user_records(
        &self,
        user_id: &str,
        records: &[BookingRecord],
    ) -> Result<(), StoreError> {
        self.modify(|cached| {
            cached.retain(|r| r.user_id != user_id);
            cached.extend(records.iter().cloned());
        })
    }

    /// Drops every cached booking for every user.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        debug!("clearing local booking cache");
        self.kv.remove(BOOKINGS_KEY)
    }
}

#[async_trait]
impl BookingStore for LocalBookingCache {
    async fn list(&self, user_id: &str) -> Result<Vec<BookingRecord>, StoreError> {
        self.list_records(user_id)
    }

    async fn get(
        &self,
        user_id: &str,
        booking_id: &str,
    ) -> Result<Option<BookingRecord>, StoreError> {
        self.get_record(user_id, booking_id)
    }

    async fn create(&self, record: BookingRecord) -> Result<BookingRecord, StoreError> {
        self.upsert_record(record.clone())?;
        Ok(record)
    }

    async fn update_status(
        &self,
        user_id: &str,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<bool, StoreError> {
        self.update_record_status(user_id, booking_id, status)
    }

    async fn delete(&self, user_id: &str, booking_id: &str) -> Result<bool, StoreError> {
        self.remove_record(user_id, booking_id)
    }
}
