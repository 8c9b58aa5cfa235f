// Booking Record Store
// The persistence contract the wizard depends on, the backend HTTP implementation
// and the fallback decorator that pairs it with the local cache.

use crate::config::StoreConfig;
use crate::local_store::{FileKeyValueStore, KeyValueStore, LocalBookingCache, MemoryKeyValueStore};
use crate::models::{BookingRecord, BookingStatus};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Booking service returned status {status}")]
    Status { status: u16 },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// Every call either applies completely or fails without effect
#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    async fn list(&self, user_id: &str) -> Result<Vec<BookingRecord>, StoreError>;

    async fn get(
        &self,
        user_id: &str,
        booking_id: &str,
    ) -> Result<Option<BookingRecord>, StoreError>;

    async fn create(&self, record: BookingRecord) -> Result<BookingRecord, StoreError>;

    // Ok(false) when the booking does not exist
    async fn update_status(
        &self,
        user_id: &str,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<bool, StoreError>;

    // Ok(false) when the booking does not exist, so repeated deletes are harmless
    async fn delete(&self, user_id: &str, booking_id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S: BookingStore> BookingStore for Arc<S> {
    async fn list(&self, user_id: &str) -> Result<Vec<BookingRecord>, StoreError> {
        (**self).list(user_id).await
    }

    async fn get(
        &self,
        user_id: &str,
        booking_id: &str,
    ) -> Result<Option<BookingRecord>, StoreError> {
        (**self).get(user_id, booking_id).await
    }

    async fn create(&self, record: BookingRecord) -> Result<BookingRecord, StoreError> {
        (**self).create(record).await
    }

    async fn update_status(
        &self,
        user_id: &str,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<bool, StoreError> {
        (**self).update_status(user_id, booking_id, status).await
    }

    async fn delete(&self, user_id: &str, booking_id: &str) -> Result<bool, StoreError> {
        (**self).delete(user_id, booking_id).await
    }
}

#[derive(Serialize)]
struct StatusUpdate {
    status: BookingStatus,
}

// Backend booking API
pub struct RemoteBookingStore {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl RemoteBookingStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let base_url = reqwest::Url::parse(&config.api_base_url).map_err(|e| {
            StoreError::Http(format!("invalid booking service URL {}: {}", config.api_base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Http(format!(
                "booking service URL {} cannot hold a path",
                config.api_base_url
            )));
        }

        Ok(Self { http, base_url })
    }

    // Each segment is percent-encoded, so ids cannot leave the bookings path
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Http(format!("booking service URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .push("bookings")
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        request
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), StoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(StoreError::Status {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl BookingStore for RemoteBookingStore {
    async fn list(&self, user_id: &str) -> Result<Vec<BookingRecord>, StoreError> {
        let response = self.send(self.http.get(self.url(&[user_id])?)).await?;
        check_status(&response)?;

        let records: Option<Vec<BookingRecord>> = response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(records.unwrap_or_default())
    }

    async fn get(
        &self,
        user_id: &str,
        booking_id: &str,
    ) -> Result<Option<BookingRecord>, StoreError> {
        let response = self
            .send(self.http.get(self.url(&[user_id, booking_id])?))
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(&response)?;

        response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn create(&self, record: BookingRecord) -> Result<BookingRecord, StoreError> {
        let response = self.send(self.http.post(self.url(&[])?).json(&record)).await?;
        check_status(&response)?;

        response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn update_status(
        &self,
        user_id: &str,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<bool, StoreError> {
        let response = self
            .send(
                self.http
                    .put(self.url(&[user_id, booking_id, "status"])?)
                    .json(&StatusUpdate { status }),
            )
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(&response)?;
        Ok(true)
    }

    async fn delete(&self, user_id: &str, booking_id: &str) -> Result<bool, StoreError> {
        let response = self
            .send(self.http.delete(self.url(&[user_id, booking_id])?))
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(&response)?;
        Ok(true)
    }
}

// Primary store backed by the local cache. The cache is never authoritative:
// it mirrors successful primary writes and answers only when the primary fails.
pub struct FallbackBookingStore<P: BookingStore> {
    primary: P,
    cache: LocalBookingCache,
}

impl FallbackBookingStore<RemoteBookingStore> {
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let kv: Arc<dyn KeyValueStore> = match &config.cache_dir {
            Some(dir) => Arc::new(FileKeyValueStore::new(dir)),
            None => Arc::new(MemoryKeyValueStore::new()),
        };
        Ok(Self::new(
            RemoteBookingStore::new(config)?,
            LocalBookingCache::new(kv),
        ))
    }
}

impl<P: BookingStore> FallbackBookingStore<P> {
    pub fn new(primary: P, cache: LocalBookingCache) -> Self {
        Self { primary, cache }
    }

    pub fn cache(&self) -> &LocalBookingCache {
        &self.cache
    }

    fn mirror<T>(&self, operation: &str, result: Result<T, StoreError>) {
        if let Err(e) = result {
            warn!(operation, error = %e, "failed to mirror booking change into local cache");
        }
    }
}

#[async_trait]
impl<P: BookingStore> BookingStore for FallbackBookingStore<P> {
    async fn list(&self, user_id: &str) -> Result<Vec<BookingRecord>, StoreError> {
        match self.primary.list(user_id).await {
            Ok(records) => {
                self.mirror("list", self.cache.replace_user_records(user_id, &records));
                Ok(records)
            }
            Err(primary_error) => {
                warn!(error = %primary_error, "booking service unavailable, listing from local cache");
                self.cache.list_records(user_id).map_err(|cache_error| {
                    error!(error = %cache_error, "local booking cache unreadable");
                    primary_error
                })
            }
        }
    }

    async fn get(
        &self,
        user_id: &str,
        booking_id: &str,
    ) -> Result<Option<BookingRecord>, StoreError> {
        match self.primary.get(user_id, booking_id).await {
            Ok(record) => Ok(record),
            Err(primary_error) => {
                warn!(error = %primary_error, booking_id, "booking service unavailable, reading local cache");
                self.cache
                    .get_record(user_id, booking_id)
                    .map_err(|_| primary_error)
            }
        }
    }

    async fn create(&self, record: BookingRecord) -> Result<BookingRecord, StoreError> {
        match self.primary.create(record.clone()).await {
            Ok(saved) => {
                debug!(booking_id = %saved.booking_id, "booking saved to booking service");
                self.mirror("create", self.cache.upsert_record(saved.clone()));
                Ok(saved)
            }
            Err(primary_error) => {
                warn!(error = %primary_error, booking_id = %record.booking_id, "booking service unavailable, saving booking locally");
                match self.cache.upsert_record(record.clone()) {
                    Ok(()) => Ok(record),
                    Err(cache_error) => {
                        error!(error = %cache_error, booking_id = %record.booking_id, "booking could not be saved anywhere");
                        Err(primary_error)
                    }
                }
            }
        }
    }

    async fn update_status(
        &self,
        user_id: &str,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<bool, StoreError> {
        match self.primary.update_status(user_id, booking_id, status).await {
            Ok(found) => {
                self.mirror(
                    "update_status",
                    self.cache.update_record_status(user_id, booking_id, status),
                );
                Ok(found)
            }
            Err(primary_error) => {
                warn!(error = %primary_error, booking_id, "booking service unavailable, updating local cache");
                self.cache
                    .update_record_status(user_id, booking_id, status)
                    .map_err(|_| primary_error)
            }
        }
    }

    async fn delete(&self, user_id: &str, booking_id: &str) -> Result<bool, StoreError> {
        match self.primary.delete(user_id, booking_id).await {
            Ok(found) => {
                self.mirror("delete", self.cache.remove_record(user_id, booking_id));
                Ok(found)
            }
            Err(primary_error) => {
                warn!(error = %primary_error, booking_id, "booking service unavailable, deleting from local cache");
                self.cache
                    .remove_record(user_id, booking_id)
                    .map_err(|_| primary_error)
            }
        }
    }
}

// Store that fails every call, standing in for an unreachable backend
#[cfg(test)]
pub mod failing_store {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct FailingStore {
        pub calls: AtomicUsize,
    }

    impl FailingStore {
        fn fail<T>(&self) -> Result<T, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Http("connection refused".to_string()))
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BookingStore for FailingStore {
        async fn list(&self, _user_id: &str) -> Result<Vec<BookingRecord>, StoreError> {
            self.fail()
        }

        async fn get(&self, _: &str, _: &str) -> Result<Option<BookingRecord>, StoreError> {
            self.fail()
        }

        async fn create(&self, _record: BookingRecord) -> Result<BookingRecord, StoreError> {
            self.fail()
        }

        async fn update_status(
            &self,
            _: &str,
            _: &str,
            _: BookingStatus,
        ) -> Result<bool, StoreError> {
            self.fail()
        }

        async fn delete(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            self.fail()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::failing_store::FailingStore;
    use super::*;
    use crate::http_stub::{StubResponse, StubServer};
    use crate::local_store::broken::BrokenKeyValueStore;
    use crate::models::fixtures::record;
    use test_case::test_case;

    fn memory_cache() -> LocalBookingCache {
        LocalBookingCache::new(Arc::new(MemoryKeyValueStore::new()))
    }

    fn healthy() -> FallbackBookingStore<LocalBookingCache> {
        FallbackBookingStore::new(memory_cache(), memory_cache())
    }

    fn failing() -> FallbackBookingStore<Arc<FailingStore>> {
        FallbackBookingStore::new(Arc::new(FailingStore::default()), memory_cache())
    }

    #[tokio::test]
    async fn test_successful_writes_are_mirrored() {
        let store = healthy();
        store.create(record("BK000000001", "user-1")).await.unwrap();
        store.create(record("BK000000002", "user-1")).await.unwrap();

        assert_eq!(store.cache().list_records("user-1").unwrap().len(), 2);

        assert!(store
            .update_status("user-1", "BK000000001", BookingStatus::Pending)
            .await
            .unwrap());
        let cached = store.cache().get_record("user-1", "BK000000001").unwrap().unwrap();
        assert_eq!(cached.status, BookingStatus::Pending);

        assert!(store.delete("user-1", "BK000000002").await.unwrap());
        assert_eq!(store.cache().list_records("user-1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_refreshes_cache_from_primary() {
        let primary = memory_cache();
        primary.upsert_record(record("BK000000001", "user-1")).unwrap();
        let cache = memory_cache();
        cache.upsert_record(record("BK0STALE001", "user-1")).unwrap();
        cache.upsert_record(record("BK000000009", "user-2")).unwrap();

        let store = FallbackBookingStore::new(primary, cache);
        let listed = store.list("user-1").await.unwrap();
        assert_eq!(listed.len(), 1);

        let cached: Vec<String> = store
            .cache()
            .list_records("user-1")
            .unwrap()
            .into_iter()
            .map(|r| r.booking_id)
            .collect();
        assert_eq!(cached, vec!["BK000000001".to_string()]);
        // other users are untouched
        assert_eq!(store.cache().list_records("user-2").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back_to_cache() {
        let store = failing();

        let saved = store.create(record("BK000000001", "user-1")).await.unwrap();
        assert_eq!(saved.booking_id, "BK000000001");

        let listed = store.list("user-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.get("user-1", "BK000000001").await.unwrap().is_some());

        assert!(store
            .update_status("user-1", "BK000000001", BookingStatus::Pending)
            .await
            .unwrap());
        assert!(store.delete("user-1", "BK000000001").await.unwrap());
        assert!(store.list("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = healthy();
        store.create(record("BK000000001", "user-1")).await.unwrap();

        assert!(store.delete("user-1", "BK000000001").await.unwrap());
        assert!(!store.delete("user-1", "BK000000001").await.unwrap());
        assert!(store.list("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_both_failing_surfaces_primary_error() {
        let broken_cache = LocalBookingCache::new(Arc::new(BrokenKeyValueStore));
        let store = FallbackBookingStore::new(Arc::new(FailingStore::default()), broken_cache);

        let result = store.create(record("BK000000001", "user-1")).await;
        assert_eq!(
            result,
            Err(StoreError::Http("connection refused".to_string()))
        );
        assert!(store.list("user-1").await.is_err());
    }

    #[tokio::test]
    async fn test_cache_failure_does_not_fail_primary_write() {
        let broken_cache = LocalBookingCache::new(Arc::new(BrokenKeyValueStore));
        let store = FallbackBookingStore::new(memory_cache(), broken_cache);

        assert!(store.create(record("BK000000001", "user-1")).await.is_ok());
        assert_eq!(store.list("user-1").await.unwrap().len(), 1);
    }

    #[test_case("http://localhost:8080/api/"; "trailing slash")]
    #[test_case("http://localhost:8080/api"; "no trailing slash")]
    fn test_remote_urls(base: &str) {
        let store = RemoteBookingStore::new(&StoreConfig {
            api_base_url: base.to_string(),
            ..StoreConfig::default()
        })
        .unwrap();
        assert_eq!(
            store.url(&[]).unwrap().as_str(),
            "http://localhost:8080/api/bookings"
        );
        assert_eq!(
            store.url(&["user-1", "BK000000001", "status"]).unwrap().as_str(),
            "http://localhost:8080/api/bookings/user-1/BK000000001/status"
        );
    }

    #[test_case("not a url"; "unparseable")]
    #[test_case("mailto:bookings@example.com"; "no path")]
    fn test_unusable_base_url_is_rejected(base: &str) {
        let result = RemoteBookingStore::new(&StoreConfig {
            api_base_url: base.to_string(),
            ..StoreConfig::default()
        });
        assert!(matches!(result, Err(StoreError::Http(_))));
    }

    fn remote(server: &StubServer) -> RemoteBookingStore {
        RemoteBookingStore::new(&StoreConfig {
            api_base_url: format!("{}/api", server.url()),
            ..StoreConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_remote_store_reads_writes_and_missing_bookings() {
        let listed = serde_json::to_string(&vec![record("BK000000001", "user-1")]).unwrap();
        let server = StubServer::start(move |request| {
            match (request.method.as_str(), request.path()) {
                ("GET", "/api/bookings/user-1") => StubResponse::json(200, listed.clone()),
                ("GET", "/api/bookings/user-2") => StubResponse::json(200, "null"),
                ("POST", "/api/bookings") => StubResponse::json(201, request.body.clone()),
                _ => StubResponse::json(404, r#"{"message":"Booking not found"}"#),
            }
        })
        .await;
        let store = remote(&server);

        let records = store.list("user-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].booking_id, "BK000000001");
        assert!(store.list("user-2").await.unwrap().is_empty());

        let saved = store.create(record("BK000000002", "user-1")).await.unwrap();
        assert_eq!(saved.booking_id, "BK000000002");
        assert_eq!(saved.status, BookingStatus::Confirmed);

        assert_eq!(store.get("user-1", "BK000000404").await.unwrap(), None);
        assert!(!store
            .update_status("user-1", "BK000000404", BookingStatus::Pending)
            .await
            .unwrap());
        assert!(!store.delete("user-1", "BK000000404").await.unwrap());
    }

    #[tokio::test]
    async fn test_remote_store_status_handling() {
        let server = StubServer::start(|request| match request.method.as_str() {
            "PUT" | "DELETE" => StubResponse::json(200, "{}"),
            _ => StubResponse::json(500, r#"{"message":"database offline"}"#),
        })
        .await;
        let store = remote(&server);

        assert!(store
            .update_status("user-1", "BK000000001", BookingStatus::Pending)
            .await
            .unwrap());
        assert!(store.delete("user-1", "BK000000001").await.unwrap());
        assert_eq!(
            store.list("user-1").await,
            Err(StoreError::Status { status: 500 })
        );
        assert_eq!(
            store.get("user-1", "BK000000001").await,
            Err(StoreError::Status { status: 500 })
        );

        let requests = server.requests().await;
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].path(), "/api/bookings/user-1/BK000000001/status");
        assert_eq!(requests[0].body, r#"{"status":"Pending"}"#);
        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(requests[1].path(), "/api/bookings/user-1/BK000000001");
    }

    #[tokio::test]
    async fn test_remote_ids_are_percent_encoded() {
        let server = StubServer::start(|_| StubResponse::json(404, "")).await;
        let store = remote(&server);

        assert_eq!(store.get("user 1", "BK/1?x").await.unwrap(), None);
        assert!(!store.delete("user-1", "../admin").await.unwrap());

        let targets: Vec<String> = server
            .requests()
            .await
            .into_iter()
            .map(|request| request.target)
            .collect();
        assert_eq!(
            targets,
            vec![
                "/api/bookings/user%201/BK%2F1%3Fx",
                "/api/bookings/user-1/..%2Fadmin",
            ]
        );
    }
}
