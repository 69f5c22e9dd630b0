//! Create/update/delete/refresh of saved locations against the remote collection.
//!
//! Each operation runs validate → request → apply-to-store → notify, and leaves
//! the store untouched unless the endpoint answered with a 2xx status.
//! Operations are independent of each other: the store lock is only held while
//! applying a response, never across a request. Two operations racing on the
//! same id resolve as "last response applied".

use parking_lot::RwLock;
use reqwest::Url;
use std::{fmt, sync::Arc};

use crate::{
    error::{Error, Result},
    http::HttpClient,
    model::{LocationChanges, LocationDraft, LocationId, SavedLocation},
    store::LocationStore,
};

pub const PLACEHOLDER_COLLECTION_URL: &str = "https://jsonplaceholder.typicode.com/posts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOp {
    Create,
    Update,
    Delete,
    Refresh,
}

impl SyncOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOp::Create => "create",
            SyncOp::Update => "update",
            SyncOp::Delete => "delete",
            SyncOp::Refresh => "refresh",
        }
    }
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a single operation is. Operations start idle; `Committed` and
/// `Failed` are terminal. An operation rejected locally goes straight to
/// `Failed` without ever being `InFlight`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpState {
    InFlight,
    Committed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub op: SyncOp,
    /// Target id; `None` for refreshes and for creates that did not commit.
    pub id: Option<LocationId>,
    pub state: OpState,
}

/// Receives every state transition of every sync operation.
pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

/// Sole writer of the saved-location list.
pub struct LocationSyncService {
    http: HttpClient,
    collection: Url,
    store: RwLock<LocationStore>,
    observers: Vec<Arc<dyn SyncObserver>>,
}

impl fmt::Debug for LocationSyncService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationSyncService")
            .field("collection", &self.collection.as_str())
            .field("store", &*self.store.read())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl LocationSyncService {
    pub fn new(http: HttpClient, collection_url: &str) -> Result<Self> {
        let collection = Url::parse(collection_url).map_err(|e| {
            Error::Validation(format!("invalid locations URL '{collection_url}': {e}"))
        })?;
        if collection.cannot_be_a_base() {
            return Err(Error::Validation(format!(
                "locations URL '{collection_url}' cannot hold item paths"
            )));
        }

        Ok(Self { http, collection, store: RwLock::new(LocationStore::new()), observers: Vec::new() })
    }

    pub fn subscribe(&mut self, observer: Arc<dyn SyncObserver>) {
        self.observers.push(observer);
    }

    /// Snapshot of the current list, in insertion order.
    pub fn all(&self) -> Vec<SavedLocation> {
        self.store.read().all().to_vec()
    }

    pub fn get(&self, id: LocationId) -> Option<SavedLocation> {
        self.store.read().get(id).cloned()
    }

    pub async fn create(&self, draft: &LocationDraft) -> Result<SavedLocation> {
        let result = self.try_create(draft).await;
        let id = result.as_ref().ok().map(|loc| loc.id);
        self.finish(SyncOp::Create, id, result)
    }

    pub async fn update(&self, id: LocationId, changes: &LocationChanges) -> Result<SavedLocation> {
        let result = self.try_update(id, changes).await;
        self.finish(SyncOp::Update, Some(id), result)
    }

    /// Delete an already-confirmed location.
    pub async fn delete(&self, id: LocationId) -> Result<()> {
        let result = self.try_delete(id).await;
        self.finish(SyncOp::Delete, Some(id), result)
    }

    /// Replace the whole list with the remote collection.
    pub async fn refresh_all(&self) -> Result<Vec<SavedLocation>> {
        let result = self.try_refresh().await;
        self.finish(SyncOp::Refresh, None, result)
    }

    async fn try_create(&self, draft: &LocationDraft) -> Result<SavedLocation> {
        draft.validate()?;
        self.notify(SyncOp::Create, None, OpState::InFlight);

        let res = self.http.post(self.collection.clone(), draft).await?;
        if !res.is_success() {
            return Err(res.into_remote_error("Failed to save location"));
        }

        let created = SavedLocation::from_created(res.json()?)?;
        self.store.write().add(created.clone())?;
        Ok(created)
    }

    async fn try_update(&self, id: LocationId, changes: &LocationChanges) -> Result<SavedLocation> {
        changes.validate()?;
        if !self.store.read().contains(id) {
            return Err(Error::NotFound(id));
        }
        self.notify(SyncOp::Update, Some(id), OpState::InFlight);

        let res = self.http.put(self.item_url(id)?, changes).await?;
        if !res.is_success() {
            return Err(res.into_remote_error("Failed to update location"));
        }

        let body = res.json()?;
        let echoed: LocationChanges = if body.is_object() {
            serde_json::from_value(body)
                .map_err(|e| Error::Parse(format!("invalid update response: {e}")))?
        } else {
            LocationChanges::default()
        };

        let mut store = self.store.write();
        // The record may have been deleted while the request was in flight.
        let mut merged = store.get(id).cloned().ok_or(Error::NotFound(id))?;
        changes.apply_to(&mut merged);
        echoed.apply_to(&mut merged);
        store.replace(id, merged.clone())?;
        Ok(merged)
    }

    async fn try_delete(&self, id: LocationId) -> Result<()> {
        self.notify(SyncOp::Delete, Some(id), OpState::InFlight);

        let res = self.http.delete(self.item_url(id)?).await?;
        if !res.is_success() {
            return Err(res.into_remote_error("Failed to delete location"));
        }

        // Whatever the body is, even non-JSON, a 2xx means the record is gone.
        self.store.write().remove(id);
        Ok(())
    }

    async fn try_refresh(&self) -> Result<Vec<SavedLocation>> {
        self.notify(SyncOp::Refresh, None, OpState::InFlight);

        let res = self.http.get(self.collection.clone()).await?;
        if !res.is_success() {
            return Err(res.into_remote_error("Failed to load saved locations"));
        }

        let records: Vec<SavedLocation> = serde_json::from_value(res.json()?)
            .map_err(|e| Error::Parse(format!("invalid saved locations listing: {e}")))?;

        let unnamed = records.iter().filter(|r| r.name.trim().is_empty()).count();
        if unnamed > 0 {
            tracing::warn!(unnamed, "listing contains saved locations without a name");
        }
        let fresh = LocationStore::from_records(records)?;

        let mut store = self.store.write();
        *store = fresh;
        Ok(store.all().to_vec())
    }

    fn item_url(&self, id: LocationId) -> Result<Url> {
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Validation("locations URL cannot hold item paths".into()))?
            .pop_if_empty()
            .push(&id.to_string());
        Ok(url)
    }

    fn finish<T>(&self, op: SyncOp, id: Option<LocationId>, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                tracing::info!(%op, ?id, "sync operation committed");
                self.notify(op, id, OpState::Committed);
            }
            Err(e) => {
                tracing::warn!(%op, ?id, error = %e, "sync operation failed");
                self.notify(op, id, OpState::Failed(e.to_string()));
            }
        }
        result
    }

    fn notify(&self, op: SyncOp, id: Option<LocationId>, state: OpState) {
        if self.observers.is_empty() {
            return;
        }
        let event = SyncEvent { op, id, state };
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}
