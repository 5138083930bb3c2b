//! crates/storywriter_client/src/history_sync.rs
//!
//! Local-first story history. The cached list is available synchronously; the
//! backend copy is fetched and written in background tasks whose outcomes are
//! returned as `SyncTask` handles and logged, never raised to the reader.

use crate::{
    error::SyncError,
    local_store::{keys, load_json, save_json, LocalStore},
};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use storywriter_core::{
    domain::{NewStoryRecord, StoryHistoryItem, StoryOptions},
    ports::{PortResult, StoryHistoryRemote},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maximum number of entries kept in the local history.
pub const LOCAL_HISTORY_CAP: usize = 15;

//=========================================================================================
// Background task handle
//=========================================================================================

/// Handle to a background synchronization step.
///
/// Dropping the handle does not stop the task; its failure is still logged.
#[derive(Debug)]
pub struct SyncTask<T> {
    handle: JoinHandle<Result<T, SyncError>>,
}

impl<T> SyncTask<T> {
    fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Result<T, SyncError>> + Send + 'static,
        T: Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task and returns what it did.
    pub async fn outcome(self) -> Result<T, SyncError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(SyncError::Aborted(e.to_string())),
        }
    }
}

//=========================================================================================
// Shared list state
//=========================================================================================

#[derive(Default)]
struct HistoryList {
    items: Vec<StoryHistoryItem>,
    /// Entries created here that the backend has not confirmed. A remote
    /// refresh keeps them in front of the fetched list.
    local_only: HashSet<String>,
    /// Local-only entries whose save is still running.
    saving: HashSet<String>,
    /// Saving entries the user removed (or the cap evicted) meanwhile.
    dropped: HashSet<String>,
}

impl HistoryList {
    fn forget(&mut self, id: &str) {
        self.local_only.remove(id);
        if self.saving.contains(id) {
            self.dropped.insert(id.to_string());
        }
    }

    fn enforce_cap(&mut self, cap: usize) {
        if self.items.len() <= cap {
            return;
        }
        let evicted: Vec<String> = self.items.drain(cap..).map(|item| item.id).collect();
        for id in &evicted {
            self.forget(id);
        }
    }

    /// Keeps the first entry for each id.
    fn dedupe(&mut self) {
        let mut seen = HashSet::new();
        self.items.retain(|item| seen.insert(item.id.clone()));
    }
}

/// The in-memory list plus its storage key. Every mutation is persisted
/// while the lock is held so memory and storage never diverge.
struct HistoryState {
    storage_key: String,
    store: Arc<dyn LocalStore>,
    list: Mutex<HistoryList>,
    cap: usize,
}

impl HistoryState {
    fn lock(&self) -> MutexGuard<'_, HistoryList> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, items: &[StoryHistoryItem]) {
        if let Err(e) = save_json(self.store.as_ref(), &self.storage_key, items) {
            warn!("Failed to persist story history under {}: {}", self.storage_key, e);
        }
    }

    fn snapshot(&self) -> Vec<StoryHistoryItem> {
        self.lock().items.clone()
    }

    /// Takes the backend list, keeping unconfirmed local entries in front.
    fn replace_all(&self, remote: Vec<StoryHistoryItem>) -> usize {
        let mut list = self.lock();
        let mut merged: Vec<StoryHistoryItem> = list
            .items
            .iter()
            .filter(|item| list.local_only.contains(&item.id))
            .cloned()
            .collect();
        merged.extend(remote);
        list.items = merged;
        list.dedupe();
        list.enforce_cap(self.cap);
        self.persist(&list.items);
        list.items.len()
    }

    fn prepend_local(&self, item: StoryHistoryItem) {
        let mut list = self.lock();
        list.local_only.insert(item.id.clone());
        list.saving.insert(item.id.clone());
        list.items.insert(0, item);
        list.enforce_cap(self.cap);
        self.persist(&list.items);
    }

    /// Swaps the local-only entry `temp_id` for the server copy, in place.
    ///
    /// Returns false when the user removed the entry before the backend
    /// confirmed it. If the entry is missing for any other reason the server
    /// copy is put in front.
    fn reconcile(&self, temp_id: &str, saved: StoryHistoryItem) -> bool {
        let mut list = self.lock();
        list.saving.remove(temp_id);
        list.local_only.remove(temp_id);
        if list.dropped.remove(temp_id) {
            return false;
        }
        match list.items.iter().position(|item| item.id == temp_id) {
            Some(position) => list.items[position] = saved,
            None => list.items.insert(0, saved),
        }
        list.dedupe();
        list.enforce_cap(self.cap);
        self.persist(&list.items);
        true
    }

    /// The save failed; the entry stays as a local-only copy.
    fn save_failed(&self, temp_id: &str) {
        let mut list = self.lock();
        list.saving.remove(temp_id);
        list.dropped.remove(temp_id);
    }

    fn remove(&self, id: &str) -> bool {
        let mut list = self.lock();
        let before = list.items.len();
        list.items.retain(|item| item.id != id);
        let removed = list.items.len() != before;
        list.forget(id);
        self.persist(&list.items);
        removed
    }

    fn clear(&self) {
        let mut list = self.lock();
        let ids: Vec<String> = list.items.drain(..).map(|item| item.id).collect();
        for id in &ids {
            list.forget(id);
        }
        self.persist(&list.items);
    }
}

//=========================================================================================
// Synchronizer
//=========================================================================================

/// Per-user history with local-first reads and best-effort remote writes.
pub struct HistorySynchronizer {
    user_id: String,
    state: Arc<HistoryState>,
    remote: Arc<dyn StoryHistoryRemote>,
    cancel: CancellationToken,
}

impl HistorySynchronizer {
    /// Loads the cached history for `user_id` and starts the remote refresh.
    ///
    /// The returned list is usable immediately. The refresh task yields the
    /// number of entries taken from the backend, or why the local list was kept.
    pub fn mount(
        user_id: impl Into<String>,
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn StoryHistoryRemote>,
    ) -> (Self, SyncTask<usize>) {
        Self::mount_with_cap(user_id, store, remote, LOCAL_HISTORY_CAP)
    }

    pub fn mount_with_cap(
        user_id: impl Into<String>,
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn StoryHistoryRemote>,
        cap: usize,
    ) -> (Self, SyncTask<usize>) {
        let user_id = user_id.into();
        let storage_key = keys::history_for_user(&user_id);
        let mut cached: Vec<StoryHistoryItem> = load_json(store.as_ref(), &storage_key, Vec::new());
        cached.truncate(cap);

        let state = Arc::new(HistoryState {
            storage_key,
            store,
            list: Mutex::new(HistoryList {
                items: cached,
                ..HistoryList::default()
            }),
            cap,
        });
        let synchronizer = Self {
            user_id,
            state,
            remote,
            cancel: CancellationToken::new(),
        };
        let refresh = synchronizer.spawn_refresh();
        (synchronizer, refresh)
    }

    fn spawn_refresh(&self) -> SyncTask<usize> {
        let state = self.state.clone();
        let remote = self.remote.clone();
        let user_id = self.user_id.clone();
        let cancel = self.cancel.clone();

        SyncTask::spawn(async move {
            let fetched = tokio::select! {
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                fetched = remote.fetch_history(&user_id) => fetched,
            };
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            match fetched {
                Ok(items) => {
                    let count = state.replace_all(items);
                    info!("Synced {} stories from backend for {}", count, user_id);
                    Ok(count)
                }
                Err(e) => {
                    debug!("Keeping local history for {}: {}", user_id, e);
                    Err(SyncError::Remote(e))
                }
            }
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The current list, newest first.
    pub fn history(&self) -> Vec<StoryHistoryItem> {
        self.state.snapshot()
    }

    pub fn find(&self, id: &str) -> Option<StoryHistoryItem> {
        self.state
            .lock()
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    /// Stops a pending refresh; its result is discarded.
    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    /// Adds a freshly generated story locally, then saves it to the backend.
    ///
    /// On success the local entry is replaced by the server copy (with the
    /// server id) at the same position. On failure the local entry stays, and
    /// survives a later remote refresh.
    pub fn record(
        &self,
        options: StoryOptions,
        content: String,
    ) -> (StoryHistoryItem, SyncTask<StoryHistoryItem>) {
        let item = StoryHistoryItem::new_local(options, content);
        self.state.prepend_local(item.clone());

        let record = NewStoryRecord {
            user_id: self.user_id.clone(),
            options: item.options.clone(),
            content: item.content.clone(),
            snippet: item.snippet.clone(),
        };
        let temp_id = item.id.clone();
        let state = self.state.clone();
        let remote = self.remote.clone();

        let task = SyncTask::spawn(async move {
            let saved = match log_failure("save story", remote.save_story(record).await) {
                Ok(saved) => saved,
                Err(e) => {
                    state.save_failed(&temp_id);
                    return Err(e);
                }
            };
            if !state.reconcile(&temp_id, saved.clone()) {
                debug!("Local entry {} was removed before the backend confirmed it", temp_id);
            }
            Ok(saved)
        });
        (item, task)
    }

    /// Removes one entry locally, then deletes it on the backend.
    pub fn delete(&self, id: &str) -> SyncTask<()> {
        self.state.remove(id);

        let remote = self.remote.clone();
        let user_id = self.user_id.clone();
        let id = id.to_string();
        SyncTask::spawn(async move {
            log_failure("delete story", remote.delete_story(&user_id, &id).await)
        })
    }

    /// Empties the history locally, then on the backend.
    pub fn clear(&self) -> SyncTask<()> {
        self.state.clear();

        let remote = self.remote.clone();
        let user_id = self.user_id.clone();
        SyncTask::spawn(async move {
            log_failure("clear history", remote.clear_history(&user_id).await)
        })
    }
}

impl Drop for HistorySynchronizer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn log_failure<T>(action: &str, result: PortResult<T>) -> Result<T, SyncError> {
    result.map_err(|e| {
        warn!("Failed to {} on backend: {}", action, e);
        SyncError::Remote(e)
    })
}
