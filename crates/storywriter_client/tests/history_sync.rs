mod common;

use common::{story, FakeRemote};
use std::{
    collections::HashSet,
    sync::{atomic::Ordering, Arc},
};
use storywriter_client::{
    local_store::{keys, load_json, save_json},
    HistorySynchronizer, LocalStore, MemoryStore, SyncError, LOCAL_HISTORY_CAP,
};
use storywriter_core::{StoryHistoryItem, StoryOptions};

const USER: &str = "user-1";

fn persisted(store: &MemoryStore) -> Vec<StoryHistoryItem> {
    load_json(store, &keys::history_for_user(USER), Vec::new())
}

fn ids(items: &[StoryHistoryItem]) -> Vec<String> {
    items.iter().map(|item| item.id.clone()).collect()
}

fn mount(
    store: &Arc<MemoryStore>,
    remote: &Arc<FakeRemote>,
) -> (HistorySynchronizer, storywriter_client::SyncTask<usize>) {
    let store: Arc<dyn LocalStore> = store.clone();
    HistorySynchronizer::mount(USER, store, remote.clone())
}

#[tokio::test]
async fn cached_history_is_shown_before_the_remote_list_replaces_it() {
    let store = Arc::new(MemoryStore::new());
    save_json(&*store, &keys::history_for_user(USER), &vec![story("local-1")]).unwrap();
    let remote_items: Vec<_> = (0..20).map(|i| story(&format!("srv-{}", i))).collect();
    let remote = Arc::new(FakeRemote::with_stories(remote_items));

    let (history, refresh) = mount(&store, &remote);
    assert_eq!(ids(&history.history()), vec!["local-1"]);

    assert_eq!(refresh.outcome().await.unwrap(), LOCAL_HISTORY_CAP);
    let items = history.history();
    assert_eq!(items.len(), LOCAL_HISTORY_CAP);
    assert_eq!(items[0].id, "srv-0");
    assert_eq!(persisted(&store), items);
}

#[tokio::test]
async fn remote_failure_keeps_the_local_list() {
    let store = Arc::new(MemoryStore::new());
    save_json(&*store, &keys::history_for_user(USER), &vec![story("local-1")]).unwrap();
    let remote = Arc::new(FakeRemote::with_stories(vec![story("srv-0")]));
    remote.fail_fetch.store(true, Ordering::SeqCst);

    let (history, refresh) = mount(&store, &remote);
    assert!(matches!(refresh.outcome().await, Err(SyncError::Remote(_))));
    assert_eq!(ids(&history.history()), vec!["local-1"]);
}

#[tokio::test]
async fn unmount_discards_a_pending_fetch() {
    let store = Arc::new(MemoryStore::new());
    save_json(&*store, &keys::history_for_user(USER), &vec![story("local-1")]).unwrap();
    let remote = Arc::new(FakeRemote::with_stories(vec![story("srv-0")]));
    remote.hold_fetch.store(true, Ordering::SeqCst);

    let (history, refresh) = mount(&store, &remote);
    history.unmount();
    remote.fetch_gate.notify_one();

    assert!(matches!(refresh.outcome().await, Err(SyncError::Cancelled)));
    assert_eq!(ids(&history.history()), vec!["local-1"]);
    assert_eq!(ids(&persisted(&store)), vec!["local-1"]);
}

#[tokio::test]
async fn dropping_the_synchronizer_cancels_the_fetch() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeRemote::with_stories(vec![story("srv-0")]));
    remote.hold_fetch.store(true, Ordering::SeqCst);

    let (history, refresh) = mount(&store, &remote);
    drop(history);
    assert!(matches!(refresh.outcome().await, Err(SyncError::Cancelled)));
    assert!(persisted(&store).is_empty());
}

#[tokio::test]
async fn saved_entries_replace_their_local_copy_in_place() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeRemote::default());
    let (history, refresh) = mount(&store, &remote);
    refresh.outcome().await.unwrap();

    remote.hold_save.store(true, Ordering::SeqCst);
    let (first, first_sync) = history.record(StoryOptions::default(), "first".to_string());
    let (second, second_sync) = history.record(StoryOptions::default(), "second".to_string());
    remote.wait_for_saves(2).await;
    assert_eq!(ids(&history.history()), vec![second.id.clone(), first.id.clone()]);

    // Gate waiters are released in arrival order, so only the first save finishes.
    remote.save_gate.notify_one();
    let saved_first = first_sync.outcome().await.unwrap();
    assert_eq!(saved_first.id, "srv-1");
    assert_eq!(ids(&history.history()), vec![second.id.clone(), "srv-1".to_string()]);
    assert!(!second_sync.is_finished());

    remote.save_gate.notify_one();
    let saved_second = second_sync.outcome().await.unwrap();
    assert_eq!(saved_second.id, "srv-2");
    assert_eq!(ids(&history.history()), vec!["srv-2", "srv-1"]);
    assert_eq!(ids(&persisted(&store)), vec!["srv-2", "srv-1"]);
}

#[tokio::test]
async fn refresh_landing_before_the_save_keeps_the_new_entry() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeRemote::with_stories(vec![story("srv-0")]));
    remote.next_id.store(1, Ordering::SeqCst);
    remote.hold_fetch.store(true, Ordering::SeqCst);
    remote.hold_save.store(true, Ordering::SeqCst);
    let (history, refresh) = mount(&store, &remote);

    let (item, sync) = history.record(StoryOptions::default(), "fresh".to_string());
    remote.wait_for_saves(1).await;

    remote.fetch_gate.notify_one();
    assert_eq!(refresh.outcome().await.unwrap(), 2);
    assert_eq!(ids(&history.history()), vec![item.id.clone(), "srv-0".to_string()]);
    assert_eq!(ids(&persisted(&store)), vec![item.id.clone(), "srv-0".to_string()]);

    remote.save_gate.notify_one();
    let saved = sync.outcome().await.unwrap();
    assert_eq!(saved.id, "srv-2");
    assert_eq!(ids(&history.history()), vec!["srv-2", "srv-0"]);
    assert_eq!(ids(&persisted(&store)), vec!["srv-2", "srv-0"]);
}

#[tokio::test]
async fn unsaved_entries_survive_a_later_refresh() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeRemote::with_stories(vec![story("srv-0")]));
    remote.fail_save.store(true, Ordering::SeqCst);
    remote.hold_fetch.store(true, Ordering::SeqCst);
    let (history, refresh) = mount(&store, &remote);

    let (item, sync) = history.record(StoryOptions::default(), "offline".to_string());
    assert!(matches!(sync.outcome().await, Err(SyncError::Remote(_))));

    remote.fetch_gate.notify_one();
    assert_eq!(refresh.outcome().await.unwrap(), 2);
    let items = history.history();
    assert_eq!(items[0], item);
    assert_eq!(ids(&items), vec![item.id.clone(), "srv-0".to_string()]);
}

#[tokio::test]
async fn failed_save_keeps_the_local_entry() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeRemote::default());
    remote.fail_save.store(true, Ordering::SeqCst);
    let (history, _refresh) = mount(&store, &remote);

    let (item, sync) = history.record(StoryOptions::default(), "kept".to_string());
    assert!(matches!(sync.outcome().await, Err(SyncError::Remote(_))));
    let items = history.history();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0], item);
    assert_eq!(items[0].snippet, "kept");
}

#[tokio::test]
async fn history_never_exceeds_the_cap() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeRemote::default());
    remote.fail_save.store(true, Ordering::SeqCst);
    let (history, _refresh) = mount(&store, &remote);

    let mut last = None;
    for n in 0..(LOCAL_HISTORY_CAP + 5) {
        let (item, _sync) = history.record(StoryOptions::default(), format!("story {}", n));
        assert!(history.history().len() <= LOCAL_HISTORY_CAP);
        assert!(persisted(&store).len() <= LOCAL_HISTORY_CAP);
        last = Some(item);
    }
    let items = history.history();
    assert_eq!(items.len(), LOCAL_HISTORY_CAP);
    assert_eq!(Some(&items[0]), last.as_ref());
}

#[tokio::test]
async fn entry_deleted_before_its_save_completes_stays_deleted() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeRemote::default());
    let (history, refresh) = mount(&store, &remote);
    refresh.outcome().await.unwrap();

    remote.hold_save.store(true, Ordering::SeqCst);
    let (item, sync) = history.record(StoryOptions::default(), "short-lived".to_string());
    history.delete(&item.id).outcome().await.unwrap();
    assert!(history.history().is_empty());

    remote.save_gate.notify_one();
    let saved = sync.outcome().await.unwrap();
    assert!(history.find(&saved.id).is_none());
    assert!(history.history().is_empty());
    assert!(persisted(&store).is_empty());
}

#[tokio::test]
async fn ids_stay_unique_across_remounts() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(FakeRemote::default());
    {
        let (history, refresh) = mount(&store, &remote);
        refresh.outcome().await.unwrap();
        for n in 0..3 {
            let (_, sync) = history.record(StoryOptions::default(), format!("story {}", n));
            sync.outcome().await.unwrap();
        }
    }

    let (history, refresh) = mount(&store, &remote);
    assert_eq!(refresh.outcome().await.unwrap(), 3);
    let items = history.history();
    let unique: HashSet<_> = items.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(unique.len(), 3);
    assert_eq!(ids(&items), remote.ids());
}

#[tokio::test]
async fn delete_is_local_first() {
    let store = Arc::new(MemoryStore::new());
    save_json(
        &*store,
        &keys::history_for_user(USER),
        &vec![story("a"), story("b")],
    )
    .unwrap();
    let remote = Arc::new(FakeRemote::default());
    remote.fail_fetch.store(true, Ordering::SeqCst);
    let (history, _refresh) = mount(&store, &remote);

    let task = history.delete("a");
    assert_eq!(ids(&history.history()), vec!["b"]);
    assert_eq!(ids(&persisted(&store)), vec!["b"]);
    task.outcome().await.unwrap();
    assert_eq!(remote.delete_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn clear_empties_locally_even_when_the_backend_fails() {
    let store = Arc::new(MemoryStore::new());
    save_json(&*store, &keys::history_for_user(USER), &vec![story("a")]).unwrap();
    let remote = Arc::new(FakeRemote::default());
    remote.fail_fetch.store(true, Ordering::SeqCst);
    remote.fail_clear.store(true, Ordering::SeqCst);
    let (history, _refresh) = mount(&store, &remote);

    let task = history.clear();
    assert!(history.history().is_empty());
    assert!(matches!(task.outcome().await, Err(SyncError::Remote(_))));
    assert!(history.history().is_empty());
    assert!(persisted(&store).is_empty());
    assert_eq!(remote.clear_calls.load(Ordering::SeqCst), 1);
}
