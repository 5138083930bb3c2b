#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};
use storywriter_core::{
    NewStoryRecord, PortError, PortResult, StoryHistoryItem, StoryHistoryRemote, StoryOptions,
};
use tokio::{net::TcpListener, sync::Notify};

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn story(id: &str) -> StoryHistoryItem {
    let mut item = StoryHistoryItem::new_local(StoryOptions::default(), format!("content of {}", id));
    item.id = id.to_string();
    item
}

/// In-memory backend history with failure switches and gates.
#[derive(Default)]
pub struct FakeRemote {
    pub stories: Mutex<Vec<StoryHistoryItem>>,
    pub fail_fetch: AtomicBool,
    pub fail_save: AtomicBool,
    pub fail_clear: AtomicBool,
    /// While set, `fetch_history` waits for `fetch_gate`.
    pub hold_fetch: AtomicBool,
    pub fetch_gate: Notify,
    /// While set, `save_story` waits for `save_gate`.
    pub hold_save: AtomicBool,
    pub save_gate: Notify,
    pub next_id: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub clear_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn with_stories(stories: Vec<StoryHistoryItem>) -> Self {
        Self {
            stories: Mutex::new(stories),
            ..Self::default()
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.stories.lock().unwrap().iter().map(|s| s.id.clone()).collect()
    }

    /// Yields until `n` saves have reached the backend (and any gate).
    pub async fn wait_for_saves(&self, n: usize) {
        while self.save_calls.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }
}

fn offline() -> PortError {
    PortError::Unavailable("backend offline".to_string())
}

#[async_trait]
impl StoryHistoryRemote for FakeRemote {
    async fn fetch_history(&self, _user_id: &str) -> PortResult<Vec<StoryHistoryItem>> {
        if self.hold_fetch.load(Ordering::SeqCst) {
            self.fetch_gate.notified().await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(self.stories.lock().unwrap().clone())
    }

    async fn save_story(&self, record: NewStoryRecord) -> PortResult<StoryHistoryItem> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_save.load(Ordering::SeqCst) {
            self.save_gate.notified().await;
        }
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(offline());
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut item = StoryHistoryItem::new_local(record.options, record.content);
        item.id = format!("srv-{}", n);
        self.stories.lock().unwrap().insert(0, item.clone());
        Ok(item)
    }

    async fn delete_story(&self, _user_id: &str, id: &str) -> PortResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.stories.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }

    async fn clear_history(&self, _user_id: &str) -> PortResult<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(offline());
        }
        self.stories.lock().unwrap().clear();
        Ok(())
    }
}
