//! The set of tracked channel IDs.

use rustc_hash::FxHashSet;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

/// Insertion-ordered, duplicate-free list of channel IDs.
#[derive(Debug, Default, Clone)]
pub struct Channels {
    ids: Vec<String>,
    seen: FxHashSet<String>,
}

impl Channels {
    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    fn insert(&mut self, id: String) -> bool {
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.ids.push(id);
        true
    }
}

/// Registry of channels polled by the monitor.
///
/// Guarded by an async reader/writer lock: check cycles hold a read guard for
/// the whole query, so `add` waits for an in-flight (possibly rate-limited)
/// query to finish.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: RwLock<Channels>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every ID not already tracked, keeping first-seen order.
    ///
    /// Returns how many IDs were actually added.
    pub async fn add<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        let mut channels = self.channels.write().await;

        let mut added = 0;
        for id in ids {
            if channels.insert(id) {
                added += 1;
            }
        }

        debug!(added, total = channels.len(), "channels registered");
        added
    }

    /// Read guard over the current channels.
    pub async fn read(&self) -> RwLockReadGuard<'_, Channels> {
        self.channels.read().await
    }

    /// Point-in-time copy of the tracked IDs.
    pub async fn snapshot(&self) -> Vec<String> {
        self.channels.read().await.as_slice().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.channels.read().await.contains(id)
    }
}
