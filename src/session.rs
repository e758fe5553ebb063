//! # Session Storage Module
//!
//! Per-chat state with an idle time-to-live. Entries untouched for longer
//! than the TTL are invisible to reads and are removed by a periodic sweep,
//! so abandoned conversations do not accumulate for the process lifetime.

use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use teloxide::dispatching::dialogue::Storage;
use teloxide::types::ChatId;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

struct Entry<V> {
    value: V,
    touched: Instant,
}

/// Map whose entries expire after `ttl` without writes
pub struct ExpiringMap<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live value for `key`; expired entries are dropped on the way
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.touched.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or replace, restarting the idle timer
    pub async fn insert(&self, key: K, value: V) {
        self.entries.lock().await.insert(
            key,
            Entry {
                value,
                touched: Instant::now(),
            },
        );
    }

    /// Remove and return the live value
    pub async fn remove(&self, key: &K) -> Option<V> {
        let entry = self.entries.lock().await.remove(key)?;
        (entry.touched.elapsed() < self.ttl).then_some(entry.value)
    }

    /// Modify the live value in place (starting from `V::default()` when
    /// absent or expired) and return the result
    pub async fn update<F>(&self, key: K, f: F) -> V
    where
        V: Default,
        F: FnOnce(&mut V),
    {
        let mut entries = self.entries.lock().await;
        let ttl = self.ttl;
        let entry = entries.entry(key).or_insert_with(|| Entry {
            value: V::default(),
            touched: Instant::now(),
        });
        if entry.touched.elapsed() >= ttl {
            entry.value = V::default();
        }
        f(&mut entry.value);
        entry.touched = Instant::now();
        entry.value.clone()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.touched.elapsed() < ttl);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until swept
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sweep every `interval` on a background task
    pub fn spawn_sweeper(self: &Arc<Self>, label: &'static str, interval: Duration) -> JoinHandle<()>
    where
        K: Sync,
        V: Sync,
    {
        let map = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = map.sweep().await;
                if removed > 0 {
                    tracing::info!(sessions = label, removed, "Swept expired sessions");
                }
            }
        })
    }
}

/// Dialogue storage with idle expiry, keyed by chat
pub struct SessionStorage<D> {
    sessions: Arc<ExpiringMap<ChatId, D>>,
}

impl<D> SessionStorage<D>
where
    D: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: Arc::new(ExpiringMap::new(ttl)),
        })
    }

    /// Underlying map, used by the sweeper and by tests
    pub fn sessions(&self) -> &Arc<ExpiringMap<ChatId, D>> {
        &self.sessions
    }

    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        self.sessions.spawn_sweeper("dialogue", interval)
    }
}

impl<D> Storage<D> for SessionStorage<D>
where
    D: Clone + Send + Sync + 'static,
{
    type Error = Infallible;

    fn remove_dialogue(self: Arc<Self>, chat_id: ChatId) -> BoxFuture<'static, Result<(), Self::Error>>
    where
        D: Send + 'static,
    {
        Box::pin(async move {
            self.sessions.remove(&chat_id).await;
            Ok(())
        })
    }

    fn update_dialogue(
        self: Arc<Self>,
        chat_id: ChatId,
        dialogue: D,
    ) -> BoxFuture<'static, Result<(), Self::Error>>
    where
        D: Send + 'static,
    {
        Box::pin(async move {
            self.sessions.insert(chat_id, dialogue).await;
            Ok(())
        })
    }

    fn get_dialogue(self: Arc<Self>, chat_id: ChatId) -> BoxFuture<'static, Result<Option<D>, Self::Error>> {
        Box::pin(async move { Ok(self.sessions.get(&chat_id).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let map: ExpiringMap<u64, String> = ExpiringMap::new(Duration::from_millis(30));
        map.insert(1, "a".to_string()).await;
        assert_eq!(map.get(&1).await, Some("a".to_string()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(map.get(&1).await, None);
        assert!(map.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let map: ExpiringMap<u64, u32> = ExpiringMap::new(Duration::from_millis(40));
        map.insert(1, 1).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        map.insert(2, 2).await;

        assert_eq!(map.sweep().await, 1);
        assert_eq!(map.len().await, 1);
        assert_eq!(map.get(&2).await, Some(2));
    }

    #[tokio::test]
    async fn test_update_starts_from_default() {
        let map: ExpiringMap<u64, Vec<u32>> = ExpiringMap::new(Duration::from_secs(60));
        map.update(1, |v| v.push(1)).await;
        let value = map.update(1, |v| v.push(2)).await;
        assert_eq!(value, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_dialogue_storage_round_trip() {
        let storage: Arc<SessionStorage<u32>> = SessionStorage::new(Duration::from_secs(60));
        let chat = ChatId(5);

        Arc::clone(&storage).update_dialogue(chat, 3).await.unwrap();
        assert_eq!(Arc::clone(&storage).get_dialogue(chat).await.unwrap(), Some(3));

        Arc::clone(&storage).remove_dialogue(chat).await.unwrap();
        assert_eq!(Arc::clone(&storage).get_dialogue(chat).await.unwrap(), None);

        // Removing a missing dialogue is not an error
        Arc::clone(&storage).remove_dialogue(chat).await.unwrap();
    }
}
