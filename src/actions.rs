use crate::metadata::AssetHandle;
use crate::store::AssetStore;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinSet;

/// Side effects the commit stage may request for an asset.
///
/// Implementations must return immediately; the outcome of the request never
/// feeds back into the scan.
pub trait AssetActions: Send + Sync {
    fn mark_favorite(&self, handle: &AssetHandle);
}

/// Marks favorites through the store on the tokio runtime.
pub struct StoreActions {
    store: Arc<dyn AssetStore>,
    runtime: Handle,
    pending: Mutex<JoinSet<()>>,
}

impl StoreActions {
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self {
            store,
            runtime: Handle::current(),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    /// Waits for every favorite toggle requested so far.
    pub async fn flush(&self) {
        let mut pending = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                log::error!("Favourite task failed: {}", e);
            }
        }
    }
}

impl AssetActions for StoreActions {
    fn mark_favorite(&self, handle: &AssetHandle) {
        let store = self.store.clone();
        let handle = handle.clone();
        let task = async move {
            match store.set_favorite(&handle, true).await {
                Ok(()) => log::info!("Asset marked as favourite: {}", handle.id),
                Err(e) => log::warn!("Asset not marked as favourite: {}", e),
            }
        };
        match self.pending.lock() {
            Ok(mut pending) => {
                pending.spawn_on(task, &self.runtime);
            }
            Err(_) => {
                self.runtime.spawn(task);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store_clients::memory::{MemoryAsset, MemoryStore};
    use chrono::Utc;

    /// Records requested favorites without touching a store.
    #[derive(Default)]
    pub(crate) struct RecordingActions {
        pub(crate) marked: Mutex<Vec<String>>,
    }

    impl AssetActions for RecordingActions {
        fn mark_favorite(&self, handle: &AssetHandle) {
            self.marked.lock().unwrap().push(handle.id.clone());
        }
    }

    #[tokio::test]
    async fn store_actions_toggle_through_the_store() {
        let store = Arc::new(MemoryStore::new().with_album(
            "a",
            "A",
            vec![MemoryAsset::new("x", "x.jpg", Utc::now(), vec![1])],
        ));
        let album = store.enumerate_album("a").await.unwrap();
        let actions = StoreActions::new(store.clone());

        actions.mark_favorite(&album.assets[0]);
        actions.flush().await;

        assert_eq!(store.favorite_calls(), vec![("x".to_string(), true)]);
    }

    #[tokio::test]
    async fn failed_toggle_is_contained() {
        let store = Arc::new(
            MemoryStore::new()
                .with_album("a", "A", vec![MemoryAsset::new("x", "x.jpg", Utc::now(), vec![1])])
                .with_failing_favorite("x"),
        );
        let album = store.enumerate_album("a").await.unwrap();
        let actions = StoreActions::new(store.clone());

        actions.mark_favorite(&album.assets[0]);
        actions.flush().await;

        assert_eq!(store.favorite_calls().len(), 1);
    }
}
