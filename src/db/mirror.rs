use tokio::sync::watch;

use crate::domain::types::BanMap;

/// In-memory snapshot of the persisted ban map, replaced wholesale on every
/// change-feed delivery. Business logic never mutates it; all writes go
/// through [`BanStore`](super::BanStore) commits and arrive back here via
/// the feed, which keeps independent document contexts convergent.
#[derive(Clone)]
pub struct BanMirror {
    feed: watch::Receiver<BanMap>,
}

impl BanMirror {
    pub fn new(feed: watch::Receiver<BanMap>) -> Self {
        Self { feed }
    }

    /// The latest whole ban map.
    pub fn current(&self) -> BanMap {
        self.feed.borrow().clone()
    }

    pub fn is_banned(&self, location: &str) -> bool {
        self.feed.borrow().contains_key(location)
    }

    /// Resolves when the snapshot has been replaced. If the feed closes the
    /// future stays pending; a closed feed means the owning store is gone
    /// and no further change can arrive.
    pub async fn changed(&mut self) {
        if self.feed.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}
