use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::{
    db::BanStore,
    domain::{is_cover_location, paired_forms, types::BanMap},
};

use super::authority::BanAuthority;

/// TTL-gated synchronization of the ban store with the remote authority.
pub struct Syncer {
    store: BanStore,
    authority: Arc<dyn BanAuthority>,
    fetch_ttl: Duration,
}

impl Syncer {
    pub fn new(store: BanStore, authority: Arc<dyn BanAuthority>, fetch_ttl: Duration) -> Self {
        Self {
            store,
            authority,
            fetch_ttl,
        }
    }

    /// Refreshes the ban map from the remote authority when the cached copy
    /// has outlived the TTL; within the window the current map is returned
    /// with no network access. A failed or malformed fetch keeps the store
    /// untouched (a stale cache beats blocking) and the next cycle
    /// retries. Concurrent refreshes are harmless idempotent merges.
    pub async fn refresh(&self) -> Result<BanMap> {
        self.refresh_at(Utc::now()).await
    }

    pub(crate) async fn refresh_at(&self, now: DateTime<Utc>) -> Result<BanMap> {
        let banlist = self.store.ban_map().await?;
        let last = self.store.last_refresh().await?;
        let ttl_ms = self.fetch_ttl.as_millis() as i64;
        let stale = last.map_or(true, |ts| now.timestamp_millis().saturating_sub(ts) > ttl_ms);
        if !stale {
            return Ok(banlist);
        }

        let urls = match self.authority.fetch_banned().await {
            Ok(urls) => urls,
            Err(err) => {
                tracing::warn!(
                    target: "sync",
                    error = %err,
                    "banlist refresh aborted; keeping cached state"
                );
                return Ok(banlist);
            }
        };

        let expanded = urls.iter().flat_map(|raw| {
            let (full, thumb) = paired_forms(raw);
            [full, thumb]
        });
        let merged = self.store.merge_banned(expanded, now).await?;
        tracing::info!(target: "sync", total = merged.len(), "banlist refreshed");
        Ok(merged)
    }

    /// Reports a new ban to the authority, fire-and-forget. Non-cover
    /// locations are never reported. Failures follow the log-and-discard
    /// policy: recorded at debug for diagnostics, never surfaced.
    pub fn report_banned(&self, location: &str) {
        if !is_cover_location(location) {
            return;
        }
        let fut = self.authority.report_ban(location);
        let location = location.to_string();
        tokio::spawn(async move {
            if let Err(err) = fut.await {
                tracing::debug!(
                    target: "sync",
                    error = %err,
                    location = %location,
                    "ban report dropped"
                );
            }
        });
    }
}
