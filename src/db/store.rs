use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqlitePool};
use tokio::sync::watch;

use crate::domain::{
    location::paired_forms,
    types::{AllowMap, BanMap, EpochMillis},
};

const KEY_BANLIST: &str = "banlist";
const KEY_ALLOWLIST: &str = "allowlist";
const KEY_LAST_FETCH: &str = "lastBanFetch";

/// Persisted ban/allow state: three whole-value keys over SQLite.
///
/// Every mutation is a whole-map read-modify-write inside one transaction;
/// two writers racing from independent contexts are last-write-wins
/// wholesale, and the next refresh cycle re-adds whatever got lost. After
/// each commit that touches the ban map, the new whole map is published on
/// the change feed.
#[derive(Clone)]
pub struct BanStore {
    pool: SqlitePool,
    feed: watch::Sender<BanMap>,
}

impl BanStore {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let initial = read_map(&pool, KEY_BANLIST).await?;
        let (feed, _) = watch::channel(initial);
        Ok(Self { pool, feed })
    }

    /// Change-notification feed carrying the new whole ban map after every
    /// commit that changes it.
    pub fn subscribe(&self) -> watch::Receiver<BanMap> {
        self.feed.subscribe()
    }

    pub async fn ban_map(&self) -> Result<BanMap> {
        read_map(&self.pool, KEY_BANLIST).await
    }

    pub async fn allow_map(&self) -> Result<AllowMap> {
        read_map(&self.pool, KEY_ALLOWLIST).await
    }

    pub async fn last_refresh(&self) -> Result<Option<EpochMillis>> {
        Ok(read_value(&self.pool, KEY_LAST_FETCH)
            .await?
            .and_then(|raw| raw.parse::<EpochMillis>().ok()))
    }

    /// Adds every location not present in the allow map, leaving existing
    /// entries untouched, and stamps the refresh time in the same commit.
    /// Returns the merged map.
    pub async fn merge_banned<I>(&self, locations: I, refreshed_at: DateTime<Utc>) -> Result<BanMap>
    where
        I: IntoIterator<Item = String>,
    {
        let mut tx = self.pool.begin().await?;
        let mut banlist = read_map(&mut *tx, KEY_BANLIST).await?;
        let allowlist = read_map(&mut *tx, KEY_ALLOWLIST).await?;
        for location in locations {
            if !allowlist.contains_key(&location) {
                banlist.insert(location, true);
            }
        }
        write_map(&mut *tx, KEY_BANLIST, &banlist).await?;
        write_value(&mut *tx, KEY_LAST_FETCH, &refreshed_at.timestamp_millis().to_string()).await?;
        tx.commit().await?;

        self.feed.send_replace(banlist.clone());
        Ok(banlist)
    }

    /// Bans both paired forms of a location and removes any allow entries
    /// for them. A direct ban wins over a prior explicit allow.
    pub async fn ban(&self, location: &str) -> Result<()> {
        let (full, thumb) = paired_forms(location);
        let mut tx = self.pool.begin().await?;
        let mut banlist = read_map(&mut *tx, KEY_BANLIST).await?;
        let mut allowlist = read_map(&mut *tx, KEY_ALLOWLIST).await?;
        for form in [&full, &thumb] {
            banlist.insert(form.clone(), true);
            allowlist.remove(form.as_str());
        }
        write_map(&mut *tx, KEY_BANLIST, &banlist).await?;
        write_map(&mut *tx, KEY_ALLOWLIST, &allowlist).await?;
        tx.commit().await?;

        self.feed.send_replace(banlist);
        Ok(())
    }

    /// Exempts both paired forms, removing them from the ban map. Exempted
    /// locations survive later bulk merges until explicitly banned again.
    pub async fn allow(&self, location: &str) -> Result<()> {
        let (full, thumb) = paired_forms(location);
        let mut tx = self.pool.begin().await?;
        let mut banlist = read_map(&mut *tx, KEY_BANLIST).await?;
        let mut allowlist = read_map(&mut *tx, KEY_ALLOWLIST).await?;
        for form in [&full, &thumb] {
            allowlist.insert(form.clone(), true);
            banlist.remove(form.as_str());
        }
        write_map(&mut *tx, KEY_BANLIST, &banlist).await?;
        write_map(&mut *tx, KEY_ALLOWLIST, &allowlist).await?;
        tx.commit().await?;

        self.feed.send_replace(banlist);
        Ok(())
    }
}

async fn read_value<'e, E>(executor: E, key: &str) -> Result<Option<String>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM guard_state WHERE key = ?1")
        .bind(key)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|(value,)| value))
}

async fn read_map<'e, E>(executor: E, key: &str) -> Result<BanMap>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    match read_value(executor, key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("corrupt persisted map under key {key}")),
        None => Ok(BanMap::new()),
    }
}

async fn write_value<'e, E>(executor: E, key: &str, value: &str) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT OR REPLACE INTO guard_state (key, value) VALUES (?1, ?2)")
        .bind(key)
        .bind(value)
        .execute(executor)
        .await?;
    Ok(())
}

async fn write_map<'e, E>(executor: E, key: &str, map: &BanMap) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    write_value(executor, key, &serde_json::to_string(map)?).await
}
