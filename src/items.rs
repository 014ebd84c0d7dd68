//! Cache-through item fetcher.
//!
//! Every item and feed-list read funnels through here; the cache is the
//! process-wide coordination point. A `null` answer from upstream is
//! cached as a negative entry so repeated lookups of dead ids stay local.
//! There is no single-flight: a briefly racing duplicate fetch is
//! tolerated because upstream is idempotent and writes are
//! last-writer-wins.

use std::sync::Arc;

use crate::cache::{CacheValue, TtlLruCache};
use crate::config::{ITEM_CACHE_TTL, LIST_CACHE_TTL, MAX_STORIES_PER_FEED};
use crate::models::Item;
use crate::stories::Feed;
use crate::upstream::Upstream;
use crate::{Error, Result};

/// Item fetcher shared by the list, item, and thread paths
pub struct ItemFetcher {
    cache: Arc<TtlLruCache>,
    upstream: Upstream,
}

impl ItemFetcher {
    /// Wire the fetcher to its cache and upstream client
    pub fn new(cache: Arc<TtlLruCache>, upstream: Upstream) -> Self {
        Self { cache, upstream }
    }

    /// Fetch one item by id, consulting the cache first.
    ///
    /// Returns `Ok(None)` when upstream reports the id as absent — either
    /// live (`null` body) or remembered through a negative cache entry.
    pub async fn fetch_item(&self, id: u64) -> Result<Option<Arc<Item>>> {
        if id == 0 {
            return Err(Error::InvalidParam(format!("invalid item id: {id}")));
        }

        let key = format!("item:{id}");
        match self.cache.get(&key) {
            Some(CacheValue::Item(item)) => return Ok(Some(item)),
            Some(CacheValue::Missing) => return Ok(None),
            _ => {}
        }

        let raw = self.upstream.get_json_bytes(&format!("item/{id}.json")).await?;
        let trimmed = raw.trim_ascii();
        if trimmed.is_empty() || trimmed == b"null" {
            self.cache.set(key, CacheValue::Missing, ITEM_CACHE_TTL);
            return Ok(None);
        }

        let item: Arc<Item> = Arc::new(serde_json::from_slice(trimmed)?);
        self.cache
            .set(key, CacheValue::Item(Arc::clone(&item)), ITEM_CACHE_TTL);
        Ok(Some(item))
    }

    /// Fetch the id list for a feed, consulting the cache first. The list
    /// is capped before caching so one feed cannot flood the entry budget.
    pub async fn feed_ids(&self, feed: Feed) -> Result<Arc<[u64]>> {
        let key = format!("list:{}", feed.as_str());
        if let Some(CacheValue::Ids(ids)) = self.cache.get(&key) {
            return Ok(ids);
        }

        let raw = self.upstream.get_json_bytes(feed.list_path()).await?;
        let mut ids: Vec<u64> = serde_json::from_slice(&raw)?;
        ids.truncate(MAX_STORIES_PER_FEED);

        let ids: Arc<[u64]> = ids.into();
        self.cache
            .set(key, CacheValue::Ids(Arc::clone(&ids)), LIST_CACHE_TTL);
        Ok(ids)
    }
}
