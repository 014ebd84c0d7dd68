//! Story-list hydration: feed selection, page slicing, and the bounded
//! item fan-out.

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{MAX_CONCURRENT_FETCH, MAX_STORIES_PER_FEED};
use crate::items::ItemFetcher;
use crate::models::{Item, Story};
use crate::{Error, Result};

/// The feeds the list endpoint can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Highest-voted recent stories
    Best,
    /// Front-page ranking
    Top,
    /// Newest submissions
    New,
}

impl Feed {
    /// Canonical lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Top => "top",
            Self::New => "new",
        }
    }

    /// Upstream list path for this feed
    #[must_use]
    pub fn list_path(self) -> &'static str {
        match self {
            Self::Best => "beststories.json",
            Self::Top => "topstories.json",
            Self::New => "newstories.json",
        }
    }
}

impl FromStr for Feed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "best" => Ok(Self::Best),
            "top" => Ok(Self::Top),
            "new" => Ok(Self::New),
            _ => Err(Error::InvalidParam(
                "feed must be one of: best, top, new".to_string(),
            )),
        }
    }
}

/// Hydrate one page of a feed.
///
/// Loads the (cached) id list, slices it by `offset`/`limit`, hydrates the
/// slice under the fetch bound, and projects the survivors in input order.
/// Items upstream no longer knows about are dropped, not errors.
pub async fn stories_page(
    fetcher: &Arc<ItemFetcher>,
    feed: Feed,
    offset: usize,
    limit: usize,
) -> Result<Vec<Story>> {
    let ids = fetcher.feed_ids(feed).await?;
    if offset >= ids.len() {
        return Ok(Vec::new());
    }

    let limit = limit.clamp(1, MAX_STORIES_PER_FEED);
    let end = (offset + limit).min(ids.len());
    let items = hydrate_items(fetcher, &ids[offset..end]).await?;

    Ok(items
        .into_iter()
        .flatten()
        .map(|item| Story::from(item.as_ref()))
        .collect())
}

/// Fetch a batch of items with at most [`MAX_CONCURRENT_FETCH`] in flight.
///
/// Results land in the slot matching their input index, so ordering is
/// preserved no matter how the fetches interleave. The first error aborts
/// every outstanding task (dropping the set cancels them) and is returned;
/// partial successes are discarded with it.
pub async fn hydrate_items(
    fetcher: &Arc<ItemFetcher>,
    ids: &[u64],
) -> Result<Vec<Option<Arc<Item>>>> {
    let gate = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCH));
    let mut tasks = JoinSet::new();

    for (idx, id) in ids.iter().copied().enumerate() {
        let fetcher = Arc::clone(fetcher);
        let gate = Arc::clone(&gate);
        tasks.spawn(async move {
            let _permit = gate
                .acquire_owned()
                .await
                .map_err(|_| Error::Internal("fetch gate closed".to_string()))?;
            Ok::<_, Error>((idx, fetcher.fetch_item(id).await?))
        });
    }

    let mut items: Vec<Option<Arc<Item>>> = vec![None; ids.len()];
    while let Some(joined) = tasks.join_next().await {
        let (idx, item) =
            joined.map_err(|err| Error::Internal(format!("hydration task failed: {err}")))??;
        items[idx] = item;
    }
    Ok(items)
}
