//! Recursive comment-forest hydration.
//!
//! The tree is walked depth-first with structural concurrency: one
//! semaphore of capacity [`MAX_CONCURRENT_FETCH`] is shared across every
//! recursion level of a request, so total in-flight fetches stay bounded
//! regardless of tree shape. The permit is released before descending into
//! children — a deep branch holding its slot would otherwise starve its
//! siblings.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::MAX_CONCURRENT_FETCH;
use crate::items::ItemFetcher;
use crate::models::CommentNode;
use crate::security::sanitize_comment_html;
use crate::{Error, Result};

/// Hydrate the comment forest under a story's `kids`.
///
/// Sibling order matches upstream at every level. Children that upstream
/// dropped, or whose type is not "comment", are compacted away rather than
/// surfaced as holes. The first error cancels the whole request.
pub async fn comment_forest(
    fetcher: &Arc<ItemFetcher>,
    kid_ids: &[u64],
) -> Result<Vec<CommentNode>> {
    if kid_ids.is_empty() {
        return Ok(Vec::new());
    }
    let gate = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCH));
    hydrate_siblings(fetcher, kid_ids.to_vec(), gate).await
}

/// Hydrate one sibling group in parallel, preserving input order and
/// compacting nil results. On the first child error the set is dropped,
/// which aborts the remaining children and, transitively, their subtrees.
async fn hydrate_siblings(
    fetcher: &Arc<ItemFetcher>,
    ids: Vec<u64>,
    gate: Arc<Semaphore>,
) -> Result<Vec<CommentNode>> {
    let mut tasks = JoinSet::new();
    for (idx, id) in ids.iter().copied().enumerate() {
        let fetcher = Arc::clone(fetcher);
        let gate = Arc::clone(&gate);
        tasks.spawn(async move { Ok::<_, Error>((idx, comment_node(fetcher, id, gate).await?)) });
    }

    let mut slots: Vec<Option<CommentNode>> = (0..ids.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (idx, node) =
            joined.map_err(|err| Error::Internal(format!("comment task failed: {err}")))??;
        slots[idx] = node;
    }
    Ok(slots.into_iter().flatten().collect())
}

/// Hydrate a single comment and, recursively, its subtree.
///
/// Boxed because the future type is self-referential through the sibling
/// fan-out. Returns `Ok(None)` for absent items and for items that are not
/// comments; the caller compacts those away.
fn comment_node(
    fetcher: Arc<ItemFetcher>,
    id: u64,
    gate: Arc<Semaphore>,
) -> BoxFuture<'static, Result<Option<CommentNode>>> {
    Box::pin(async move {
        let permit = Arc::clone(&gate)
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("fetch gate closed".to_string()))?;
        let fetched = fetcher.fetch_item(id).await;
        // Children acquire their own slots; holding this one across the
        // descent would let a deep branch starve its siblings.
        drop(permit);

        let Some(item) = fetched? else {
            return Ok(None);
        };
        if item.kind != "comment" {
            return Ok(None);
        }

        let kids = if item.kids.is_empty() {
            Vec::new()
        } else {
            hydrate_siblings(&fetcher, item.kids.clone(), gate).await?
        };

        Ok(Some(CommentNode {
            id: item.id,
            by: item.by.clone(),
            time: item.time,
            text: sanitize_comment_html(&item.text),
            kids,
            kind: item.kind.clone(),
            deleted: item.deleted,
            dead: item.dead,
        }))
    })
}
