//! Manual classification of posts whose kind could not be decided during the
//! crawl.

use feedscan_core::{record::PostKind, store::DedupStore};
use tracing::info;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upgrade {
  Changed { from: PostKind },
  Unchanged,
}

/// Set `post_id`'s kind to `kind`. A kind only ever moves away from
/// [`PostKind::Unknown`]; reclassifying a concrete kind is refused.
pub async fn upgrade_post_kind<S: DedupStore>(
  store: &S,
  post_id: i64,
  kind: PostKind,
) -> Result<Upgrade> {
  let post = store
    .get_post(post_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::PostNotFound(post_id))?;

  if post.kind == kind {
    return Ok(Upgrade::Unchanged);
  }
  if !post.kind.can_become(kind) {
    return Err(
      feedscan_core::Error::KindDowngrade { post_id, from: post.kind, to: kind }.into(),
    );
  }

  store
    .update_post_kind(post_id, kind)
    .await
    .map_err(Error::store)?;
  info!(post_id, from = %post.kind, to = %kind, "post reclassified");
  Ok(Upgrade::Changed { from: post.kind })
}
