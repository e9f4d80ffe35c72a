use std::collections::{HashMap, HashSet};

use sea_orm::*;

use crate::entity::{content_block, news};
use crate::error::AppError;

use super::candidate::{BlockCandidate, BlockPayload, BlockUploads};
use super::media::{BLOCK_IMAGE_NAMESPACE, BlockMediaLifecycle};

/// Reconcile an article's persisted blocks against the submitted candidate
/// list.
///
/// Runs inside the caller's transaction. Candidates are stable-sorted by
/// their declared order (missing orders sort first, submission order breaks
/// ties) and renumbered 1..N; the declared values themselves are never
/// persisted. Each candidate either updates the existing block its id
/// resolves to or inserts a new row; every persisted block whose id was not
/// touched is deleted together with its image blob. Returns the surviving
/// blocks in final order.
///
/// On error the caller must roll back the transaction and run
/// `media.cleanup()` to delete blobs written during the attempt.
pub async fn reconcile(
    txn: &DatabaseTransaction,
    article: &news::Model,
    candidates: Vec<BlockCandidate>,
    uploads: &mut BlockUploads,
    media: &mut BlockMediaLifecycle<'_>,
) -> Result<Vec<content_block::Model>, AppError> {
    let existing = content_block::Entity::find()
        .filter(content_block::Column::NewsId.eq(article.id))
        .order_by_asc(content_block::Column::Order)
        .all(txn)
        .await?;

    let mut by_id: HashMap<i32, content_block::Model> =
        existing.iter().map(|b| (b.id, b.clone())).collect();

    let candidates = sort_candidates(candidates);

    let mut kept: HashSet<i32> = HashSet::new();
    let mut result = Vec::with_capacity(candidates.len());
    let now = chrono::Utc::now();

    for (position, candidate) in candidates.into_iter().enumerate() {
        let correct_order = position as i32 + 1;

        // Upstream validation rejects duplicate ids, but a re-occurring or
        // unknown id must not crash or double-process: it falls through to
        // the insert path.
        let target = candidate.id.and_then(|id| by_id.remove(&id));

        let model = match target {
            Some(block) => {
                update_block(txn, block, &candidate, correct_order, uploads, media, now).await?
            }
            None => {
                insert_block(txn, article.id, &candidate, correct_order, uploads, media, now)
                    .await?
            }
        };
        kept.insert(model.id);
        result.push(model);
    }

    // Delete-by-omission: whatever was not touched above goes away,
    // its image blob first.
    for block in existing {
        if kept.contains(&block.id) {
            continue;
        }
        media.delete_image(block.image_url.as_deref()).await;
        content_block::Entity::delete_by_id(block.id)
            .exec(txn)
            .await?;
    }

    Ok(result)
}

/// Stable sort by declared order; a missing order sorts as 0, i.e. first.
/// Submission order is preserved between equal keys, which makes the derived
/// sequence deterministic even when declared orders are duplicated.
fn sort_candidates(mut candidates: Vec<BlockCandidate>) -> Vec<BlockCandidate> {
    candidates.sort_by_key(|c| c.order.unwrap_or(0));
    candidates
}

async fn update_block(
    txn: &DatabaseTransaction,
    block: content_block::Model,
    candidate: &BlockCandidate,
    order: i32,
    uploads: &mut BlockUploads,
    media: &mut BlockMediaLifecycle<'_>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<content_block::Model, AppError> {
    let block_type = candidate.payload.block_type();

    let (text_content, image_url) = match &candidate.payload {
        BlockPayload::Text { text } => {
            // Switching to text always releases the bound image, whether or
            // not an upload was attached.
            media.delete_image(block.image_url.as_deref()).await;
            (Some(text.clone()), None)
        }
        BlockPayload::Image => {
            let image = resolve_image(&block, candidate, uploads, media).await?;
            (None, Some(image))
        }
        BlockPayload::TextImage { text, .. } => {
            let image = resolve_image(&block, candidate, uploads, media).await?;
            (Some(text.clone()), Some(image))
        }
    };

    let mut active: content_block::ActiveModel = block.into();
    active.block_type = Set(block_type);
    active.text_content = Set(text_content);
    active.image_url = Set(image_url);
    active.order = Set(order);
    active.updated_at = Set(now);

    Ok(active.update(txn).await?)
}

/// Image for an update-path candidate: a fresh upload replaces (and releases)
/// the previous blob; otherwise the existing binding is kept. A block that
/// never had an image and got no upload cannot satisfy an image-bearing type.
async fn resolve_image(
    block: &content_block::Model,
    candidate: &BlockCandidate,
    uploads: &mut BlockUploads,
    media: &mut BlockMediaLifecycle<'_>,
) -> Result<String, AppError> {
    let field = format!("content_blocks.{}.image", candidate.index);
    match uploads.take(candidate.index) {
        Some(upload) => {
            media.delete_image(block.image_url.as_deref()).await;
            media
                .store_image(&upload, BLOCK_IMAGE_NAMESPACE, &field)
                .await
        }
        None => block
            .image_url
            .clone()
            .ok_or_else(|| AppError::field_validation(field, "image file is required")),
    }
}

async fn insert_block(
    txn: &DatabaseTransaction,
    news_id: i32,
    candidate: &BlockCandidate,
    order: i32,
    uploads: &mut BlockUploads,
    media: &mut BlockMediaLifecycle<'_>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<content_block::Model, AppError> {
    let image_url = if candidate.payload.needs_image() {
        let field = format!("content_blocks.{}.image", candidate.index);
        let upload = uploads
            .take(candidate.index)
            .ok_or_else(|| AppError::field_validation(&field, "image file is required"))?;
        Some(
            media
                .store_image(&upload, BLOCK_IMAGE_NAMESPACE, &field)
                .await?,
        )
    } else {
        None
    };

    let new_block = content_block::ActiveModel {
        news_id: Set(news_id),
        block_type: Set(candidate.payload.block_type()),
        text_content: Set(candidate.payload.text().map(str::to_owned)),
        image_url: Set(image_url),
        order: Set(order),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(new_block.insert(txn).await?)
}
