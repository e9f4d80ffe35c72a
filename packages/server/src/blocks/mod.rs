//! Content-block reconciliation.
//!
//! An article's body is an ordered list of typed blocks. Clients submit the
//! complete desired list in one request: existing blocks referenced by id are
//! updated, id-less entries become new blocks, and any persisted block absent
//! from the list is deleted. Final `order` values are always rewritten to the
//! contiguous sequence 1..N, regardless of what the client declared.

mod candidate;
mod media;
mod reconcile;

pub use candidate::{
    BlockCandidate, BlockPayload, BlockUploads, ImageSide, RawBlock, decode_candidates,
    parse_block_field,
};
pub use media::{
    AVATAR_NAMESPACE, BLOCK_IMAGE_NAMESPACE, BlockMediaLifecycle, NEWS_IMAGE_NAMESPACE,
};
pub use reconcile::reconcile;
