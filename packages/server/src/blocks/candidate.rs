use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use crate::entity::content_block::BlockType;
use crate::error::AppError;
use crate::models::news::{MAX_BLOCK_TEXT, MAX_CONTENT_BLOCKS};
use crate::models::shared::ImageUpload;

/// Which side a mixed block's image floats to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSide {
    Left,
    Right,
}

/// Payload of a validated block candidate, keyed by the declared type.
///
/// Each variant statically declares the fields its type requires, so payload
/// coherence is established at decode time instead of being re-checked ad hoc
/// during persistence. The image itself is not part of the payload: it
/// arrives as a separate upload keyed by the candidate's submitted position,
/// or is inherited from the existing block on the update path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockPayload {
    /// `text`: text required, image forbidden.
    Text { text: String },
    /// `image`: image required, text forbidden.
    Image,
    /// `text_image_left` / `text_image_right`: both required.
    TextImage { side: ImageSide, text: String },
}

impl BlockPayload {
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Text { .. } => BlockType::Text,
            Self::Image => BlockType::Image,
            Self::TextImage {
                side: ImageSide::Left,
                ..
            } => BlockType::TextImageLeft,
            Self::TextImage {
                side: ImageSide::Right,
                ..
            } => BlockType::TextImageRight,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::TextImage { text, .. } => Some(text),
            Self::Image => None,
        }
    }

    pub fn needs_image(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }
}

/// One entry of the submitted block list.
#[derive(Clone, Debug)]
pub struct BlockCandidate {
    /// Existing block id (update path) or `None` (insert path).
    pub id: Option<i32>,
    /// Client-declared order. Advisory sort key only, never persisted.
    pub order: Option<i32>,
    /// Position in the submitted list; keys the attached upload.
    pub index: usize,
    pub payload: BlockPayload,
}

/// Raw `content_blocks[<index>][<key>]` values collected from multipart.
#[derive(Default, Clone, Debug)]
pub struct RawBlock {
    pub id: Option<String>,
    pub block_type: Option<String>,
    pub order: Option<String>,
    pub text_content: Option<String>,
}

/// Uploads attached to block candidates, keyed by submitted list position.
#[derive(Default)]
pub struct BlockUploads {
    files: HashMap<usize, ImageUpload>,
}

impl BlockUploads {
    pub fn insert(&mut self, index: usize, upload: ImageUpload) {
        self.files.insert(index, upload);
    }

    pub fn has(&self, index: usize) -> bool {
        self.files.contains_key(&index)
    }

    pub fn take(&mut self, index: usize) -> Option<ImageUpload> {
        self.files.remove(&index)
    }
}

/// Parse a `content_blocks[<index>][<key>]` multipart field name.
pub fn parse_block_field(name: &str) -> Option<(usize, &str)> {
    let rest = name.strip_prefix("content_blocks[")?;
    let (index, rest) = rest.split_once(']')?;
    let index: usize = index.parse().ok()?;
    let key = rest.strip_prefix('[')?.strip_suffix(']')?;
    Some((index, key))
}

/// Decode and validate raw block fields into candidates.
///
/// `raw` is keyed by submitted index; iteration order of the map is the
/// submission order. Field-level failures name the offending field as
/// `content_blocks.<index>.<key>`.
pub fn decode_candidates(
    raw: BTreeMap<usize, RawBlock>,
    uploads: &BlockUploads,
) -> Result<Vec<BlockCandidate>, AppError> {
    if raw.len() > MAX_CONTENT_BLOCKS {
        return Err(AppError::field_validation(
            "content_blocks",
            format!("at most {MAX_CONTENT_BLOCKS} blocks"),
        ));
    }

    let mut seen_ids: HashSet<i32> = HashSet::new();
    let mut candidates = Vec::with_capacity(raw.len());

    for (index, block) in raw {
        let prefix = format!("content_blocks.{index}");

        let type_str = block
            .block_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::field_validation(format!("{prefix}.type"), "block type is required")
            })?;
        let block_type = BlockType::from_str(type_str).map_err(|_| {
            AppError::field_validation(
                format!("{prefix}.type"),
                "must be one of: text, image, text_image_left, text_image_right",
            )
        })?;

        let id = parse_optional_int(block.id.as_deref(), &format!("{prefix}.id"))?;
        let order = parse_optional_int(block.order.as_deref(), &format!("{prefix}.order"))?;

        if let Some(id) = id
            && !seen_ids.insert(id)
        {
            return Err(AppError::field_validation(
                "content_blocks",
                format!("duplicate block id {id}"),
            ));
        }

        let payload = match block_type {
            BlockType::Text => BlockPayload::Text {
                text: required_text(&block, &prefix)?,
            },
            // A text_content sent alongside an image block is dropped, not
            // persisted; the type forbids it.
            BlockType::Image => BlockPayload::Image,
            BlockType::TextImageLeft => BlockPayload::TextImage {
                side: ImageSide::Left,
                text: required_text(&block, &prefix)?,
            },
            BlockType::TextImageRight => BlockPayload::TextImage {
                side: ImageSide::Right,
                text: required_text(&block, &prefix)?,
            },
        };

        // Without an id there is no existing image to inherit, so an
        // image-bearing candidate must carry an upload at its position.
        // With an id, the check needs database state and happens in the
        // engine.
        if payload.needs_image() && id.is_none() && !uploads.has(index) {
            return Err(AppError::field_validation(
                format!("{prefix}.image"),
                "image file is required",
            ));
        }

        candidates.push(BlockCandidate {
            id,
            order,
            index,
            payload,
        });
    }

    Ok(candidates)
}

fn parse_optional_int(value: Option<&str>, field: &str) -> Result<Option<i32>, AppError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<i32>()
            .map(Some)
            .map_err(|_| AppError::field_validation(field, "must be an integer")),
    }
}

fn required_text(block: &RawBlock, prefix: &str) -> Result<String, AppError> {
    let text = block
        .text_content
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::field_validation(
                format!("{prefix}.text_content"),
                "text content is required",
            )
        })?;
    if text.chars().count() > MAX_BLOCK_TEXT {
        return Err(AppError::field_validation(
            format!("{prefix}.text_content"),
            format!("at most {MAX_BLOCK_TEXT} characters"),
        ));
    }
    Ok(text.to_string())
}
