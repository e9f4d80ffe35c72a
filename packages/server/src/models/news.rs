use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{content_block, news};
use crate::models::shared::Pagination;
use crate::models::user::UserResponse;

pub use crate::entity::content_block::BlockType;

/// Maximum number of content blocks accepted per article.
pub const MAX_CONTENT_BLOCKS: usize = 50;

/// Maximum length of a block's text content.
pub const MAX_BLOCK_TEXT: usize = 5000;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContentBlockResponse {
    pub id: i32,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub text_content: Option<String>,
    /// Blob path of the block image, served under `/storage/{path}`.
    pub image_url: Option<String>,
    /// 1-based display position, contiguous within the article.
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<content_block::Model> for ContentBlockResponse {
    fn from(m: content_block::Model) -> Self {
        Self {
            id: m.id,
            block_type: m.block_type,
            text_content: m.text_content,
            image_url: m.image_url,
            order: m.order,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Brief category view embedded in news responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct NewsCategoryBrief {
    pub id: i32,
    pub position: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct NewsResponse {
    pub id: i32,
    pub title: String,
    /// Blob path of the main image, if any.
    pub image: Option<String>,
    pub short_description: String,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub user: UserResponse,
    /// Blocks in display order.
    pub content_blocks: Vec<ContentBlockResponse>,
    pub categories: Vec<NewsCategoryBrief>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewsResponse {
    pub fn from_parts(
        news: news::Model,
        user: crate::entity::user::Model,
        blocks: Vec<content_block::Model>,
        categories: Vec<crate::entity::category::Model>,
    ) -> Self {
        Self {
            id: news.id,
            title: news.title,
            image: news.image,
            short_description: news.short_description,
            is_published: news.is_published,
            published_at: news.published_at,
            user: user.into(),
            content_blocks: blocks.into_iter().map(Into::into).collect(),
            categories: categories
                .into_iter()
                .map(|c| NewsCategoryBrief {
                    id: c.id,
                    position: c.position,
                })
                .collect(),
            created_at: news.created_at,
            updated_at: news.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct NewsListResponse {
    pub data: Vec<NewsResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct NewsListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive search across title and short description.
    pub search: Option<String>,
    pub is_published: Option<bool>,
    /// One of: id, title, created_at, updated_at, published_at.
    pub sort_by: Option<String>,
    /// "asc" or "desc" (default).
    pub sort_order: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct PublicNewsQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub author_id: Option<i32>,
    /// Inclusive lower bound on the publication date (YYYY-MM-DD).
    pub date_from: Option<String>,
    /// Inclusive upper bound on the publication date (YYYY-MM-DD).
    pub date_to: Option<String>,
}
