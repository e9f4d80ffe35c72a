use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a content block within a news article.
///
/// Text-only, image-only, or mixed text with an image floated to one side.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "image")]
    Image,
    #[sea_orm(string_value = "text_image_left")]
    TextImageLeft,
    #[sea_orm(string_value = "text_image_right")]
    TextImageRight,
}

impl BlockType {
    /// Whether this kind carries a text payload.
    pub fn has_text(&self) -> bool {
        !matches!(self, Self::Image)
    }

    /// Whether this kind carries an image.
    pub fn has_image(&self) -> bool {
        !matches!(self, Self::Text)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::TextImageLeft => "text_image_left",
            Self::TextImageRight => "text_image_right",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "text_image_left" => Ok(Self::TextImageLeft),
            "text_image_right" => Ok(Self::TextImageRight),
            _ => Err(()),
        }
    }
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_block")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub block_type: BlockType,
    #[sea_orm(column_type = "Text", nullable)]
    pub text_content: Option<String>,
    /// Blob path of the block image, if any.
    pub image_url: Option<String>,
    /// 1-based display position, contiguous and unique within an article.
    pub order: i32,

    pub news_id: i32,
    #[sea_orm(belongs_to, from = "news_id", to = "id")]
    pub news: HasOne<super::news::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
