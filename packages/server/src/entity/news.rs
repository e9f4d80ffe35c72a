use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "news")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    /// Blob path of the main image, if any.
    pub image: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub short_description: String,

    pub is_published: bool,
    /// Set once on the first transition to published, preserved thereafter.
    pub published_at: Option<DateTimeUtc>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub content_blocks: HasMany<super::content_block::Entity>,

    #[sea_orm(has_many, via = "category_news")]
    pub categories: HasMany<super::category::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
