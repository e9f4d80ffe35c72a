use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Manual ordering position in category listings.
    pub position: i32,
    pub is_active: bool,

    #[sea_orm(has_many)]
    pub translations: HasMany<super::category_translation::Entity>,

    #[sea_orm(has_many, via = "category_news")]
    pub news: HasMany<super::news::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
