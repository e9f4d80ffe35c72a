use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{category, category_translation};
use crate::error::AppError;

/// Locales every category must be translated into.
pub const SUPPORTED_LOCALES: &[&str] = &["uk", "en"];

/// One locale's name/description pair.
#[derive(Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct TranslationBody {
    #[schema(example = "Технології")]
    pub name: String,
    pub description: Option<String>,
}

/// Request body for creating or replacing a category.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCategoryRequest {
    /// Manual ordering position (>= 0).
    #[schema(example = 1)]
    pub position: i32,
    #[serde(default)]
    pub is_active: bool,
    /// Translations keyed by locale; all supported locales are required.
    pub translations: BTreeMap<String, TranslationBody>,
}

/// PATCH body for a category; translations, when present, are replaced whole.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateCategoryRequest {
    pub position: Option<i32>,
    pub is_active: Option<bool>,
    pub translations: Option<BTreeMap<String, TranslationBody>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub position: i32,
    pub is_active: bool,
    /// Translations keyed by locale.
    pub translations: BTreeMap<String, TranslationBody>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryResponse {
    pub fn from_parts(
        category: category::Model,
        translations: Vec<category_translation::Model>,
    ) -> Self {
        let translations = translations
            .into_iter()
            .map(|t| {
                (
                    t.locale,
                    TranslationBody {
                        name: t.name,
                        description: t.description,
                    },
                )
            })
            .collect();
        Self {
            id: category.id,
            position: category.position,
            is_active: category.is_active,
            translations,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

pub fn validate_translations(
    translations: &BTreeMap<String, TranslationBody>,
) -> Result<(), AppError> {
    for locale in SUPPORTED_LOCALES {
        let body = translations.get(*locale).ok_or_else(|| {
            AppError::field_validation(
                format!("translations.{locale}"),
                "translation is required",
            )
        })?;
        let name = body.name.trim();
        if name.is_empty() || name.chars().count() > 255 {
            return Err(AppError::field_validation(
                format!("translations.{locale}.name"),
                "name must be 1-255 characters",
            ));
        }
        if let Some(ref desc) = body.description
            && desc.chars().count() > 1000
        {
            return Err(AppError::field_validation(
                format!("translations.{locale}.description"),
                "description must be at most 1000 characters",
            ));
        }
    }
    for locale in translations.keys() {
        if !SUPPORTED_LOCALES.contains(&locale.as_str()) {
            return Err(AppError::field_validation(
                format!("translations.{locale}"),
                "unsupported locale",
            ));
        }
    }
    Ok(())
}

pub fn validate_create_category(req: &CreateCategoryRequest) -> Result<(), AppError> {
    if req.position < 0 {
        return Err(AppError::Validation("Position must be >= 0".into()));
    }
    validate_translations(&req.translations)
}

pub fn validate_update_category(req: &UpdateCategoryRequest) -> Result<(), AppError> {
    if let Some(position) = req.position
        && position < 0
    {
        return Err(AppError::Validation("Position must be >= 0".into()));
    }
    if let Some(ref translations) = req.translations {
        validate_translations(translations)?;
    }
    Ok(())
}
