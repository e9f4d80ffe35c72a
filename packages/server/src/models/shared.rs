use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 15)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 4)]
    pub total_pages: u64,
}

/// An uploaded binary file collected from a multipart request.
#[derive(Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub filename: Option<String>,
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed title (1-255 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 255 {
        return Err(AppError::Validation(
            "Title must be 1-255 characters".into(),
        ));
    }
    Ok(())
}

/// Validate a trimmed short description (1-1000 Unicode characters).
pub fn validate_short_description(desc: &str) -> Result<(), AppError> {
    let desc = desc.trim();
    if desc.is_empty() || desc.chars().count() > 1000 {
        return Err(AppError::Validation(
            "Short description must be 1-1000 characters".into(),
        ));
    }
    Ok(())
}

/// Parse a multipart boolean field ("true"/"false"/"1"/"0").
pub fn parse_bool_field(value: &str, field: &str) -> Result<bool, AppError> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AppError::field_validation(
            field,
            "must be true, false, 1, or 0",
        )),
    }
}

/// Parse a `category_ids` field: either "1,3,5" or a JSON-ish bare integer list.
///
/// Rejects non-positive ids, duplicates, and more than 10 categories.
pub fn parse_category_ids(value: &str) -> Result<Vec<i32>, AppError> {
    let trimmed = value.trim().trim_start_matches('[').trim_end_matches(']');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for part in trimmed.split(',') {
        let id: i32 = part
            .trim()
            .parse()
            .map_err(|_| AppError::field_validation("category_ids", "must be a list of integers"))?;
        if id <= 0 {
            return Err(AppError::field_validation(
                "category_ids",
                "ids must be positive",
            ));
        }
        if ids.contains(&id) {
            return Err(AppError::field_validation(
                "category_ids",
                format!("duplicate id {id}"),
            ));
        }
        ids.push(id);
    }

    if ids.len() > 10 {
        return Err(AppError::field_validation(
            "category_ids",
            "at most 10 categories",
        ));
    }

    Ok(ids)
}
