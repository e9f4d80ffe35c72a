use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{category, category_news, category_translation};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::category::{
    CategoryResponse, CreateCategoryRequest, TranslationBody, UpdateCategoryRequest,
    validate_create_category, validate_update_category,
};
use crate::state::AppState;

async fn find_category<C: ConnectionTrait>(db: &C, id: i32) -> Result<category::Model, AppError> {
    category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))
}

/// Replace a category's translation rows with the given set.
async fn replace_translations<C: ConnectionTrait>(
    db: &C,
    category_id: i32,
    translations: &std::collections::BTreeMap<String, TranslationBody>,
) -> Result<(), AppError> {
    category_translation::Entity::delete_many()
        .filter(category_translation::Column::CategoryId.eq(category_id))
        .exec(db)
        .await?;

    for (locale, body) in translations {
        let row = category_translation::ActiveModel {
            category_id: Set(category_id),
            locale: Set(locale.clone()),
            name: Set(body.name.trim().to_string()),
            description: Set(body.description.as_ref().map(|d| d.trim().to_string())),
        };
        row.insert(db).await?;
    }

    Ok(())
}

async fn load_category_response<C: ConnectionTrait>(
    db: &C,
    model: category::Model,
) -> Result<CategoryResponse, AppError> {
    let translations = category_translation::Entity::find()
        .filter(category_translation::Column::CategoryId.eq(model.id))
        .all(db)
        .await?;
    Ok(CategoryResponse::from_parts(model, translations))
}

/// Batch-load translations for a category listing.
async fn load_category_responses<C: ConnectionTrait>(
    db: &C,
    items: Vec<category::Model>,
) -> Result<Vec<CategoryResponse>, AppError> {
    let ids: Vec<i32> = items.iter().map(|c| c.id).collect();
    let mut by_category: std::collections::HashMap<i32, Vec<category_translation::Model>> =
        std::collections::HashMap::new();
    let translations = category_translation::Entity::find()
        .filter(category_translation::Column::CategoryId.is_in(ids))
        .all(db)
        .await?;
    for t in translations {
        by_category.entry(t.category_id).or_default().push(t);
    }

    Ok(items
        .into_iter()
        .map(|c| {
            let translations = by_category.remove(&c.id).unwrap_or_default();
            CategoryResponse::from_parts(c, translations)
        })
        .collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Categories",
    operation_id = "listCategories",
    summary = "List all categories",
    description = "All categories (active and inactive) ordered by position, with \
        translations. Requires `category:manage` permission.",
    responses(
        (status = 200, description = "List of categories", body = Vec<CategoryResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_categories(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    auth_user.require_permission("category:manage")?;

    let items = category::Entity::find()
        .order_by_asc(category::Column::Position)
        .all(&state.db)
        .await?;

    Ok(Json(load_category_responses(&state.db, items).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/public/categories",
    tag = "Public",
    operation_id = "listPublicCategories",
    summary = "List active categories",
    description = "Active categories ordered by position, with translations.",
    responses(
        (status = 200, description = "List of active categories", body = Vec<CategoryResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_public_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let items = category::Entity::find()
        .filter(category::Column::IsActive.eq(true))
        .order_by_asc(category::Column::Position)
        .all(&state.db)
        .await?;

    Ok(Json(load_category_responses(&state.db, items).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "Categories",
    operation_id = "createCategory",
    summary = "Create a category",
    description = "Creates a category with translations for every supported locale \
        (uk, en). Requires `category:manage` permission.",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("category:manage")?;
    validate_create_category(&payload)?;

    let txn = state.db.begin().await?;

    let now = chrono::Utc::now();
    let new_category = category::ActiveModel {
        position: Set(payload.position),
        is_active: Set(payload.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = new_category.insert(&txn).await?;

    replace_translations(&txn, created.id, &payload.translations).await?;
    txn.commit().await?;

    let response = load_category_response(&state.db, created).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/categories/{id}",
    tag = "Categories",
    operation_id = "updateCategory",
    summary = "Update a category",
    description = "PATCH semantics for `position` and `is_active`; `translations`, \
        when present, replace the whole translation set. Requires `category:manage` \
        permission.",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    auth_user.require_permission("category:manage")?;
    validate_update_category(&payload)?;

    let txn = state.db.begin().await?;
    let existing = find_category(&txn, id).await?;
    let mut active: category::ActiveModel = existing.into();

    if let Some(position) = payload.position {
        active.position = Set(position);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(&txn).await?;

    if let Some(ref translations) = payload.translations {
        replace_translations(&txn, updated.id, translations).await?;
    }

    txn.commit().await?;

    Ok(Json(load_category_response(&state.db, updated).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    tag = "Categories",
    operation_id = "deleteCategory",
    summary = "Delete a category",
    description = "Permanently deletes a category and its translations. Returns 409 \
        CONFLICT while news are attached to it. Requires `category:manage` permission.",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Category has attached news (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("category:manage")?;

    let txn = state.db.begin().await?;
    let existing = find_category(&txn, id).await?;

    let attached = category_news::Entity::find()
        .filter(category_news::Column::CategoryId.eq(existing.id))
        .count(&txn)
        .await?;
    if attached > 0 {
        return Err(AppError::Conflict(
            "Cannot delete category with attached news".into(),
        ));
    }

    category_translation::Entity::delete_many()
        .filter(category_translation::Column::CategoryId.eq(existing.id))
        .exec(&txn)
        .await?;
    category::Entity::delete_by_id(existing.id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
