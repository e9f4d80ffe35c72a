use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::blocks::AVATAR_NAMESPACE;
use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::ImageUpload;
use crate::models::user::{
    AvatarResponse, UpdateProfileRequest, UserResponse, validate_update_profile,
};
use crate::state::AppState;
use crate::utils::filename::validate_image_upload;
use crate::utils::hash;

/// Body limit layer for avatar uploads (4MB; the image itself is capped at 2MB).
pub fn avatar_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(4 * 1024 * 1024)
}

async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "Profile",
    operation_id = "getProfile",
    summary = "Get the current user's profile",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission("profile:update")?;
    let user = find_user(&state.db, auth_user.user_id).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/profile",
    tag = "Profile",
    operation_id = "updateProfile",
    summary = "Update the current user's profile",
    description = "PATCH semantics — only provided fields are modified. `bio` supports \
        three-state updates: omit to keep, null to clear, string to set. A new password \
        is re-hashed.",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission("profile:update")?;
    validate_update_profile(&payload)?;

    let txn = state.db.begin().await?;
    let existing = find_user(&txn, auth_user.user_id).await?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(ref email) = payload.email {
        active.email = Set(email.trim().to_lowercase());
    }
    match payload.bio {
        Some(Some(bio)) => active.bio = Set(Some(bio.trim().to_string())),
        Some(None) => active.bio = Set(None),
        None => {}
    }
    if let Some(ref password) = payload.password {
        let hashed = hash::hash_password(password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
        active.password = Set(hashed);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::EmailTaken,
        _ => AppError::from(e),
    })?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/profile/avatar",
    tag = "Profile",
    operation_id = "uploadAvatar",
    summary = "Upload or replace the current user's avatar",
    description = "Multipart upload with an `avatar` image field (jpeg/png, max 2MB). \
        Replaces and deletes the previous avatar blob.",
    request_body(content_type = "multipart/form-data", description = "Avatar image upload"),
    responses(
        (status = 200, description = "Avatar stored", body = AvatarResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_avatar(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    auth_user.require_permission("avatar:manage")?;

    let mut upload: Option<ImageUpload> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("avatar") {
            let filename = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read avatar: {e}")))?;
            upload = Some(ImageUpload {
                data: data.to_vec(),
                filename,
            });
            break;
        }
    }

    let upload = upload.ok_or_else(|| AppError::Validation("Missing 'avatar' field".into()))?;
    if upload.data.len() as u64 > state.config.storage.max_upload_size {
        return Err(AppError::field_validation(
            "avatar",
            format!(
                "file exceeds maximum size of {} bytes",
                state.config.storage.max_upload_size
            ),
        ));
    }
    let ext = validate_image_upload(upload.filename.as_deref(), &upload.data)
        .map_err(|msg| AppError::field_validation("avatar", msg))?;

    let user = find_user(&state.db, auth_user.user_id).await?;
    let old_avatar = user.avatar.clone();

    let path = state
        .blob_store
        .store(&upload.data, AVATAR_NAMESPACE, Some(&ext))
        .await?;

    let mut active: user::ActiveModel = user.into();
    active.avatar = Set(Some(path.clone()));
    active.updated_at = Set(chrono::Utc::now());
    if let Err(e) = active.update(&state.db).await {
        // The row still points at the old avatar; drop the orphaned upload.
        if let Err(del) = state.blob_store.delete(&path).await {
            tracing::warn!("Failed to delete orphaned avatar '{}': {}", path, del);
        }
        return Err(e.into());
    }

    if let Some(old) = old_avatar
        && let Err(e) = state.blob_store.delete(&old).await
    {
        tracing::warn!("Failed to delete previous avatar '{}': {}", old, e);
    }

    Ok(Json(AvatarResponse { avatar: path }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/profile/avatar",
    tag = "Profile",
    operation_id = "deleteAvatar",
    summary = "Delete the current user's avatar",
    responses(
        (status = 204, description = "Avatar deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_avatar(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("avatar:manage")?;

    let user = find_user(&state.db, auth_user.user_id).await?;
    let old_avatar = user.avatar.clone();

    let mut active: user::ActiveModel = user.into();
    active.avatar = Set(None);
    active.updated_at = Set(chrono::Utc::now());
    active.update(&state.db).await?;

    if let Some(old) = old_avatar
        && let Err(e) = state.blob_store.delete(&old).await
    {
        tracing::warn!("Failed to delete avatar '{}': {}", old, e);
    }

    Ok(StatusCode::NO_CONTENT)
}
