use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;
use crate::models::auth::{validate_email, validate_password};
use crate::models::shared::{Pagination, double_option};

/// Public view of a user account. Never exposes the password hash.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "Alice Wonder")]
    pub name: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub bio: Option<String>,
    /// Blob path of the avatar image, served under `/storage/{path}`.
    pub avatar: Option<String>,
    #[schema(example = "user")]
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            bio: m.bio,
            avatar: m.avatar,
            role: m.role,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// PATCH body for the profile endpoint.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Three-state: omit to keep, null to clear, string to set.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
    pub password: Option<String>,
}

pub fn validate_update_profile(req: &UpdateProfileRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(AppError::Validation("Name must be 1-100 characters".into()));
        }
    }
    if let Some(ref email) = req.email {
        validate_email(email)?;
    }
    if let Some(Some(ref bio)) = req.bio
        && bio.chars().count() > 2000
    {
        return Err(AppError::Validation(
            "Bio must be at most 2000 characters".into(),
        ));
    }
    if let Some(ref password) = req.password {
        validate_password(password)?;
    }
    Ok(())
}

/// Response after uploading an avatar.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AvatarResponse {
    /// Blob path of the stored avatar.
    #[schema(example = "avatars/0b2f6a1e-....png")]
    pub avatar: String,
}

/// Admin request to change a user's role.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRoleRequest {
    /// One of the seeded roles: `user` or `admin`.
    #[schema(example = "admin")]
    pub role: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}
