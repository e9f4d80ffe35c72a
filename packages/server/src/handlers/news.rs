use std::collections::{BTreeMap, HashMap};

use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::blocks::{
    BlockMediaLifecycle, BlockUploads, NEWS_IMAGE_NAMESPACE, RawBlock, decode_candidates,
    parse_block_field, reconcile,
};
use crate::entity::{category, category_news, content_block, news, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::news::*;
use crate::models::shared::{
    ImageUpload, Pagination, escape_like, parse_bool_field, parse_category_ids, validate_title,
    validate_short_description,
};
use crate::state::AppState;

/// Body limit layer for news multipart routes: up to 50 block images plus
/// the main image at 2MB each.
pub fn news_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(128 * 1024 * 1024)
}

/// Fields collected from a news create/update multipart request.
#[derive(Default)]
struct NewsForm {
    title: Option<String>,
    short_description: Option<String>,
    is_published: Option<bool>,
    image: Option<ImageUpload>,
    category_ids: Option<Vec<i32>>,
    /// Raw block fields keyed by submitted index. `None` means no
    /// `content_blocks*` field appeared at all (blocks untouched on update);
    /// an empty map means an explicit empty list (delete everything).
    blocks: Option<BTreeMap<usize, RawBlock>>,
    uploads: BlockUploads,
}

/// Collect a news multipart request into a `NewsForm`.
///
/// Block fields arrive as `content_blocks[<index>][<key>]`; a bare
/// `content_blocks` field marks an explicit empty list, which the bracket
/// syntax cannot otherwise express.
async fn parse_news_multipart(
    mut multipart: Multipart,
    max_upload_size: u64,
) -> Result<NewsForm, AppError> {
    let mut form = NewsForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };

        match name.as_str() {
            "title" => form.title = Some(read_text(field, &name).await?),
            "short_description" => form.short_description = Some(read_text(field, &name).await?),
            "is_published" => {
                let value = read_text(field, &name).await?;
                form.is_published = Some(parse_bool_field(&value, "is_published")?);
            }
            "category_ids" => {
                let value = read_text(field, &name).await?;
                form.category_ids = Some(parse_category_ids(&value)?);
            }
            "image" => {
                form.image = Some(read_upload(field, &name, max_upload_size).await?);
            }
            "content_blocks" => {
                form.blocks.get_or_insert_with(BTreeMap::new);
            }
            _ => {
                let Some((index, key)) = parse_block_field(&name) else {
                    continue; // Ignore unknown fields.
                };
                if index >= MAX_CONTENT_BLOCKS {
                    return Err(AppError::field_validation(
                        "content_blocks",
                        format!("at most {MAX_CONTENT_BLOCKS} blocks"),
                    ));
                }
                if key == "image" {
                    let upload = read_upload(field, &name, max_upload_size).await?;
                    form.uploads.insert(index, upload);
                    // The candidate entry must exist even if the file is the
                    // only field sent for this index, so decoding can demand
                    // its type.
                    form.blocks
                        .get_or_insert_with(BTreeMap::new)
                        .entry(index)
                        .or_default();
                    continue;
                }
                let value = read_text(field, &name).await?;
                let blocks = form.blocks.get_or_insert_with(BTreeMap::new);
                let raw = blocks.entry(index).or_default();
                match key {
                    "id" => raw.id = Some(value),
                    "type" => raw.block_type = Some(value),
                    "order" => raw.order = Some(value),
                    "text_content" => raw.text_content = Some(value),
                    _ => {} // Ignore unknown block keys.
                }
            }
        }
    }

    Ok(form)
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::field_validation(name, format!("failed to read field: {e}")))
}

async fn read_upload(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
    max_upload_size: u64,
) -> Result<ImageUpload, AppError> {
    let filename = field.file_name().map(|s| s.to_string());
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::field_validation(name, format!("failed to read file: {e}")))?;
    if data.len() as u64 > max_upload_size {
        return Err(AppError::field_validation(
            name,
            format!("file exceeds maximum size of {max_upload_size} bytes"),
        ));
    }
    Ok(ImageUpload {
        data: data.to_vec(),
        filename,
    })
}

async fn find_own_news<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    id: i32,
) -> Result<news::Model, AppError> {
    news::Entity::find_by_id(id)
        .filter(news::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("News not found".into()))
}

/// Owner-scoped lookup with a row lock; the per-article lock that serializes
/// concurrent mutations of the same article's block collection.
async fn find_own_news_for_update(
    txn: &DatabaseTransaction,
    user_id: i32,
    id: i32,
) -> Result<news::Model, AppError> {
    use sea_orm::sea_query::LockType;
    news::Entity::find_by_id(id)
        .filter(news::Column::UserId.eq(user_id))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("News not found".into()))
}

/// Replace the article's category set. Every id must reference an existing,
/// active category.
async fn sync_categories<C: ConnectionTrait>(
    db: &C,
    news_id: i32,
    category_ids: &[i32],
) -> Result<(), AppError> {
    if !category_ids.is_empty() {
        let found = category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids.iter().copied()))
            .all(db)
            .await?;
        if found.len() != category_ids.len() {
            let found_ids: Vec<i32> = found.iter().map(|c| c.id).collect();
            let missing: Vec<String> = category_ids
                .iter()
                .filter(|id| !found_ids.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(AppError::field_validation(
                "category_ids",
                format!("categories do not exist: {}", missing.join(", ")),
            ));
        }
        if found.iter().any(|c| !c.is_active) {
            return Err(AppError::field_validation(
                "category_ids",
                "inactive categories cannot be assigned",
            ));
        }
    }

    category_news::Entity::delete_many()
        .filter(category_news::Column::NewsId.eq(news_id))
        .exec(db)
        .await?;

    let now = chrono::Utc::now();
    for &category_id in category_ids {
        let link = category_news::ActiveModel {
            news_id: Set(news_id),
            category_id: Set(category_id),
            created_at: Set(now),
        };
        link.insert(db).await?;
    }

    Ok(())
}

/// Assemble full responses for a page of news rows, batching the related
/// user, block, and category loads.
pub async fn build_news_responses<C: ConnectionTrait>(
    db: &C,
    items: Vec<news::Model>,
) -> Result<Vec<NewsResponse>, AppError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let news_ids: Vec<i32> = items.iter().map(|n| n.id).collect();
    let user_ids: Vec<i32> = items.iter().map(|n| n.user_id).collect();

    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut blocks_by_news: HashMap<i32, Vec<content_block::Model>> = HashMap::new();
    let blocks = content_block::Entity::find()
        .filter(content_block::Column::NewsId.is_in(news_ids.clone()))
        .order_by_asc(content_block::Column::Order)
        .all(db)
        .await?;
    for block in blocks {
        blocks_by_news.entry(block.news_id).or_default().push(block);
    }

    let links = category_news::Entity::find()
        .filter(category_news::Column::NewsId.is_in(news_ids))
        .all(db)
        .await?;
    let category_ids: Vec<i32> = links.iter().map(|l| l.category_id).collect();
    let categories: HashMap<i32, category::Model> = category::Entity::find()
        .filter(category::Column::Id.is_in(category_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    let mut categories_by_news: HashMap<i32, Vec<category::Model>> = HashMap::new();
    for link in links {
        if let Some(cat) = categories.get(&link.category_id) {
            categories_by_news
                .entry(link.news_id)
                .or_default()
                .push(cat.clone());
        }
    }

    let mut responses = Vec::with_capacity(items.len());
    for item in items {
        let owner = users
            .get(&item.user_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("Missing owner for news {}", item.id)))?;
        let blocks = blocks_by_news.remove(&item.id).unwrap_or_default();
        let cats = categories_by_news.remove(&item.id).unwrap_or_default();
        responses.push(NewsResponse::from_parts(item, owner, blocks, cats));
    }

    Ok(responses)
}

async fn load_news_response<C: ConnectionTrait>(
    db: &C,
    item: news::Model,
) -> Result<NewsResponse, AppError> {
    let mut responses = build_news_responses(db, vec![item]).await?;
    responses
        .pop()
        .ok_or_else(|| AppError::Internal("News response assembly failed".into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/news",
    tag = "News",
    operation_id = "listNews",
    summary = "List the current user's news",
    description = "Returns the authenticated user's own articles with pagination, \
        case-insensitive search across title and short description, an `is_published` \
        filter, and sorting by `id`, `title`, `created_at` (default, desc), `updated_at`, \
        or `published_at`. Requires `news:view` permission.",
    params(NewsListQuery),
    responses(
        (status = 200, description = "List of news", body = NewsListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<NewsListQuery>,
) -> Result<Json<NewsListResponse>, AppError> {
    auth_user.require_permission("news:view")?;

    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(15).clamp(1, 100);

    let mut select = news::Entity::find().filter(news::Column::UserId.eq(auth_user.user_id));

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(news::Column::Title)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(news::Column::ShortDescription)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    if let Some(is_published) = query.is_published {
        select = select.filter(news::Column::IsPublished.eq(is_published));
    }

    let sort_by = query.sort_by.as_deref().unwrap_or("created_at");
    let sort_order = if query.sort_order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };
    let sort_column = match sort_by {
        "id" => news::Column::Id,
        "title" => news::Column::Title,
        "created_at" => news::Column::CreatedAt,
        "updated_at" => news::Column::UpdatedAt,
        "published_at" => news::Column::PublishedAt,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: id, title, created_at, updated_at, published_at".into(),
            ));
        }
    };
    select = select.order_by(sort_column, sort_order);

    let paginator = select.paginate(&state.db, per_page);
    let total = paginator.num_items().await?;
    let total_pages = total.div_ceil(per_page);
    let items = paginator.fetch_page(page - 1).await?;

    let data = build_news_responses(&state.db, items).await?;

    Ok(Json(NewsListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/news",
    tag = "News",
    operation_id = "createNews",
    summary = "Create a news article",
    description = "Multipart create. Required fields: `title`, `short_description`, \
        `is_published`. Optional: `image` (jpeg/png, max 2MB), `category_ids` (\"1,3\"), \
        and content blocks as `content_blocks[<index>][type|order|text_content|image]`. \
        Blocks are sorted by their declared order and renumbered 1..N. Requires \
        `news:create` permission.",
    request_body(content_type = "multipart/form-data", description = "Article fields and block list"),
    responses(
        (status = 201, description = "News created", body = NewsResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn create_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("news:create")?;

    let form = parse_news_multipart(multipart, state.config.storage.max_upload_size).await?;

    let title = form
        .title
        .as_deref()
        .ok_or_else(|| AppError::field_validation("title", "title is required"))?;
    validate_title(title)?;
    let short_description = form
        .short_description
        .as_deref()
        .ok_or_else(|| {
            AppError::field_validation("short_description", "short description is required")
        })?;
    validate_short_description(short_description)?;
    if form.is_published.is_none() {
        return Err(AppError::field_validation(
            "is_published",
            "publication flag is required",
        ));
    }

    let mut media = BlockMediaLifecycle::new(&*state.blob_store);
    let outcome = create_news_tx(&state, auth_user.user_id, form, &mut media).await;

    match outcome {
        Ok(created) => {
            let response = load_news_response(&state.db, created).await?;
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(e) => {
            media.cleanup().await;
            Err(e)
        }
    }
}

async fn create_news_tx(
    state: &AppState,
    user_id: i32,
    mut form: NewsForm,
    media: &mut BlockMediaLifecycle<'_>,
) -> Result<news::Model, AppError> {
    let txn = state.db.begin().await?;

    let image = match form.image.take() {
        Some(upload) => Some(
            media
                .store_image(&upload, NEWS_IMAGE_NAMESPACE, "image")
                .await?,
        ),
        None => None,
    };

    let now = chrono::Utc::now();
    let is_published = form.is_published.unwrap_or(false);
    let new_news = news::ActiveModel {
        user_id: Set(user_id),
        title: Set(form.title.unwrap_or_default().trim().to_string()),
        image: Set(image),
        short_description: Set(form
            .short_description
            .unwrap_or_default()
            .trim()
            .to_string()),
        is_published: Set(is_published),
        published_at: Set(is_published.then_some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = new_news.insert(&txn).await?;

    if let Some(ref category_ids) = form.category_ids {
        sync_categories(&txn, created.id, category_ids).await?;
    }

    if let Some(blocks) = form.blocks {
        let candidates = decode_candidates(blocks, &form.uploads)?;
        reconcile(&txn, &created, candidates, &mut form.uploads, media).await?;
    }

    txn.commit().await?;
    Ok(created)
}

#[utoipa::path(
    get,
    path = "/api/v1/news/{id}",
    tag = "News",
    operation_id = "getNews",
    summary = "Get one of the current user's news articles",
    params(("id" = i32, Path, description = "News ID")),
    responses(
        (status = 200, description = "News details", body = NewsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "News not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<NewsResponse>, AppError> {
    auth_user.require_permission("news:view")?;

    let item = find_own_news(&state.db, auth_user.user_id, id).await?;
    Ok(Json(load_news_response(&state.db, item).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/news/{id}",
    tag = "News",
    operation_id = "updateNews",
    summary = "Update a news article and reconcile its content blocks",
    description = "Multipart update. Article fields are patched when present. A new \
        `image` replaces and deletes the old main image. When any `content_blocks*` \
        field is present the submitted list fully replaces the stored blocks: entries \
        with an `id` update that block, entries without insert a new one, and stored \
        blocks missing from the list are deleted together with their images. Requires \
        `news:update` permission.",
    params(("id" = i32, Path, description = "News ID")),
    request_body(content_type = "multipart/form-data", description = "Partial article fields and optional block list"),
    responses(
        (status = 200, description = "News updated", body = NewsResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "News not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(id))]
pub async fn update_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<NewsResponse>, AppError> {
    auth_user.require_permission("news:update")?;

    let form = parse_news_multipart(multipart, state.config.storage.max_upload_size).await?;

    if let Some(ref title) = form.title {
        validate_title(title)?;
    }
    if let Some(ref short_description) = form.short_description {
        validate_short_description(short_description)?;
    }

    let mut media = BlockMediaLifecycle::new(&*state.blob_store);
    let outcome = update_news_tx(&state, auth_user.user_id, id, form, &mut media).await;

    match outcome {
        Ok(updated) => Ok(Json(load_news_response(&state.db, updated).await?)),
        Err(e) => {
            media.cleanup().await;
            Err(e)
        }
    }
}

async fn update_news_tx(
    state: &AppState,
    user_id: i32,
    id: i32,
    mut form: NewsForm,
    media: &mut BlockMediaLifecycle<'_>,
) -> Result<news::Model, AppError> {
    let txn = state.db.begin().await?;

    let existing = find_own_news_for_update(&txn, user_id, id).await?;
    let old_image = existing.image.clone();
    let was_published = existing.is_published;
    let had_published_at = existing.published_at.is_some();

    let mut active: news::ActiveModel = existing.clone().into();

    if let Some(ref title) = form.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(ref short_description) = form.short_description {
        active.short_description = Set(short_description.trim().to_string());
    }
    if let Some(is_published) = form.is_published {
        active.is_published = Set(is_published);
        // Set once on the first transition to published, preserved after.
        if is_published && !was_published && !had_published_at {
            active.published_at = Set(Some(chrono::Utc::now()));
        }
    }
    if let Some(upload) = form.image.take() {
        media.delete_image(old_image.as_deref()).await;
        let path = media
            .store_image(&upload, NEWS_IMAGE_NAMESPACE, "image")
            .await?;
        active.image = Set(Some(path));
    }
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(&txn).await?;

    if let Some(ref category_ids) = form.category_ids {
        sync_categories(&txn, updated.id, category_ids).await?;
    }

    if let Some(blocks) = form.blocks {
        let candidates = decode_candidates(blocks, &form.uploads)?;
        reconcile(&txn, &updated, candidates, &mut form.uploads, media).await?;
    }

    txn.commit().await?;
    Ok(updated)
}

#[utoipa::path(
    patch,
    path = "/api/v1/news/{id}/toggle-status",
    tag = "News",
    operation_id = "toggleNewsStatus",
    summary = "Toggle an article's publication status",
    description = "Flips `is_published`. `published_at` is set on the first transition \
        to published and preserved thereafter. Requires `news:toggle` permission.",
    params(("id" = i32, Path, description = "News ID")),
    responses(
        (status = 200, description = "Status toggled", body = NewsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "News not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn toggle_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<NewsResponse>, AppError> {
    auth_user.require_permission("news:toggle")?;

    let txn = state.db.begin().await?;
    let existing = find_own_news_for_update(&txn, auth_user.user_id, id).await?;

    let publishing = !existing.is_published;
    let had_published_at = existing.published_at.is_some();

    let mut active: news::ActiveModel = existing.into();
    active.is_published = Set(publishing);
    if publishing && !had_published_at {
        active.published_at = Set(Some(chrono::Utc::now()));
    }
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(load_news_response(&state.db, updated).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/news/{id}",
    tag = "News",
    operation_id = "deleteNews",
    summary = "Delete a news article",
    description = "Deletes the article, its content blocks, and every bound image blob \
        (block images and the main image). Requires `news:delete` permission.",
    params(("id" = i32, Path, description = "News ID")),
    responses(
        (status = 204, description = "News deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "News not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("news:delete")?;

    let txn = state.db.begin().await?;
    let existing = find_own_news_for_update(&txn, auth_user.user_id, id).await?;

    let blocks = content_block::Entity::find()
        .filter(content_block::Column::NewsId.eq(existing.id))
        .all(&txn)
        .await?;

    let media = BlockMediaLifecycle::new(&*state.blob_store);
    for block in &blocks {
        media.delete_image(block.image_url.as_deref()).await;
    }
    media.delete_image(existing.image.as_deref()).await;

    content_block::Entity::delete_many()
        .filter(content_block::Column::NewsId.eq(existing.id))
        .exec(&txn)
        .await?;
    category_news::Entity::delete_many()
        .filter(category_news::Column::NewsId.eq(existing.id))
        .exec(&txn)
        .await?;
    news::Entity::delete_by_id(existing.id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
