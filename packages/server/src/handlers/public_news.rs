use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::news;
use crate::error::{AppError, ErrorBody};
use crate::handlers::news::build_news_responses;
use crate::models::news::{NewsListResponse, NewsResponse, PublicNewsQuery};
use crate::models::shared::{Pagination, escape_like};
use crate::state::AppState;

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::field_validation(field, "must be a date in YYYY-MM-DD format"))
}

#[utoipa::path(
    get,
    path = "/api/v1/public/news",
    tag = "Public",
    operation_id = "listPublicNews",
    summary = "Public feed of published news",
    description = "Published articles ordered by publication time, newest first. \
        Supports search across title and short description, an `author_id` filter, \
        and an inclusive `date_from`/`date_to` publication-date range.",
    params(PublicNewsQuery),
    responses(
        (status = 200, description = "List of published news", body = NewsListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_public_news(
    State(state): State<AppState>,
    Query(query): Query<PublicNewsQuery>,
) -> Result<Json<NewsListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(15).clamp(1, 100);

    let mut select = news::Entity::find()
        .filter(news::Column::IsPublished.eq(true))
        .order_by_desc(news::Column::PublishedAt);

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

    if let Some(author_id) = query.author_id {
        select = select.filter(news::Column::UserId.eq(author_id));
    }

    if let Some(ref date_from) = query.date_from {
        let from = parse_date(date_from, "date_from")?
            .and_hms_opt(0, 0, 0)
            .expect("midnight is valid")
            .and_utc();
        select = select.filter(news::Column::PublishedAt.gte(from));
    }
    if let Some(ref date_to) = query.date_to {
        let until = parse_date(date_to, "date_to")?
            .succ_opt()
            .ok_or_else(|| AppError::field_validation("date_to", "date out of range"))?
            .and_hms_opt(0, 0, 0)
            .expect("midnight is valid")
            .and_utc();
        select = select.filter(news::Column::PublishedAt.lt(until));
    }

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
    get,
    path = "/api/v1/public/news/{id}",
    tag = "Public",
    operation_id = "getPublicNews",
    summary = "Get a published news article",
    params(("id" = i32, Path, description = "News ID")),
    responses(
        (status = 200, description = "News details", body = NewsResponse),
        (status = 404, description = "News not found or unpublished (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_public_news(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<NewsResponse>, AppError> {
    let item = news::Entity::find_by_id(id)
        .filter(news::Column::IsPublished.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("News not found".into()))?;

    let mut responses = build_news_responses(&state.db, vec![item]).await?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::Internal("News response assembly failed".into()))?;
    Ok(Json(response))
}
