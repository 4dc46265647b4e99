use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::backend::{AppState, UserId};
use crate::database::db::queries;
use crate::database::models::{Category, CategoryWithSubs, NewCategory, SubCategory};
use crate::error::{AppError, AppResult};
use crate::ledger;

#[derive(Debug, Deserialize)]
pub struct NameBody {
    pub name: String,
}

pub async fn list_categories(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<Vec<CategoryWithSubs>>> {
    let categories = queries::list_categories(&state.db, user_id).await?;
    let mut subs = queries::list_user_subcategories(&state.db, user_id).await?;

    let grouped = categories
        .into_iter()
        .map(|category| {
            let (mine, rest): (Vec<SubCategory>, Vec<SubCategory>) =
                subs.drain(..).partition(|s| s.category_id == category.id);
            subs = rest;
            CategoryWithSubs { category, subcategories: mine }
        })
        .collect();

    Ok(Json(grouped))
}

pub async fn create_category(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(payload): Json<NewCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let name = ledger::clean_name(&payload.name, "category")?;
    let id = queries::create_category(&state.db, user_id, &name, payload.kind).await?;
    tracing::info!(user_id, category_id = id, kind = %payload.kind, "category created");

    let category = queries::get_category(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("category", id))?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn rename_category(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
    Json(payload): Json<NameBody>,
) -> AppResult<Json<Category>> {
    let name = ledger::clean_name(&payload.name, "category")?;
    if !queries::rename_category(&state.db, user_id, id, &name).await? {
        return Err(AppError::not_found("category", id));
    }
    let category = queries::get_category(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("category", id))?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !queries::delete_category(&state.db, user_id, id).await? {
        return Err(AppError::not_found("category", id));
    }
    tracing::info!(user_id, category_id = id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_subcategories(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(category_id): Path<i64>,
) -> AppResult<Json<Vec<SubCategory>>> {
    if queries::get_category(&state.db, user_id, category_id).await?.is_none() {
        return Err(AppError::not_found("category", category_id));
    }
    let subs = queries::list_subcategories(&state.db, category_id).await?;
    Ok(Json(subs))
}

pub async fn create_subcategory(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(category_id): Path<i64>,
    Json(payload): Json<NameBody>,
) -> AppResult<(StatusCode, Json<SubCategory>)> {
    let name = ledger::clean_name(&payload.name, "subcategory")?;
    if queries::get_category(&state.db, user_id, category_id).await?.is_none() {
        return Err(AppError::not_found("category", category_id));
    }

    let id = queries::create_subcategory(&state.db, category_id, &name).await?;
    let sub = queries::get_subcategory(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("subcategory", id))?;
    Ok((StatusCode::CREATED, Json(sub)))
}

pub async fn delete_subcategory(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !queries::delete_subcategory(&state.db, user_id, id).await? {
        return Err(AppError::not_found("subcategory", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
