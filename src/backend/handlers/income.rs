use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::backend::handlers::categories::NameBody;
use crate::backend::handlers::check_range;
use crate::backend::{AppState, UserId};
use crate::database::db::queries;
use crate::database::models::{IncomeFilter, IncomeSource, IncomeView, NewIncome};
use crate::database::pagination::{PageParams, Paginated};
use crate::error::{AppError, AppResult};
use crate::ledger;

 /*==========Income Sources=========== */

pub async fn list_sources(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<Vec<IncomeSource>>> {
    Ok(Json(queries::list_income_sources(&state.db, user_id).await?))
}

pub async fn create_source(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(payload): Json<NameBody>,
) -> AppResult<(StatusCode, Json<IncomeSource>)> {
    let name = ledger::clean_name(&payload.name, "income source")?;
    let id = queries::create_income_source(&state.db, user_id, &name).await?;
    tracing::info!(user_id, source_id = id, "income source created");

    let source = queries::get_income_source(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("income source", id))?;
    Ok((StatusCode::CREATED, Json(source)))
}

pub async fn delete_source(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !queries::delete_income_source(&state.db, user_id, id).await? {
        return Err(AppError::not_found("income source", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

 /*==========Income Entries=========== */

pub async fn list_income(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(page): Query<PageParams>,
    Query(filter): Query<IncomeFilter>,
) -> AppResult<Json<Paginated<IncomeView>>> {
    let page = page.validate()?;
    check_range(filter.from, filter.to)?;

    let (rows, total) = queries::list_income(&state.db, user_id, &filter, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

pub async fn get_income(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> AppResult<Json<IncomeView>> {
    let income = queries::get_income(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("income", id))?;
    Ok(Json(income))
}

pub async fn create_income(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(payload): Json<NewIncome>,
) -> AppResult<(StatusCode, Json<IncomeView>)> {
    let payload = ledger::normalize_income(payload)?;
    let saved = ledger::record_income(&state.db, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update_income(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
    Json(payload): Json<NewIncome>,
) -> AppResult<Json<IncomeView>> {
    let payload = ledger::normalize_income(payload)?;
    if queries::get_income_source(&state.db, user_id, payload.source_id).await?.is_none() {
        return Err(AppError::Validation(format!("unknown income source {}", payload.source_id)));
    }

    if !queries::update_income(&state.db, user_id, id, &payload).await? {
        return Err(AppError::not_found("income", id));
    }
    let income = queries::get_income(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("income", id))?;
    Ok(Json(income))
}

pub async fn delete_income(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !queries::delete_income(&state.db, user_id, id).await? {
        return Err(AppError::not_found("income", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
