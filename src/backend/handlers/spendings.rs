use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::alerts::budget;
use crate::alerts::store::MySqlAlertStore;
use crate::backend::handlers::check_range;
use crate::backend::{AppState, UserId};
use crate::database::db::queries;
use crate::database::models::{NewSpending, SpendingFilter, SpendingView};
use crate::database::pagination::{PageParams, Paginated};
use crate::error::{AppError, AppResult};
use crate::ledger;

pub async fn list_spendings(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(page): Query<PageParams>,
    Query(filter): Query<SpendingFilter>,
) -> AppResult<Json<Paginated<SpendingView>>> {
    let page = page.validate()?;
    check_range(filter.from, filter.to)?;

    let (rows, total) = queries::list_spendings(&state.db, user_id, &filter, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

pub async fn get_spending(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> AppResult<Json<SpendingView>> {
    let spending = queries::get_spending(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("spending", id))?;
    Ok(Json(spending))
}

pub async fn create_spending(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(payload): Json<NewSpending>,
) -> AppResult<(StatusCode, Json<SpendingView>)> {
    let payload = ledger::normalize_spending(payload)?;
    let saved = ledger::record_spending(&state.db, user_id, payload).await?;

    spawn_budget_check(&state, user_id);
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update_spending(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
    Json(payload): Json<NewSpending>,
) -> AppResult<Json<SpendingView>> {
    let payload = ledger::normalize_spending(payload)?;
    ledger::check_spending_refs(&state.db, user_id, &payload).await?;

    if !queries::update_spending(&state.db, user_id, id, &payload).await? {
        return Err(AppError::not_found("spending", id));
    }
    tracing::info!(user_id, spending_id = id, "spending updated");

    spawn_budget_check(&state, user_id);
    let spending = queries::get_spending(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("spending", id))?;
    Ok(Json(spending))
}

pub async fn delete_spending(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !queries::delete_spending(&state.db, user_id, id).await? {
        return Err(AppError::not_found("spending", id));
    }
    tracing::info!(user_id, spending_id = id, "spending deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Runs the budget check for the current cycle off the request path.
fn spawn_budget_check(state: &AppState, user_id: i64) {
    let pool = state.db.clone();
    let notifier = state.notifier.clone();
    let cycle = state.current_cycle();

    tokio::spawn(async move {
        let user = match queries::get_user(&pool, user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "budget check skipped");
                return;
            }
        };
        let store = MySqlAlertStore::new(pool);
        if let Err(e) = budget::check_budgets(&store, notifier.as_ref(), &user, cycle).await {
            tracing::warn!(user_id, error = %e, "budget check failed");
        }
    });
}
