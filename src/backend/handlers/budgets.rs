use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;

use crate::alerts::budget;
use crate::backend::{AppState, UserId};
use crate::database::db::{analytics, queries};
use crate::database::models::{BudgetStatus, CategoryKind, NewBudget};
use crate::error::{AppError, AppResult};
use crate::ledger;

const DEFAULT_THRESHOLD: i64 = 80;

fn validate_threshold(raw: Option<Decimal>) -> AppResult<Decimal> {
    let threshold = raw.unwrap_or_else(|| Decimal::from(DEFAULT_THRESHOLD));
    if threshold <= Decimal::ZERO || threshold > Decimal::ONE_HUNDRED {
        return Err(AppError::Validation(
            "alert_threshold must be greater than 0 and at most 100".into(),
        ));
    }
    Ok(threshold.round_dp(2))
}

pub async fn list_budgets(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<Vec<BudgetStatus>>> {
    let statuses = budget::budget_statuses(&state.db, user_id, state.current_cycle()).await?;
    Ok(Json(statuses))
}

/// Creates the budget for a category (or the overall budget when
/// `category_id` is null), replacing any existing one.
pub async fn upsert_budget(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(payload): Json<NewBudget>,
) -> AppResult<Json<BudgetStatus>> {
    let amount = ledger::validate_amount(payload.amount)?;
    let threshold = validate_threshold(payload.alert_threshold)?;

    if let Some(category_id) = payload.category_id {
        let category = queries::get_category(&state.db, user_id, category_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("unknown category {category_id}")))?;
        if category.kind() != CategoryKind::Expense {
            return Err(AppError::Validation(format!(
                "category '{}' is not an expense category",
                category.name
            )));
        }
    }

    let id = queries::upsert_budget(&state.db, user_id, payload.category_id, amount, threshold).await?;
    tracing::info!(user_id, budget_id = id, amount = %amount, "budget saved");

    let saved = queries::get_budget(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("budget", id))?;
    let cycle = state.current_cycle();
    let spent =
        analytics::spending_total(&state.db, user_id, cycle.start, cycle.end, saved.category_id).await?;
    Ok(Json(budget::evaluate(saved, spent)))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !queries::delete_budget(&state.db, user_id, id).await? {
        return Err(AppError::not_found("budget", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_defaults_to_eighty_percent() {
        assert_eq!(validate_threshold(None).unwrap(), Decimal::from(80));
        assert_eq!(validate_threshold(Some(Decimal::from(100))).unwrap(), Decimal::from(100));
        assert!(validate_threshold(Some(Decimal::ZERO)).is_err());
        assert!(validate_threshold(Some(Decimal::from(101))).is_err());
    }
}
