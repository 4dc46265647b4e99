use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::alerts::budget;
use crate::backend::handlers::check_range;
use crate::backend::{AppState, UserId};
use crate::database::db::{analytics, logs, queries};
use crate::database::models::{BudgetStatus, CategoryTotal, CycleReport, MonthlyTotal, SpendingView};
use crate::database::pagination::{PageParams, Paginated};
use crate::error::{AppError, AppResult};

const DASHBOARD_RECENT: i64 = 5;

#[derive(Debug, Serialize)]
pub struct CycleInfo {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub cycle: CycleInfo,
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub net: Decimal,
    pub by_category: Vec<CategoryTotal>,
    pub budgets: Vec<BudgetStatus>,
    pub recent: Vec<SpendingView>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<Dashboard>> {
    let cycle = state.current_cycle();
    let db = &state.db;

    let total_spent = analytics::spending_total(db, user_id, cycle.start, cycle.end, None).await?;
    let total_income = analytics::income_total(db, user_id, cycle.start, cycle.end).await?;
    let by_category = analytics::spending_by_category(db, user_id, cycle.start, cycle.end).await?;
    let budgets = budget::budget_statuses(db, user_id, cycle).await?;
    let recent = queries::recent_spendings(db, user_id, DASHBOARD_RECENT).await?;

    Ok(Json(Dashboard {
        cycle: CycleInfo { start: cycle.start, end: cycle.end, label: cycle.label() },
        total_spent,
        total_income,
        net: total_income - total_spent,
        by_category,
        budgets,
        recent,
    }))
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

pub async fn monthly(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(q): Query<YearQuery>,
) -> AppResult<Json<Vec<MonthlyTotal>>> {
    let year = q.year.unwrap_or_else(|| state.today().year());
    if !(1970..=9999).contains(&year) {
        return Err(AppError::Validation(format!("year {year} is out of range")));
    }
    Ok(Json(analytics::monthly_totals(&state.db, user_id, year).await?))
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Category breakdown for `[from, to]`; each bound defaults to the current cycle.
pub async fn categories(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(q): Query<RangeQuery>,
) -> AppResult<Json<Vec<CategoryTotal>>> {
    check_range(q.from, q.to)?;
    let cycle = state.current_cycle();
    let from = q.from.unwrap_or(cycle.start);
    let to = q.to.unwrap_or(cycle.end);
    check_range(Some(from), Some(to))?;

    Ok(Json(analytics::spending_by_category(&state.db, user_id, from, to).await?))
}

pub async fn cycle_reports(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Paginated<CycleReport>>> {
    let page = page.validate()?;
    let (rows, total) = logs::list_cycle_reports(&state.db, user_id, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}
