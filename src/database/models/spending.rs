use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Spending {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub sub_category_id: Option<i64>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub spent_on: NaiveDate,
    pub created_at: NaiveDateTime,
}

/// Spending joined with its category / subcategory names, as listed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpendingView {
    pub id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub sub_category_id: Option<i64>,
    pub sub_category_name: Option<String>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub spent_on: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSpending {
    pub category_id: i64,
    pub sub_category_id: Option<i64>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub spent_on: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpendingFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category_id: Option<i64>,
}
