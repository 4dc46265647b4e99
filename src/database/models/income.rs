use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IncomeSource {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Income {
    pub id: i64,
    pub user_id: i64,
    pub source_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub received_on: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IncomeView {
    pub id: i64,
    pub source_id: i64,
    pub source_name: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub received_on: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIncome {
    pub source_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub received_on: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomeFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub source_id: Option<i64>,
}
