use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryTotal {
    pub category_id: i64,
    pub category_name: String,
    pub total: Decimal,
    pub entries: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceTotal {
    pub source_id: i64,
    pub source_name: String,
    pub total: Decimal,
    pub entries: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonthlyTotal {
    pub month: String, // YYYY-MM
    pub spent: Decimal,
    pub earned: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CycleReport {
    pub id: i64,
    pub user_id: i64,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub content: String,
    pub created_at: NaiveDateTime,
}
