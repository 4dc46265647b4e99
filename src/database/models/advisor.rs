use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdvisorContext {
    pub id: i64,
    pub user_id: i64,
    pub context_date: NaiveDate,
    pub advice: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeminiUsage {
    pub user_id: i64,
    pub usage_date: NaiveDate,
    pub request_count: i64,
    pub prompt_tokens: i64,
    pub output_tokens: i64,
}
