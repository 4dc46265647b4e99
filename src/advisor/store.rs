//! Daily advice cache and Gemini usage counters.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{MySql, Pool};

use crate::advisor::session::UsageTally;
use crate::database::db::logs;
use crate::error::AppResult;

#[async_trait]
pub trait AdvisorStore: Send + Sync {
    async fn cached_advice(&self, user_id: i64, date: NaiveDate) -> AppResult<Option<String>>;

    /// Model requests already made by the user on `date`.
    async fn requests_used(&self, user_id: i64, date: NaiveDate) -> AppResult<i64>;

    async fn record_usage(&self, user_id: i64, date: NaiveDate, tally: UsageTally) -> AppResult<()>;

    async fn save_advice(&self, user_id: i64, date: NaiveDate, advice: &str) -> AppResult<()>;
}

pub struct MySqlAdvisorStore {
    pool: Pool<MySql>,
}

impl MySqlAdvisorStore {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdvisorStore for MySqlAdvisorStore {
    async fn cached_advice(&self, user_id: i64, date: NaiveDate) -> AppResult<Option<String>> {
        let ctx = logs::get_advisor_context(&self.pool, user_id, date).await?;
        Ok(ctx.map(|c| c.advice))
    }

    async fn requests_used(&self, user_id: i64, date: NaiveDate) -> AppResult<i64> {
        let usage = logs::get_gemini_usage(&self.pool, user_id, date).await?;
        Ok(usage.map(|u| u.request_count).unwrap_or(0))
    }

    async fn record_usage(&self, user_id: i64, date: NaiveDate, tally: UsageTally) -> AppResult<()> {
        logs::record_gemini_usage(
            &self.pool,
            user_id,
            date,
            tally.requests,
            tally.prompt_tokens,
            tally.output_tokens,
        )
        .await?;
        Ok(())
    }

    async fn save_advice(&self, user_id: i64, date: NaiveDate, advice: &str) -> AppResult<()> {
        logs::save_advisor_context(&self.pool, user_id, date, advice).await?;
        Ok(())
    }
}
