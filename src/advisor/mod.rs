//! Generative-AI financial advisor: one tool, at most five model turns,
//! one stored answer per user per day.

pub mod gemini;
pub mod prompt;
pub mod session;
pub mod store;
pub mod tools;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{MySql, Pool};
use std::sync::Arc;

use crate::config::GeminiConfig;
use crate::database::models::User;
use crate::error::{AppError, AppResult};
use gemini::{GeminiClient, LlmClient};
use session::{UsageTally, MAX_TURNS};
use store::{AdvisorStore, MySqlAdvisorStore};
use tools::{MetricsSource, MySqlMetrics};

#[derive(Debug, Clone, Serialize)]
pub struct Advice {
    pub advice: String,
    pub date: NaiveDate,
    pub cached: bool,
}

pub struct Advisor {
    llm: Arc<dyn LlmClient>,
    daily_limit: i64,
    cycle_start_day: u32,
}

impl Advisor {
    pub fn new(llm: Arc<dyn LlmClient>, daily_limit: i64, cycle_start_day: u32) -> Self {
        Self { llm, daily_limit, cycle_start_day }
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &GeminiConfig, cycle_start_day: u32) -> AppResult<Option<Self>> {
        if config.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; advisor disabled");
            return Ok(None);
        }
        let client = GeminiClient::new(config)?;
        Ok(Some(Self::new(Arc::new(client), config.daily_limit, cycle_start_day)))
    }

    pub async fn advise(
        &self,
        pool: &Pool<MySql>,
        user: &User,
        today: NaiveDate,
        refresh: bool,
    ) -> AppResult<Advice> {
        let store = MySqlAdvisorStore::new(pool.clone());
        let metrics = MySqlMetrics::new(pool.clone());
        self.advise_with(&store, &metrics, user, today, refresh).await
    }

    /// Today's advice for `user`. A stored answer is returned without a model
    /// call unless `refresh` is set. The daily limit is a hard cap on model
    /// requests: a conversation gets at most as many turns as the user has
    /// requests left.
    pub async fn advise_with(
        &self,
        store: &dyn AdvisorStore,
        metrics: &dyn MetricsSource,
        user: &User,
        today: NaiveDate,
        refresh: bool,
    ) -> AppResult<Advice> {
        if !refresh {
            if let Some(advice) = store.cached_advice(user.id, today).await? {
                tracing::debug!(user_id = user.id, "advisor cache hit");
                return Ok(Advice { advice, date: today, cached: true });
            }
        }

        let remaining = self.daily_limit - store.requests_used(user.id, today).await?;
        if remaining <= 0 {
            return Err(self.limit_reached());
        }
        let max_turns = usize::try_from(remaining).unwrap_or(MAX_TURNS).min(MAX_TURNS);

        let user_prompt = prompt::advice_request(&user.username, today, self.cycle_start_day);
        let mut tally = UsageTally::default();
        let outcome = session::run_tool_loop(
            self.llm.as_ref(),
            metrics,
            user.id,
            prompt::SYSTEM_PROMPT,
            &user_prompt,
            max_turns,
            &mut tally,
        )
        .await;

        if tally.requests > 0 {
            store.record_usage(user.id, today, tally).await?;
        }

        let reply = match outcome? {
            Some(reply) => reply,
            None if max_turns < MAX_TURNS => return Err(self.limit_reached()),
            None => {
                return Err(AppError::Upstream(format!(
                    "advisor exceeded {MAX_TURNS} turns without an answer"
                )))
            }
        };
        tracing::info!(user_id = user.id, turns = reply.turns, tool_calls = reply.tool_calls, "advice generated");
        store.save_advice(user.id, today, &reply.text).await?;

        Ok(Advice { advice: reply.text, date: today, cached: false })
    }

    fn limit_reached(&self) -> AppError {
        AppError::RateLimited(format!(
            "daily advisor limit of {} requests reached",
            self.daily_limit
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::gemini::{GenerateRequest, GenerateResponse};
    use crate::advisor::tools::FinancialMetrics;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers with text, or keeps asking for the tool when `stubborn`.
    struct CountingLlm {
        calls: AtomicUsize,
        stubborn: bool,
    }

    impl CountingLlm {
        fn answering() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), stubborn: false })
        }

        fn stubborn() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), stubborn: true })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for CountingLlm {
        async fn generate(&self, _request: &GenerateRequest) -> AppResult<GenerateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let part = if self.stubborn {
                json!({"functionCall": {
                    "name": "get_financial_metrics",
                    "args": {"startDate": "2024-04-26", "endDate": "2024-05-25"}
                }})
            } else {
                json!({"text": "Cook at home twice more a week."})
            };
            Ok(serde_json::from_value(json!({
                "candidates": [{"content": {"role": "model", "parts": [part]}}],
                "usageMetadata": {"promptTokenCount": 50, "candidatesTokenCount": 5}
            }))?)
        }
    }

    struct NoMetrics;

    #[async_trait]
    impl MetricsSource for NoMetrics {
        async fn financial_metrics(
            &self,
            _user_id: i64,
            start: NaiveDate,
            end: NaiveDate,
        ) -> AppResult<FinancialMetrics> {
            Ok(FinancialMetrics::new(start, end, vec![], vec![]))
        }
    }

    #[derive(Default)]
    struct MemoryAdvisorStore {
        advice: Mutex<HashMap<(i64, NaiveDate), String>>,
        usage: Mutex<HashMap<(i64, NaiveDate), UsageTally>>,
    }

    impl MemoryAdvisorStore {
        fn with_usage(user_id: i64, date: NaiveDate, requests: i64) -> Self {
            let store = Self::default();
            store
                .usage
                .lock()
                .unwrap()
                .insert((user_id, date), UsageTally { requests, ..UsageTally::default() });
            store
        }

        fn requests(&self, user_id: i64, date: NaiveDate) -> i64 {
            self.usage.lock().unwrap().get(&(user_id, date)).map(|u| u.requests).unwrap_or(0)
        }
    }

    #[async_trait]
    impl AdvisorStore for MemoryAdvisorStore {
        async fn cached_advice(&self, user_id: i64, date: NaiveDate) -> AppResult<Option<String>> {
            Ok(self.advice.lock().unwrap().get(&(user_id, date)).cloned())
        }

        async fn requests_used(&self, user_id: i64, date: NaiveDate) -> AppResult<i64> {
            Ok(self.requests(user_id, date))
        }

        async fn record_usage(&self, user_id: i64, date: NaiveDate, tally: UsageTally) -> AppResult<()> {
            let mut usage = self.usage.lock().unwrap();
            let entry = usage.entry((user_id, date)).or_default();
            entry.requests += tally.requests;
            entry.prompt_tokens += tally.prompt_tokens;
            entry.output_tokens += tally.output_tokens;
            Ok(())
        }

        async fn save_advice(&self, user_id: i64, date: NaiveDate, advice: &str) -> AppResult<()> {
            self.advice.lock().unwrap().insert((user_id, date), advice.to_string());
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    fn sam() -> User {
        User {
            id: 7,
            username: "sam".into(),
            email: None,
            discord_id: None,
            created_at: today().and_hms_opt(8, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn first_request_calls_the_model_and_caches() {
        let llm = CountingLlm::answering();
        let advisor = Advisor::new(llm.clone(), 20, 26);
        let store = MemoryAdvisorStore::default();

        let advice = advisor.advise_with(&store, &NoMetrics, &sam(), today(), false).await.unwrap();
        assert!(!advice.cached);
        assert_eq!(advice.advice, "Cook at home twice more a week.");
        assert_eq!(llm.calls(), 1);
        assert_eq!(store.requests(7, today()), 1);

        let again = advisor.advise_with(&store, &NoMetrics, &sam(), today(), false).await.unwrap();
        assert!(again.cached);
        assert_eq!(again.advice, advice.advice);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn cache_is_per_day() {
        let llm = CountingLlm::answering();
        let advisor = Advisor::new(llm.clone(), 20, 26);
        let store = MemoryAdvisorStore::default();
        store.advice.lock().unwrap().insert((7, today()), "old".into());

        let tomorrow = today().succ_opt().unwrap();
        let advice = advisor.advise_with(&store, &NoMetrics, &sam(), tomorrow, false).await.unwrap();
        assert!(!advice.cached);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_bypasses_the_cache() {
        let llm = CountingLlm::answering();
        let advisor = Advisor::new(llm.clone(), 20, 26);
        let store = MemoryAdvisorStore::default();
        store.advice.lock().unwrap().insert((7, today()), "stale".into());

        let advice = advisor.advise_with(&store, &NoMetrics, &sam(), today(), true).await.unwrap();
        assert!(!advice.cached);
        assert_eq!(llm.calls(), 1);
        assert_eq!(
            store.advice.lock().unwrap().get(&(7, today())).map(String::as_str),
            Some("Cook at home twice more a week.")
        );
    }

    #[tokio::test]
    async fn refresh_does_not_bypass_the_limit() {
        let llm = CountingLlm::answering();
        let advisor = Advisor::new(llm.clone(), 3, 26);
        let store = MemoryAdvisorStore::with_usage(7, today(), 3);
        store.advice.lock().unwrap().insert((7, today()), "cached".into());

        let err = advisor.advise_with(&store, &NoMetrics, &sam(), today(), true).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
        assert_eq!(llm.calls(), 0);

        // the cached answer is still served without refresh
        let cached = advisor.advise_with(&store, &NoMetrics, &sam(), today(), false).await.unwrap();
        assert!(cached.cached);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn over_limit_is_rejected_without_a_model_call() {
        let llm = CountingLlm::answering();
        let advisor = Advisor::new(llm.clone(), 20, 26);
        let store = MemoryAdvisorStore::with_usage(7, today(), 25);

        let err = advisor.advise_with(&store, &NoMetrics, &sam(), today(), false).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
        assert_eq!(llm.calls(), 0);
        assert_eq!(store.requests(7, today()), 25);
    }

    #[tokio::test]
    async fn conversation_never_runs_past_the_daily_limit() {
        let llm = CountingLlm::stubborn();
        let advisor = Advisor::new(llm.clone(), 20, 26);
        let store = MemoryAdvisorStore::with_usage(7, today(), 18);

        let err = advisor.advise_with(&store, &NoMetrics, &sam(), today(), false).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
        assert_eq!(llm.calls(), 2);
        assert_eq!(store.requests(7, today()), 20);
        assert!(store.advice.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn turn_cap_is_an_upstream_error_when_budget_allows() {
        let llm = CountingLlm::stubborn();
        let advisor = Advisor::new(llm.clone(), 20, 26);
        let store = MemoryAdvisorStore::default();

        let err = advisor.advise_with(&store, &NoMetrics, &sam(), today(), false).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert!(err.to_string().contains("exceeded 5 turns"));
        assert_eq!(llm.calls(), MAX_TURNS);
        assert_eq!(store.requests(7, today()), MAX_TURNS as i64);
    }
}
