//! Persistence used by the alert jobs, behind a trait so the
//! once-per-cycle bookkeeping can run without MySQL.

use async_trait::async_trait;
use sqlx::{MySql, Pool};

use crate::alerts::{budget, report};
use crate::cycle::BillingCycle;
use crate::database::db::{logs, queries};
use crate::database::models::{BudgetStatus, User};
use crate::error::AppResult;

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn users(&self) -> AppResult<Vec<User>>;

    async fn budget_statuses(&self, user_id: i64, cycle: BillingCycle) -> AppResult<Vec<BudgetStatus>>;

    /// Whether `(kind, key)` was already delivered to the user.
    async fn is_logged(&self, user_id: i64, kind: &str, key: &str) -> AppResult<bool>;

    async fn mark_logged(&self, user_id: i64, kind: &str, key: &str) -> AppResult<()>;

    /// Renders and stores the report for `cycle`, returning its text.
    async fn cycle_report(&self, user: &User, cycle: BillingCycle) -> AppResult<String>;
}

#[derive(Clone)]
pub struct MySqlAlertStore {
    pool: Pool<MySql>,
}

impl MySqlAlertStore {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for MySqlAlertStore {
    async fn users(&self) -> AppResult<Vec<User>> {
        Ok(queries::list_users(&self.pool).await?)
    }

    async fn budget_statuses(&self, user_id: i64, cycle: BillingCycle) -> AppResult<Vec<BudgetStatus>> {
        budget::budget_statuses(&self.pool, user_id, cycle).await
    }

    async fn is_logged(&self, user_id: i64, kind: &str, key: &str) -> AppResult<bool> {
        Ok(logs::is_report_logged(&self.pool, user_id, kind, key).await?)
    }

    async fn mark_logged(&self, user_id: i64, kind: &str, key: &str) -> AppResult<()> {
        logs::log_report(&self.pool, user_id, kind, key).await?;
        Ok(())
    }

    async fn cycle_report(&self, user: &User, cycle: BillingCycle) -> AppResult<String> {
        report::generate_cycle_report(&self.pool, user, cycle).await
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use crate::bot::notifier::Notifier;
    use crate::error::AppError;
    use chrono::NaiveDate;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryStore {
        pub users: Vec<User>,
        pub statuses: Mutex<Vec<BudgetStatus>>,
        pub logged: Mutex<HashSet<(i64, String, String)>>,
        pub reports: Mutex<Vec<(i64, String)>>,
    }

    impl MemoryStore {
        pub fn logged(&self, user_id: i64, kind: &str, key: &str) -> bool {
            self.logged
                .lock()
                .unwrap()
                .contains(&(user_id, kind.to_string(), key.to_string()))
        }
    }

    #[async_trait]
    impl AlertStore for MemoryStore {
        async fn users(&self) -> AppResult<Vec<User>> {
            Ok(self.users.clone())
        }

        async fn budget_statuses(&self, _user_id: i64, _cycle: BillingCycle) -> AppResult<Vec<BudgetStatus>> {
            Ok(self.statuses.lock().unwrap().clone())
        }

        async fn is_logged(&self, user_id: i64, kind: &str, key: &str) -> AppResult<bool> {
            Ok(self.logged(user_id, kind, key))
        }

        async fn mark_logged(&self, user_id: i64, kind: &str, key: &str) -> AppResult<()> {
            self.logged
                .lock()
                .unwrap()
                .insert((user_id, kind.to_string(), key.to_string()));
            Ok(())
        }

        async fn cycle_report(&self, user: &User, cycle: BillingCycle) -> AppResult<String> {
            self.reports.lock().unwrap().push((user.id, cycle.key()));
            Ok(format!("report {} for {}", cycle.key(), user.username))
        }
    }

    /// Records delivered messages; fails every delivery while `failing` is set.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<String>>,
        pub failing: AtomicBool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            let n = Self::default();
            n.failing.store(true, Ordering::SeqCst);
            n
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_user(&self, _user: &User, content: &str) -> AppResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::Upstream("webhook returned 500".into()));
            }
            self.sent.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    pub fn user(id: i64, joined: NaiveDate) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: None,
            discord_id: None,
            created_at: joined.and_hms_opt(12, 0, 0).unwrap(),
        }
    }
}
