//! Daily check: budget alerts plus the once-per-cycle report.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{MySql, Pool};
use std::sync::Arc;

use crate::alerts::store::{AlertStore, MySqlAlertStore};
use crate::alerts::{budget, report};
use crate::bot::notifier::{DiscordNotifier, Notifier};
use crate::cycle::BillingCycle;
use crate::database::models::User;
use crate::error::AppResult;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DailyCheckOutcome {
    pub users_checked: usize,
    pub budget_alerts: usize,
    pub reports_sent: usize,
    pub failures: usize,
}

/// Next `hour:00` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Sends the report for the last completed cycle unless it is already logged as sent.
/// The log entry is written only after a successful send. Cycles that ended
/// before the user signed up are skipped.
pub async fn send_cycle_report_if_due(
    store: &dyn AlertStore,
    notifier: &dyn Notifier,
    user: &User,
    today: NaiveDate,
    start_day: u32,
) -> AppResult<bool> {
    let completed = BillingCycle::containing(today, start_day).previous();
    if completed.end < user.created_at.date() {
        return Ok(false);
    }
    let key = completed.key();

    if store.is_logged(user.id, report::CYCLE_REPORT, &key).await? {
        return Ok(false);
    }

    let content = store.cycle_report(user, completed).await?;
    notifier.notify_user(user, &content).await?;
    store.mark_logged(user.id, report::CYCLE_REPORT, &key).await?;
    Ok(true)
}

pub async fn run_daily_check(
    store: &dyn AlertStore,
    notifier: &dyn Notifier,
    today: NaiveDate,
    start_day: u32,
) -> AppResult<DailyCheckOutcome> {
    let users = store.users().await?;
    let current = BillingCycle::containing(today, start_day);
    let mut outcome = DailyCheckOutcome::default();

    for user in &users {
        outcome.users_checked += 1;

        match budget::check_budgets(store, notifier, user, current).await {
            Ok(alerts) => outcome.budget_alerts += alerts.len(),
            Err(e) => {
                outcome.failures += 1;
                tracing::warn!(user_id = user.id, error = %e, "budget check failed");
            }
        }

        match send_cycle_report_if_due(store, notifier, user, today, start_day).await {
            Ok(true) => outcome.reports_sent += 1,
            Ok(false) => {}
            Err(e) => {
                outcome.failures += 1;
                tracing::warn!(user_id = user.id, error = %e, "cycle report failed");
            }
        }
    }

    tracing::info!(
        users = outcome.users_checked,
        alerts = outcome.budget_alerts,
        reports = outcome.reports_sent,
        failures = outcome.failures,
        "daily check finished"
    );
    Ok(outcome)
}

/// Runs the daily check every day at `hour:00` local time, forever.
pub fn spawn_daily_scheduler(
    pool: Pool<MySql>,
    notifier: Arc<DiscordNotifier>,
    start_day: u32,
    hour: u32,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let store = MySqlAlertStore::new(pool);
        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, hour);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(next_run = %next, "daily check scheduled");
            tokio::time::sleep(wait).await;

            let today = Local::now().date_naive();
            if let Err(e) = run_daily_check(&store, notifier.as_ref(), today, start_day).await {
                tracing::error!(error = %e, "daily check aborted");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::store::memory::{user, MemoryStore, RecordingNotifier};
    use std::sync::atomic::Ordering;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn next_run_later_today() {
        assert_eq!(next_run_after(at(2024, 5, 1, 7, 30), 9), at(2024, 5, 1, 9, 0));
    }

    #[test]
    fn next_run_rolls_to_tomorrow() {
        assert_eq!(next_run_after(at(2024, 5, 1, 9, 0), 9), at(2024, 5, 2, 9, 0));
        assert_eq!(next_run_after(at(2024, 12, 31, 22, 0), 9), at(2025, 1, 1, 9, 0));
    }

    #[tokio::test]
    async fn report_is_sent_once_per_cycle() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();
        let sam = user(1, day(2024, 1, 3));

        // 2024-04-27 sits in the Apr 26 cycle; the completed one is Mar 26 - Apr 25
        assert!(send_cycle_report_if_due(&store, &notifier, &sam, day(2024, 4, 27), 26).await.unwrap());
        assert!(store.logged(1, report::CYCLE_REPORT, "2024-03-26"));
        assert!(!send_cycle_report_if_due(&store, &notifier, &sam, day(2024, 4, 28), 26).await.unwrap());
        assert!(!send_cycle_report_if_due(&store, &notifier, &sam, day(2024, 5, 25), 26).await.unwrap());

        assert_eq!(notifier.sent(), vec!["report 2024-03-26 for user1".to_string()]);
        assert_eq!(store.reports.lock().unwrap().len(), 1);

        // the next cycle closes on May 25
        assert!(send_cycle_report_if_due(&store, &notifier, &sam, day(2024, 5, 26), 26).await.unwrap());
        assert!(store.logged(1, report::CYCLE_REPORT, "2024-04-26"));
    }

    #[tokio::test]
    async fn failed_send_leaves_the_report_unlogged() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::failing();
        let sam = user(1, day(2024, 1, 3));

        assert!(send_cycle_report_if_due(&store, &notifier, &sam, day(2024, 4, 27), 26).await.is_err());
        assert!(store.logged.lock().unwrap().is_empty());

        // delivered in full on the next run
        notifier.failing.store(false, Ordering::SeqCst);
        assert!(send_cycle_report_if_due(&store, &notifier, &sam, day(2024, 4, 28), 26).await.unwrap());
        assert!(store.logged(1, report::CYCLE_REPORT, "2024-03-26"));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn cycles_before_signup_are_skipped() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();
        let newcomer = user(2, day(2024, 4, 26));

        assert!(!send_cycle_report_if_due(&store, &notifier, &newcomer, day(2024, 4, 27), 26).await.unwrap());
        assert!(store.reports.lock().unwrap().is_empty());

        // signing up mid-cycle still gets that cycle's report
        let mid = user(3, day(2024, 4, 10));
        assert!(send_cycle_report_if_due(&store, &notifier, &mid, day(2024, 4, 27), 26).await.unwrap());
    }

    #[tokio::test]
    async fn daily_check_counts_failures_per_user() {
        let store = MemoryStore {
            users: vec![user(1, day(2024, 1, 3)), user(2, day(2024, 1, 3))],
            ..MemoryStore::default()
        };
        let notifier = RecordingNotifier::default();

        let outcome = run_daily_check(&store, &notifier, day(2024, 4, 27), 26).await.unwrap();
        assert_eq!(
            outcome,
            DailyCheckOutcome { users_checked: 2, budget_alerts: 0, reports_sent: 2, failures: 0 }
        );

        let again = run_daily_check(&store, &notifier, day(2024, 4, 27), 26).await.unwrap();
        assert_eq!(again.reports_sent, 0);

        notifier.failing.store(true, Ordering::SeqCst);
        let later = run_daily_check(&store, &notifier, day(2024, 5, 26), 26).await.unwrap();
        assert_eq!(later.failures, 2);
        assert!(!store.logged(1, report::CYCLE_REPORT, "2024-04-26"));
    }
}
