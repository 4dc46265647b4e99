//! Budget threshold check for the current billing cycle.

use rust_decimal::Decimal;
use sqlx::{MySql, Pool};

use crate::alerts::store::AlertStore;
use crate::bot::notifier::Notifier;
use crate::cycle::BillingCycle;
use crate::database::db::{analytics, queries};
use crate::database::models::{Budget, BudgetLevel, BudgetStatus, User};
use crate::error::AppResult;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub fn evaluate(budget: Budget, spent: Decimal) -> BudgetStatus {
    let percent_used = if budget.amount > Decimal::ZERO {
        (spent * HUNDRED / budget.amount).round_dp(1)
    } else {
        Decimal::ZERO
    };
    let warn_at = budget.amount * budget.alert_threshold / HUNDRED;

    let level = if spent >= budget.amount {
        BudgetLevel::Exceeded
    } else if spent >= warn_at {
        BudgetLevel::Warning
    } else {
        BudgetLevel::Ok
    };

    BudgetStatus {
        remaining: budget.amount - spent,
        spent,
        percent_used,
        level,
        budget,
    }
}

pub async fn budget_statuses(
    pool: &Pool<MySql>,
    user_id: i64,
    cycle: BillingCycle,
) -> AppResult<Vec<BudgetStatus>> {
    let budgets = queries::list_budgets(pool, user_id).await?;
    let mut out = Vec::with_capacity(budgets.len());
    for budget in budgets {
        let spent =
            analytics::spending_total(pool, user_id, cycle.start, cycle.end, budget.category_id)
                .await?;
        out.push(evaluate(budget, spent));
    }
    Ok(out)
}

pub fn alert_kind(status: &BudgetStatus) -> String {
    format!("budget_alert:{}:{}", status.budget.id, status.level.as_str())
}

pub fn alert_message(status: &BudgetStatus, cycle: &BillingCycle) -> String {
    let scope = status
        .budget
        .category_name
        .as_deref()
        .map(|name| format!("**{name}**"))
        .unwrap_or_else(|| "your overall".to_string());

    match status.level {
        BudgetLevel::Exceeded => format!(
            ":rotating_light: You have exceeded {scope} budget for {}: spent {} of {} ({}%).",
            cycle.label(),
            status.spent.round_dp(2),
            status.budget.amount.round_dp(2),
            status.percent_used
        ),
        _ => format!(
            ":warning: {scope} budget is at {}% for {}: spent {} of {}, {} left.",
            status.percent_used,
            cycle.label(),
            status.spent.round_dp(2),
            status.budget.amount.round_dp(2),
            status.remaining.round_dp(2)
        ),
    }
}

/// Evaluates every budget of `user` and sends each Warning/Exceeded alert at
/// most once per cycle. Returns the statuses that produced an alert.
/// An alert is logged only after it was delivered.
pub async fn check_budgets(
    store: &dyn AlertStore,
    notifier: &dyn Notifier,
    user: &User,
    cycle: BillingCycle,
) -> AppResult<Vec<BudgetStatus>> {
    let mut alerted = Vec::new();
    let key = cycle.key();
    for status in store.budget_statuses(user.id, cycle).await? {
        if status.level == BudgetLevel::Ok {
            continue;
        }
        let kind = alert_kind(&status);
        if store.is_logged(user.id, &kind, &key).await? {
            continue;
        }

        notifier.notify_user(user, &alert_message(&status, &cycle)).await?;
        store.mark_logged(user.id, &kind, &key).await?;
        tracing::info!(user_id = user.id, budget_id = status.budget.id, level = status.level.as_str(), "budget alert sent");
        alerted.push(status);
    }
    Ok(alerted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::store::memory::{user, MemoryStore, RecordingNotifier};
    use crate::cycle::DEFAULT_START_DAY;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn april_cycle() -> BillingCycle {
        BillingCycle::containing(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(), DEFAULT_START_DAY)
    }

    fn budget(amount: &str, threshold: &str) -> Budget {
        Budget {
            id: 4,
            user_id: 1,
            category_id: Some(2),
            category_name: Some("Groceries".into()),
            amount: Decimal::from_str(amount).unwrap(),
            alert_threshold: Decimal::from_str(threshold).unwrap(),
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn below_threshold_is_ok() {
        let s = evaluate(budget("500", "80"), Decimal::from(399));
        assert_eq!(s.level, BudgetLevel::Ok);
        assert_eq!(s.remaining, Decimal::from(101));
    }

    #[test]
    fn threshold_is_inclusive() {
        let s = evaluate(budget("500", "80"), Decimal::from(400));
        assert_eq!(s.level, BudgetLevel::Warning);
        assert_eq!(s.percent_used, Decimal::from(80));
    }

    #[test]
    fn reaching_amount_is_exceeded() {
        let s = evaluate(budget("500", "80"), Decimal::from(500));
        assert_eq!(s.level, BudgetLevel::Exceeded);
        let s = evaluate(budget("500", "80"), Decimal::from_str("612.40").unwrap());
        assert_eq!(s.level, BudgetLevel::Exceeded);
        assert!(s.remaining < Decimal::ZERO);
    }

    #[test]
    fn alert_kind_distinguishes_levels() {
        let warn = evaluate(budget("100", "50"), Decimal::from(60));
        let over = evaluate(budget("100", "50"), Decimal::from(120));
        assert_eq!(alert_kind(&warn), "budget_alert:4:warning");
        assert_eq!(alert_kind(&over), "budget_alert:4:exceeded");
    }

    #[test]
    fn messages_name_the_category() {
        let cycle = BillingCycle::containing(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(), DEFAULT_START_DAY);
        let over = evaluate(budget("100", "80"), Decimal::from(150));
        let text = alert_message(&over, &cycle);
        assert!(text.contains("**Groceries**"));
        assert!(text.contains("exceeded"));
        assert!(text.contains("150"));
    }

    #[tokio::test]
    async fn alert_is_sent_once_per_level_and_cycle() {
        let store = MemoryStore::default();
        store.statuses.lock().unwrap().push(evaluate(budget("100", "80"), Decimal::from(85)));
        let notifier = RecordingNotifier::default();
        let sam = user(1, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let cycle = april_cycle();

        let first = check_budgets(&store, &notifier, &sam, cycle).await.unwrap();
        assert_eq!(first.len(), 1);
        let again = check_budgets(&store, &notifier, &sam, cycle).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(notifier.sent().len(), 1);
        assert!(store.logged(1, "budget_alert:4:warning", &cycle.key()));

        // crossing into Exceeded in the same cycle alerts once more
        *store.statuses.lock().unwrap() = vec![evaluate(budget("100", "80"), Decimal::from(120))];
        assert_eq!(check_budgets(&store, &notifier, &sam, cycle).await.unwrap().len(), 1);
        assert_eq!(check_budgets(&store, &notifier, &sam, cycle).await.unwrap().len(), 0);
        assert_eq!(notifier.sent().len(), 2);

        // a new cycle starts with a clean slate
        let next = BillingCycle::containing(cycle.end.succ_opt().unwrap(), DEFAULT_START_DAY);
        assert_eq!(check_budgets(&store, &notifier, &sam, next).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_is_not_logged() {
        let store = MemoryStore::default();
        store.statuses.lock().unwrap().push(evaluate(budget("100", "80"), Decimal::from(150)));
        let notifier = RecordingNotifier::failing();
        let sam = user(1, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let cycle = april_cycle();

        assert!(check_budgets(&store, &notifier, &sam, cycle).await.is_err());
        assert!(!store.logged(1, "budget_alert:4:exceeded", &cycle.key()));

        notifier.failing.store(false, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(check_budgets(&store, &notifier, &sam, cycle).await.unwrap().len(), 1);
        assert!(store.logged(1, "budget_alert:4:exceeded", &cycle.key()));
    }

    #[tokio::test]
    async fn budgets_under_threshold_stay_quiet() {
        let store = MemoryStore::default();
        store.statuses.lock().unwrap().push(evaluate(budget("100", "80"), Decimal::from(10)));
        let notifier = RecordingNotifier::default();
        let sam = user(1, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        assert!(check_budgets(&store, &notifier, &sam, april_cycle()).await.unwrap().is_empty());
        assert!(notifier.sent().is_empty());
        assert!(store.logged.lock().unwrap().is_empty());
    }
}
