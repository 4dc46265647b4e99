//! End-of-cycle spending report.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{MySql, Pool};
use std::fmt::Write;

use crate::cycle::BillingCycle;
use crate::database::db::{analytics, logs};
use crate::database::models::{CategoryTotal, SourceTotal, SpendingView, User};
use crate::error::AppResult;

pub const CYCLE_REPORT: &str = "cycle_report";
const LARGEST_SHOWN: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle: BillingCycle,
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub net: Decimal,
    pub by_category: Vec<CategoryTotal>,
    pub by_source: Vec<SourceTotal>,
    pub largest: Vec<SpendingView>,
}

pub async fn summarize(
    pool: &Pool<MySql>,
    user_id: i64,
    cycle: BillingCycle,
) -> AppResult<CycleSummary> {
    let total_spent = analytics::spending_total(pool, user_id, cycle.start, cycle.end, None).await?;
    let total_income = analytics::income_total(pool, user_id, cycle.start, cycle.end).await?;
    let by_category = analytics::spending_by_category(pool, user_id, cycle.start, cycle.end).await?;
    let by_source = analytics::income_by_source(pool, user_id, cycle.start, cycle.end).await?;
    let largest =
        analytics::largest_spendings(pool, user_id, cycle.start, cycle.end, LARGEST_SHOWN).await?;

    Ok(CycleSummary {
        cycle,
        total_spent,
        total_income,
        net: total_income - total_spent,
        by_category,
        by_source,
        largest,
    })
}

pub fn render(username: &str, summary: &CycleSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "**Cycle report for {username}**");
    let _ = writeln!(out, "{}", summary.cycle.label());
    let _ = writeln!(out);
    let _ = writeln!(out, "Income:   {}", money(summary.total_income));
    let _ = writeln!(out, "Spending: {}", money(summary.total_spent));
    let _ = writeln!(out, "Net:      {}", money(summary.net));

    if summary.by_category.is_empty() {
        let _ = writeln!(out, "\nNo spendings recorded this cycle.");
    } else {
        let _ = writeln!(out, "\n__Spending by category__");
        for row in &summary.by_category {
            let share = if summary.total_spent > Decimal::ZERO {
                (row.total * Decimal::ONE_HUNDRED / summary.total_spent).round_dp(1).normalize()
            } else {
                Decimal::ZERO
            };
            let _ = writeln!(
                out,
                "- {}: {} ({}%, {} entries)",
                row.category_name,
                money(row.total),
                share,
                row.entries
            );
        }
    }

    if !summary.by_source.is_empty() {
        let _ = writeln!(out, "\n__Income by source__");
        for row in &summary.by_source {
            let _ = writeln!(out, "- {}: {}", row.source_name, money(row.total));
        }
    }

    if !summary.largest.is_empty() {
        let _ = writeln!(out, "\n__Largest spendings__");
        for s in &summary.largest {
            let note = s.description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default();
            let _ = writeln!(
                out,
                "- {} {} {}{}",
                s.spent_on.format("%b %-d"),
                s.category_name,
                money(s.amount),
                note
            );
        }
    }

    out.trim_end().to_string()
}

pub fn money(d: Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

/// Builds the report for `cycle`, stores it in `cycle_reports` and returns the text.
pub async fn generate_cycle_report(
    pool: &Pool<MySql>,
    user: &User,
    cycle: BillingCycle,
) -> AppResult<String> {
    let summary = summarize(pool, user.id, cycle).await?;
    let content = render(&user.username, &summary);

    logs::save_cycle_report(
        pool,
        user.id,
        cycle.start,
        cycle.end,
        summary.total_spent,
        summary.total_income,
        &content,
    )
    .await?;
    tracing::info!(user_id = user.id, cycle = %cycle.key(), "cycle report generated");

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::DEFAULT_START_DAY;
    use chrono::NaiveDate;

    fn summary() -> CycleSummary {
        let cycle =
            BillingCycle::containing(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), DEFAULT_START_DAY);
        CycleSummary {
            cycle,
            total_spent: Decimal::from(200),
            total_income: Decimal::from(1000),
            net: Decimal::from(800),
            by_category: vec![
                CategoryTotal {
                    category_id: 1,
                    category_name: "Rent".into(),
                    total: Decimal::from(150),
                    entries: 1,
                },
                CategoryTotal {
                    category_id: 2,
                    category_name: "Food".into(),
                    total: Decimal::from(50),
                    entries: 3,
                },
            ],
            by_source: vec![SourceTotal {
                source_id: 1,
                source_name: "Salary".into(),
                total: Decimal::from(1000),
                entries: 1,
            }],
            largest: vec![],
        }
    }

    #[test]
    fn render_lists_totals_and_shares() {
        let text = render("sam", &summary());
        assert!(text.starts_with("**Cycle report for sam**"));
        assert!(text.contains("Feb 26, 2024 to Mar 25, 2024"));
        assert!(text.contains("Net:      800.00"));
        assert!(text.contains("- Rent: 150.00 (75%, 1 entries)"));
        assert!(text.contains("- Salary: 1000.00"));
        assert!(!text.contains("Largest spendings"));
    }

    #[test]
    fn render_handles_empty_cycle() {
        let mut s = summary();
        s.by_category.clear();
        s.by_source.clear();
        s.total_spent = Decimal::ZERO;
        let text = render("sam", &s);
        assert!(text.contains("No spendings recorded this cycle."));
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(Decimal::from(5)), "5.00");
        assert_eq!(money(Decimal::new(12346, 3)), "12.35");
    }
}
