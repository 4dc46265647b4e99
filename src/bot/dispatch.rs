//! Maps parsed bot commands onto the same queries the REST API uses.

use chrono::{Local, NaiveDate};
use sqlx::{MySql, Pool};
use std::fmt::Write;
use std::sync::Arc;

use crate::advisor::Advisor;
use crate::alerts::store::MySqlAlertStore;
use crate::alerts::{budget, report};
use crate::bot::command::{self, Command};
use crate::bot::notifier::DiscordNotifier;
use crate::cycle::BillingCycle;
use crate::database::db::{analytics, queries};
use crate::database::models::{BudgetLevel, CategoryKind, NewIncome, NewSpending, User};
use crate::error::{AppError, AppResult};
use crate::ledger;

#[derive(Clone)]
pub struct BotContext {
    pub pool: Pool<MySql>,
    pub notifier: Arc<DiscordNotifier>,
    pub advisor: Option<Arc<Advisor>>,
    pub prefix: String,
    pub cycle_start_day: u32,
}

fn not_linked(prefix: &str) -> String {
    format!(
        "Your Discord account is not linked to a household profile yet. \
         Link it from the web app settings, then try `{prefix}help`."
    )
}

/// Handles one chat message from `discord_id`. Returns `None` for messages not
/// meant for the bot. User-facing failures come back as reply text; only
/// infrastructure errors are returned as `Err`.
pub async fn handle_message(
    ctx: &BotContext,
    discord_id: &str,
    message: &str,
) -> AppResult<Option<String>> {
    let command = match command::parse(&ctx.prefix, message) {
        None => return Ok(None),
        Some(Err(usage)) => return Ok(Some(usage)),
        Some(Ok(command)) => command,
    };

    if command == Command::Help {
        return Ok(Some(command::help_text(&ctx.prefix)));
    }

    let Some(user) = queries::get_user_by_discord_id(&ctx.pool, discord_id).await? else {
        return Ok(Some(not_linked(&ctx.prefix)));
    };

    tracing::debug!(user_id = user.id, ?command, "bot command");
    let today = Local::now().date_naive();
    match execute(ctx, &user, command, today).await {
        Ok(reply) => Ok(Some(reply)),
        Err(
            e @ (AppError::Validation(_)
            | AppError::NotFound(_)
            | AppError::RateLimited(_)
            | AppError::Unavailable(_)
            | AppError::Upstream(_)),
        ) => Ok(Some(format!(":warning: {}", e))),
        Err(e) => Err(e),
    }
}

async fn execute(ctx: &BotContext, user: &User, command: Command, today: NaiveDate) -> AppResult<String> {
    let cycle = BillingCycle::containing(today, ctx.cycle_start_day);

    match command {
        Command::Help => Ok(command::help_text(&ctx.prefix)),
        Command::Spend { amount, category, subcategory, note } => {
            spend(ctx, user, amount, &category, subcategory.as_deref(), note, today, cycle).await
        }
        Command::Income { amount, source, note } => income(ctx, user, amount, &source, note, today).await,
        Command::Summary => summary(ctx, user, cycle).await,
        Command::Budget => budgets(ctx, user, cycle).await,
        Command::Recent { limit } => recent(ctx, user, limit).await,
        Command::Categories => categories(ctx, user).await,
        Command::Report => {
            let summary = report::summarize(&ctx.pool, user.id, cycle).await?;
            Ok(report::render(&user.username, &summary))
        }
        Command::Advice => {
            let advisor = ctx
                .advisor
                .as_ref()
                .ok_or_else(|| AppError::Unavailable("the advisor is not configured".into()))?;
            let advice = advisor.advise(&ctx.pool, user, today, false).await?;
            Ok(advice.advice)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn spend(
    ctx: &BotContext,
    user: &User,
    amount: rust_decimal::Decimal,
    category_name: &str,
    subcategory_name: Option<&str>,
    note: Option<String>,
    today: NaiveDate,
    cycle: BillingCycle,
) -> AppResult<String> {
    let category = match queries::find_category_by_name(&ctx.pool, user.id, category_name).await? {
        Some(c) if c.kind() == CategoryKind::Expense => c,
        _ => {
            let names: Vec<String> = queries::list_categories(&ctx.pool, user.id)
                .await?
                .into_iter()
                .filter(|c| c.kind() == CategoryKind::Expense)
                .map(|c| c.name)
                .collect();
            return Err(AppError::NotFound(format!(
                "no expense category named '{category_name}'. Yours: {}",
                if names.is_empty() { "(none yet)".to_string() } else { names.join(", ") }
            )));
        }
    };

    let sub_category_id = match subcategory_name {
        None => None,
        Some(name) => Some(
            queries::find_subcategory_by_name(&ctx.pool, category.id, name)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("no subcategory '{name}' under '{}'", category.name))
                })?
                .id,
        ),
    };

    let saved = ledger::record_spending(
        &ctx.pool,
        user.id,
        NewSpending {
            category_id: category.id,
            sub_category_id,
            amount,
            description: note,
            spent_on: today,
        },
    )
    .await?;

    let store = MySqlAlertStore::new(ctx.pool.clone());
    if let Err(e) = budget::check_budgets(&store, ctx.notifier.as_ref(), user, cycle).await {
        tracing::warn!(user_id = user.id, error = %e, "budget check after bot spend failed");
    }

    let cycle_total = analytics::spending_total(&ctx.pool, user.id, cycle.start, cycle.end, None).await?;
    let target = match &saved.sub_category_name {
        Some(sub) => format!("{}/{}", saved.category_name, sub),
        None => saved.category_name.clone(),
    };
    Ok(format!(
        ":white_check_mark: Recorded {} in {target}. Spent this cycle: {}.",
        report::money(saved.amount),
        report::money(cycle_total)
    ))
}

async fn income(
    ctx: &BotContext,
    user: &User,
    amount: rust_decimal::Decimal,
    source_name: &str,
    note: Option<String>,
    today: NaiveDate,
) -> AppResult<String> {
    let source = match queries::find_income_source_by_name(&ctx.pool, user.id, source_name).await? {
        Some(s) => s,
        None => {
            let names: Vec<String> = queries::list_income_sources(&ctx.pool, user.id)
                .await?
                .into_iter()
                .map(|s| s.name)
                .collect();
            return Err(AppError::NotFound(format!(
                "no income source named '{source_name}'. Yours: {}",
                if names.is_empty() { "(none yet)".to_string() } else { names.join(", ") }
            )));
        }
    };

    let saved = ledger::record_income(
        &ctx.pool,
        user.id,
        NewIncome {
            source_id: source.id,
            amount,
            description: note,
            received_on: today,
        },
    )
    .await?;

    Ok(format!(
        ":moneybag: Recorded {} income from {}.",
        report::money(saved.amount),
        saved.source_name
    ))
}

async fn summary(ctx: &BotContext, user: &User, cycle: BillingCycle) -> AppResult<String> {
    let spent = analytics::spending_total(&ctx.pool, user.id, cycle.start, cycle.end, None).await?;
    let earned = analytics::income_total(&ctx.pool, user.id, cycle.start, cycle.end).await?;
    let by_category = analytics::spending_by_category(&ctx.pool, user.id, cycle.start, cycle.end).await?;

    let mut out = String::new();
    let _ = writeln!(out, "**{}**", cycle.label());
    let _ = writeln!(out, "Income {} | Spent {} | Net {}", report::money(earned), report::money(spent), report::money(earned - spent));
    for row in by_category.iter().take(5) {
        let _ = writeln!(out, "- {}: {}", row.category_name, report::money(row.total));
    }
    Ok(out.trim_end().to_string())
}

async fn budgets(ctx: &BotContext, user: &User, cycle: BillingCycle) -> AppResult<String> {
    let statuses = budget::budget_statuses(&ctx.pool, user.id, cycle).await?;
    if statuses.is_empty() {
        return Ok("No budgets set. Create one in the web app.".to_string());
    }

    let mut out = format!("**Budgets for {}**\n", cycle.label());
    for s in statuses {
        let icon = match s.level {
            BudgetLevel::Ok => ":green_circle:",
            BudgetLevel::Warning => ":yellow_circle:",
            BudgetLevel::Exceeded => ":red_circle:",
        };
        let _ = writeln!(
            out,
            "{icon} {}: {} / {} ({}%)",
            s.budget.category_name.as_deref().unwrap_or("Overall"),
            report::money(s.spent),
            report::money(s.budget.amount),
            s.percent_used
        );
    }
    Ok(out.trim_end().to_string())
}

async fn recent(ctx: &BotContext, user: &User, limit: i64) -> AppResult<String> {
    let rows = queries::recent_spendings(&ctx.pool, user.id, limit).await?;
    if rows.is_empty() {
        return Ok("No spendings recorded yet.".to_string());
    }
    let mut out = String::from("**Recent spendings**\n");
    for s in rows {
        let note = s.description.map(|d| format!(" ({d})")).unwrap_or_default();
        let _ = writeln!(
            out,
            "`#{}` {} {} {}{}",
            s.id,
            s.spent_on,
            s.category_name,
            report::money(s.amount),
            note
        );
    }
    Ok(out.trim_end().to_string())
}

async fn categories(ctx: &BotContext, user: &User) -> AppResult<String> {
    let cats = queries::list_categories(&ctx.pool, user.id).await?;
    if cats.is_empty() {
        return Ok("No categories yet. Create some in the web app.".to_string());
    }
    let subs = queries::list_user_subcategories(&ctx.pool, user.id).await?;

    let mut out = String::from("**Categories**\n");
    for c in cats {
        let names: Vec<&str> = subs
            .iter()
            .filter(|s| s.category_id == c.id)
            .map(|s| s.name.as_str())
            .collect();
        let _ = write!(out, "- {} ({})", c.name, c.kind);
        if !names.is_empty() {
            let _ = write!(out, ": {}", names.join(", "));
        }
        out.push('\n');
    }
    Ok(out.trim_end().to_string())
}
