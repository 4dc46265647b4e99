use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{MySql, Pool};

use crate::database::models::{AdvisorContext, CycleReport, GeminiUsage};
use crate::database::pagination::Page;

// ====================Report log Queries======================

pub async fn is_report_logged(
    pool: &Pool<MySql>,
    user_id: i64,
    report_type: &str,
    period_key: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM report_logs WHERE user_id = ? AND report_type = ? AND period_key = ?",
    )
    .bind(user_id)
    .bind(report_type)
    .bind(period_key)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

// Returns false when the entry was already there
pub async fn log_report(
    pool: &Pool<MySql>,
    user_id: i64,
    report_type: &str,
    period_key: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT IGNORE INTO report_logs (user_id, report_type, period_key)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(report_type)
    .bind(period_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ====================Cycle report Queries======================

pub async fn save_cycle_report(
    pool: &Pool<MySql>,
    user_id: i64,
    cycle_start: NaiveDate,
    cycle_end: NaiveDate,
    total_spent: Decimal,
    total_income: Decimal,
    content: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO cycle_reports (user_id, cycle_start, cycle_end, total_spent, total_income, content)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            cycle_end = VALUES(cycle_end),
            total_spent = VALUES(total_spent),
            total_income = VALUES(total_income),
            content = VALUES(content),
            created_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .bind(cycle_start)
    .bind(cycle_end)
    .bind(total_spent)
    .bind(total_income)
    .bind(content)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_cycle_reports(
    pool: &Pool<MySql>,
    user_id: i64,
    page: Page,
) -> Result<(Vec<CycleReport>, i64), sqlx::Error> {
    let rows = sqlx::query_as::<_, CycleReport>(
        r#"
        SELECT id, user_id, cycle_start, cycle_end, total_spent, total_income, content, created_at
        FROM cycle_reports
        WHERE user_id = ?
        ORDER BY cycle_start DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cycle_reports WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

// ====================Advisor Queries======================

pub async fn get_advisor_context(
    pool: &Pool<MySql>,
    user_id: i64,
    date: NaiveDate,
) -> Result<Option<AdvisorContext>, sqlx::Error> {
    sqlx::query_as::<_, AdvisorContext>(
        r#"
        SELECT id, user_id, context_date, advice, created_at
        FROM advisor_context
        WHERE user_id = ? AND context_date = ?
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

pub async fn save_advisor_context(
    pool: &Pool<MySql>,
    user_id: i64,
    date: NaiveDate,
    advice: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO advisor_context (user_id, context_date, advice)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE advice = VALUES(advice), created_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .bind(date)
    .bind(advice)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_gemini_usage(
    pool: &Pool<MySql>,
    user_id: i64,
    date: NaiveDate,
) -> Result<Option<GeminiUsage>, sqlx::Error> {
    sqlx::query_as::<_, GeminiUsage>(
        r#"
        SELECT user_id, usage_date, request_count, prompt_tokens, output_tokens
        FROM gemini_usage
        WHERE user_id = ? AND usage_date = ?
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

pub async fn record_gemini_usage(
    pool: &Pool<MySql>,
    user_id: i64,
    date: NaiveDate,
    requests: i64,
    prompt_tokens: i64,
    output_tokens: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO gemini_usage (user_id, usage_date, request_count, prompt_tokens, output_tokens)
        VALUES (?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            request_count = request_count + VALUES(request_count),
            prompt_tokens = prompt_tokens + VALUES(prompt_tokens),
            output_tokens = output_tokens + VALUES(output_tokens)
        "#,
    )
    .bind(user_id)
    .bind(date)
    .bind(requests)
    .bind(prompt_tokens)
    .bind(output_tokens)
    .execute(pool)
    .await?;

    Ok(())
}
