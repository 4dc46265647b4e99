use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{MySql, Pool};

use crate::database::models::{CategoryTotal, MonthlyTotal, SourceTotal, SpendingView};

// ====================Aggregate Queries======================

/// Sum of spendings in `[from, to]`, optionally for a single category.
pub async fn spending_total(
    pool: &Pool<MySql>,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
    category_id: Option<i64>,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM spendings
        WHERE user_id = ?
          AND spent_on BETWEEN ? AND ?
          AND (? IS NULL OR category_id = ?)
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .bind(category_id)
    .bind(category_id)
    .fetch_one(pool)
    .await
}

pub async fn income_total(
    pool: &Pool<MySql>,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM income
        WHERE user_id = ? AND received_on BETWEEN ? AND ?
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}

pub async fn spending_by_category(
    pool: &Pool<MySql>,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<CategoryTotal>, sqlx::Error> {
    sqlx::query_as::<_, CategoryTotal>(
        r#"
        SELECT
            c.id AS category_id,
            c.name AS category_name,
            SUM(s.amount) AS total,
            COUNT(*) AS entries
        FROM spendings s
        JOIN category c ON c.id = s.category_id
        WHERE s.user_id = ? AND s.spent_on BETWEEN ? AND ?
        GROUP BY c.id, c.name
        ORDER BY total DESC
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub async fn income_by_source(
    pool: &Pool<MySql>,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<SourceTotal>, sqlx::Error> {
    sqlx::query_as::<_, SourceTotal>(
        r#"
        SELECT
            src.id AS source_id,
            src.name AS source_name,
            SUM(i.amount) AS total,
            COUNT(*) AS entries
        FROM income i
        JOIN incomeSource src ON src.id = i.source_id
        WHERE i.user_id = ? AND i.received_on BETWEEN ? AND ?
        GROUP BY src.id, src.name
        ORDER BY total DESC
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub async fn largest_spendings(
    pool: &Pool<MySql>,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
    limit: i64,
) -> Result<Vec<SpendingView>, sqlx::Error> {
    sqlx::query_as::<_, SpendingView>(
        r#"
        SELECT
            s.id,
            s.category_id,
            c.name AS category_name,
            s.sub_category_id,
            sc.name AS sub_category_name,
            s.amount,
            s.description,
            s.spent_on,
            s.created_at
        FROM spendings s
        JOIN category c ON c.id = s.category_id
        LEFT JOIN subCategory sc ON sc.id = s.sub_category_id
        WHERE s.user_id = ? AND s.spent_on BETWEEN ? AND ?
        ORDER BY s.amount DESC, s.id ASC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Per-month spending and income for a calendar year, every month present.
pub async fn monthly_totals(
    pool: &Pool<MySql>,
    user_id: i64,
    year: i32,
) -> Result<Vec<MonthlyTotal>, sqlx::Error> {
    let spent: Vec<(String, Decimal)> = sqlx::query_as(
        r#"
        SELECT DATE_FORMAT(spent_on, '%Y-%m') AS month, SUM(amount) AS total
        FROM spendings
        WHERE user_id = ? AND YEAR(spent_on) = ?
        GROUP BY month
        "#,
    )
    .bind(user_id)
    .bind(year)
    .fetch_all(pool)
    .await?;

    let earned: Vec<(String, Decimal)> = sqlx::query_as(
        r#"
        SELECT DATE_FORMAT(received_on, '%Y-%m') AS month, SUM(amount) AS total
        FROM income
        WHERE user_id = ? AND YEAR(received_on) = ?
        GROUP BY month
        "#,
    )
    .bind(user_id)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(merge_monthly(year, &spent, &earned))
}

fn merge_monthly(year: i32, spent: &[(String, Decimal)], earned: &[(String, Decimal)]) -> Vec<MonthlyTotal> {
    let lookup = |rows: &[(String, Decimal)], key: &str| {
        rows.iter()
            .find(|(month, _)| month == key)
            .map(|(_, total)| *total)
            .unwrap_or(Decimal::ZERO)
    };

    (1..=12)
        .map(|m| {
            let month = format!("{year:04}-{m:02}");
            MonthlyTotal {
                spent: lookup(spent, &month),
                earned: lookup(earned, &month),
                month,
            }
        })
        .collect()
}
