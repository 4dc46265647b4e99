use sqlx::{MySql, Pool};
use rust_decimal::Decimal;
use crate::database::models::{
    Budget, Category, CategoryKind, IncomeFilter, IncomeSource, IncomeView, NewIncome,
    NewSpending, NewUser, SpendingFilter, SpendingView, SubCategory, User,
};
use crate::database::pagination::Page;
/*
Parameterized CRUD against the MySQL schema.
Every query that touches user data takes the owning user_id and filters on it,
so a row belonging to someone else looks exactly like a missing row.
 */

 /*==========User Queries=========== */

pub async fn create_user(pool: &Pool<MySql>, user: &NewUser) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, discord_id)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user.username.trim())
    .bind(user.email.as_deref())
    .bind(user.discord_id.as_deref())
    .execute(pool)
    .await?;

    Ok(result.last_insert_id() as i64)
}

pub async fn get_user(pool: &Pool<MySql>, user_id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, discord_id, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_user_by_discord_id(
    pool: &Pool<MySql>,
    discord_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, discord_id, created_at FROM users WHERE discord_id = ?",
    )
    .bind(discord_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_users(pool: &Pool<MySql>) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, discord_id, created_at FROM users ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await
}

// Link (Some) or unlink (None) a Discord account
pub async fn set_discord_id(
    pool: &Pool<MySql>,
    user_id: i64,
    discord_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET discord_id = ? WHERE id = ?")
        .bind(discord_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    // MySQL reports 0 affected rows when the value did not change
    if result.rows_affected() > 0 {
        return Ok(true);
    }
    Ok(get_user(pool, user_id).await?.is_some())
}

 /*==========Category Queries=========== */

pub async fn create_category(
    pool: &Pool<MySql>,
    user_id: i64,
    name: &str,
    kind: CategoryKind,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO category (user_id, name, kind)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(kind.as_str())
    .execute(pool)
    .await?;

    Ok(result.last_insert_id() as i64)
}

pub async fn list_categories(pool: &Pool<MySql>, user_id: i64) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, user_id, name, kind, created_at
        FROM category
        WHERE user_id = ?
        ORDER BY name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_category(
    pool: &Pool<MySql>,
    user_id: i64,
    category_id: i64,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, user_id, name, kind, created_at
        FROM category
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(category_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_category_by_name(
    pool: &Pool<MySql>,
    user_id: i64,
    name: &str,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, user_id, name, kind, created_at
        FROM category
        WHERE user_id = ? AND LOWER(name) = LOWER(?)
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn rename_category(
    pool: &Pool<MySql>,
    user_id: i64,
    category_id: i64,
    name: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE category SET name = ? WHERE id = ? AND user_id = ?")
        .bind(name)
        .bind(category_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }
    Ok(get_category(pool, user_id, category_id).await?.is_some())
}

// Fails with a FK error while spendings still reference the category
pub async fn delete_category(
    pool: &Pool<MySql>,
    user_id: i64,
    category_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM category WHERE id = ? AND user_id = ?")
        .bind(category_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

 /*==========SubCategory Queries=========== */

pub async fn create_subcategory(
    pool: &Pool<MySql>,
    category_id: i64,
    name: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO subCategory (category_id, name) VALUES (?, ?)")
        .bind(category_id)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.last_insert_id() as i64)
}

pub async fn list_subcategories(
    pool: &Pool<MySql>,
    category_id: i64,
) -> Result<Vec<SubCategory>, sqlx::Error> {
    sqlx::query_as::<_, SubCategory>(
        "SELECT id, category_id, name FROM subCategory WHERE category_id = ? ORDER BY name ASC",
    )
    .bind(category_id)
    .fetch_all(pool)
    .await
}

// All subcategories of all of a user's categories, for grouping in one pass
pub async fn list_user_subcategories(
    pool: &Pool<MySql>,
    user_id: i64,
) -> Result<Vec<SubCategory>, sqlx::Error> {
    sqlx::query_as::<_, SubCategory>(
        r#"
        SELECT s.id, s.category_id, s.name
        FROM subCategory s
        JOIN category c ON c.id = s.category_id
        WHERE c.user_id = ?
        ORDER BY s.name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_subcategory(
    pool: &Pool<MySql>,
    user_id: i64,
    sub_category_id: i64,
) -> Result<Option<SubCategory>, sqlx::Error> {
    sqlx::query_as::<_, SubCategory>(
        r#"
        SELECT s.id, s.category_id, s.name
        FROM subCategory s
        JOIN category c ON c.id = s.category_id
        WHERE s.id = ? AND c.user_id = ?
        "#,
    )
    .bind(sub_category_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_subcategory_by_name(
    pool: &Pool<MySql>,
    category_id: i64,
    name: &str,
) -> Result<Option<SubCategory>, sqlx::Error> {
    sqlx::query_as::<_, SubCategory>(
        r#"
        SELECT id, category_id, name
        FROM subCategory
        WHERE category_id = ? AND LOWER(name) = LOWER(?)
        "#,
    )
    .bind(category_id)
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn delete_subcategory(
    pool: &Pool<MySql>,
    user_id: i64,
    sub_category_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE s FROM subCategory s
        JOIN category c ON c.id = s.category_id
        WHERE s.id = ? AND c.user_id = ?
        "#,
    )
    .bind(sub_category_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

 /*==========Spending Queries=========== */

const SPENDING_VIEW_SELECT: &str = r#"
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
"#;

pub async fn create_spending(
    pool: &Pool<MySql>,
    user_id: i64,
    s: &NewSpending,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO spendings (user_id, category_id, sub_category_id, amount, description, spent_on)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(s.category_id)
    .bind(s.sub_category_id)
    .bind(s.amount)
    .bind(s.description.as_deref())
    .bind(s.spent_on)
    .execute(pool)
    .await?;

    Ok(result.last_insert_id() as i64)
}

pub async fn get_spending(
    pool: &Pool<MySql>,
    user_id: i64,
    spending_id: i64,
) -> Result<Option<SpendingView>, sqlx::Error> {
    let sql = format!("{SPENDING_VIEW_SELECT} WHERE s.id = ? AND s.user_id = ?");
    sqlx::query_as::<_, SpendingView>(&sql)
        .bind(spending_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

// Returns one page of spendings plus the total row count for the same filter
pub async fn list_spendings(
    pool: &Pool<MySql>,
    user_id: i64,
    filter: &SpendingFilter,
    page: Page,
) -> Result<(Vec<SpendingView>, i64), sqlx::Error> {
    const WHERE: &str = r#"
        WHERE s.user_id = ?
          AND (? IS NULL OR s.spent_on >= ?)
          AND (? IS NULL OR s.spent_on <= ?)
          AND (? IS NULL OR s.category_id = ?)
    "#;

    let sql = format!(
        "{SPENDING_VIEW_SELECT} {WHERE} ORDER BY s.spent_on DESC, s.id DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<_, SpendingView>(&sql)
        .bind(user_id)
        .bind(filter.from).bind(filter.from)
        .bind(filter.to).bind(filter.to)
        .bind(filter.category_id).bind(filter.category_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM spendings s {WHERE}");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(user_id)
        .bind(filter.from).bind(filter.from)
        .bind(filter.to).bind(filter.to)
        .bind(filter.category_id).bind(filter.category_id)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

pub async fn recent_spendings(
    pool: &Pool<MySql>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<SpendingView>, sqlx::Error> {
    let sql = format!(
        "{SPENDING_VIEW_SELECT} WHERE s.user_id = ? ORDER BY s.spent_on DESC, s.id DESC LIMIT ?"
    );
    sqlx::query_as::<_, SpendingView>(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn update_spending(
    pool: &Pool<MySql>,
    user_id: i64,
    spending_id: i64,
    s: &NewSpending,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE spendings
        SET category_id = ?, sub_category_id = ?, amount = ?, description = ?, spent_on = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(s.category_id)
    .bind(s.sub_category_id)
    .bind(s.amount)
    .bind(s.description.as_deref())
    .bind(s.spent_on)
    .bind(spending_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }
    Ok(get_spending(pool, user_id, spending_id).await?.is_some())
}

pub async fn delete_spending(
    pool: &Pool<MySql>,
    user_id: i64,
    spending_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM spendings WHERE id = ? AND user_id = ?")
        .bind(spending_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

 /*==========Income Source Queries=========== */

pub async fn create_income_source(
    pool: &Pool<MySql>,
    user_id: i64,
    name: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO incomeSource (user_id, name) VALUES (?, ?)")
        .bind(user_id)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.last_insert_id() as i64)
}

pub async fn list_income_sources(
    pool: &Pool<MySql>,
    user_id: i64,
) -> Result<Vec<IncomeSource>, sqlx::Error> {
    sqlx::query_as::<_, IncomeSource>(
        "SELECT id, user_id, name, created_at FROM incomeSource WHERE user_id = ? ORDER BY name ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_income_source(
    pool: &Pool<MySql>,
    user_id: i64,
    source_id: i64,
) -> Result<Option<IncomeSource>, sqlx::Error> {
    sqlx::query_as::<_, IncomeSource>(
        "SELECT id, user_id, name, created_at FROM incomeSource WHERE id = ? AND user_id = ?",
    )
    .bind(source_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_income_source_by_name(
    pool: &Pool<MySql>,
    user_id: i64,
    name: &str,
) -> Result<Option<IncomeSource>, sqlx::Error> {
    sqlx::query_as::<_, IncomeSource>(
        r#"
        SELECT id, user_id, name, created_at
        FROM incomeSource
        WHERE user_id = ? AND LOWER(name) = LOWER(?)
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn delete_income_source(
    pool: &Pool<MySql>,
    user_id: i64,
    source_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM incomeSource WHERE id = ? AND user_id = ?")
        .bind(source_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

 /*==========Income Queries=========== */

const INCOME_VIEW_SELECT: &str = r#"
    SELECT
        i.id,
        i.source_id,
        src.name AS source_name,
        i.amount,
        i.description,
        i.received_on,
        i.created_at
    FROM income i
    JOIN incomeSource src ON src.id = i.source_id
"#;

pub async fn create_income(
    pool: &Pool<MySql>,
    user_id: i64,
    inc: &NewIncome,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO income (user_id, source_id, amount, description, received_on)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(inc.source_id)
    .bind(inc.amount)
    .bind(inc.description.as_deref())
    .bind(inc.received_on)
    .execute(pool)
    .await?;

    Ok(result.last_insert_id() as i64)
}

pub async fn get_income(
    pool: &Pool<MySql>,
    user_id: i64,
    income_id: i64,
) -> Result<Option<IncomeView>, sqlx::Error> {
    let sql = format!("{INCOME_VIEW_SELECT} WHERE i.id = ? AND i.user_id = ?");
    sqlx::query_as::<_, IncomeView>(&sql)
        .bind(income_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_income(
    pool: &Pool<MySql>,
    user_id: i64,
    filter: &IncomeFilter,
    page: Page,
) -> Result<(Vec<IncomeView>, i64), sqlx::Error> {
    const WHERE: &str = r#"
        WHERE i.user_id = ?
          AND (? IS NULL OR i.received_on >= ?)
          AND (? IS NULL OR i.received_on <= ?)
          AND (? IS NULL OR i.source_id = ?)
    "#;

    let sql = format!(
        "{INCOME_VIEW_SELECT} {WHERE} ORDER BY i.received_on DESC, i.id DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<_, IncomeView>(&sql)
        .bind(user_id)
        .bind(filter.from).bind(filter.from)
        .bind(filter.to).bind(filter.to)
        .bind(filter.source_id).bind(filter.source_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM income i {WHERE}");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(user_id)
        .bind(filter.from).bind(filter.from)
        .bind(filter.to).bind(filter.to)
        .bind(filter.source_id).bind(filter.source_id)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

pub async fn update_income(
    pool: &Pool<MySql>,
    user_id: i64,
    income_id: i64,
    inc: &NewIncome,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE income
        SET source_id = ?, amount = ?, description = ?, received_on = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(inc.source_id)
    .bind(inc.amount)
    .bind(inc.description.as_deref())
    .bind(inc.received_on)
    .bind(income_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }
    Ok(get_income(pool, user_id, income_id).await?.is_some())
}

pub async fn delete_income(
    pool: &Pool<MySql>,
    user_id: i64,
    income_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM income WHERE id = ? AND user_id = ?")
        .bind(income_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ====================Budget Queries======================

const BUDGET_SELECT: &str = r#"
    SELECT
        b.id,
        b.user_id,
        b.category_id,
        c.name AS category_name,
        b.amount,
        b.alert_threshold,
        b.created_at
    FROM budget b
    LEFT JOIN category c ON c.id = b.category_id
"#;

/* One budget per (user, category); the household-wide budget has a NULL category,
which the unique key does not cover, so the lookup uses the NULL-safe <=> operator. */
pub async fn upsert_budget(
    pool: &Pool<MySql>,
    user_id: i64,
    category_id: Option<i64>,
    amount: Decimal,
    alert_threshold: Decimal,
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM budget WHERE user_id = ? AND category_id <=> ? FOR UPDATE",
    )
    .bind(user_id)
    .bind(category_id)
    .fetch_optional(&mut *tx)
    .await?;

    let id = match existing {
        Some(id) => {
            sqlx::query("UPDATE budget SET amount = ?, alert_threshold = ? WHERE id = ?")
                .bind(amount)
                .bind(alert_threshold)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            id
        }
        None => {
            let result = sqlx::query(
                r#"
                INSERT INTO budget (user_id, category_id, amount, alert_threshold)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(category_id)
            .bind(amount)
            .bind(alert_threshold)
            .execute(&mut *tx)
            .await?;
            result.last_insert_id() as i64
        }
    };

    tx.commit().await?;

    Ok(id)
}

pub async fn list_budgets(pool: &Pool<MySql>, user_id: i64) -> Result<Vec<Budget>, sqlx::Error> {
    let sql = format!("{BUDGET_SELECT} WHERE b.user_id = ? ORDER BY b.category_id IS NOT NULL, c.name ASC");
    sqlx::query_as::<_, Budget>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn get_budget(
    pool: &Pool<MySql>,
    user_id: i64,
    budget_id: i64,
) -> Result<Option<Budget>, sqlx::Error> {
    let sql = format!("{BUDGET_SELECT} WHERE b.id = ? AND b.user_id = ?");
    sqlx::query_as::<_, Budget>(&sql)
        .bind(budget_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_budget(
    pool: &Pool<MySql>,
    user_id: i64,
    budget_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM budget WHERE id = ? AND user_id = ?")
        .bind(budget_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
