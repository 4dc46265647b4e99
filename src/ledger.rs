//! Validated write paths shared by the HTTP handlers and the bot dispatcher.

use rust_decimal::Decimal;
use sqlx::{MySql, Pool};

use crate::database::db::queries;
use crate::database::models::{CategoryKind, IncomeView, NewIncome, NewSpending, SpendingView};
use crate::error::{AppError, AppResult};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 255;

pub fn validate_amount(amount: Decimal) -> AppResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("amount must be greater than zero".into()));
    }
    if amount.scale() > 2 && amount.round_dp(2) != amount {
        return Err(AppError::Validation("amount has more than two decimal places".into()));
    }
    Ok(amount.round_dp(2))
}

/// Trimmed, non-empty, bounded name.
pub fn clean_name(raw: &str, what: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation(format!("{what} name must not be empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "{what} name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn clean_description(raw: Option<String>) -> AppResult<Option<String>> {
    let Some(text) = raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(Some(text))
}

/// Field-level checks that need no database.
pub fn normalize_spending(mut s: NewSpending) -> AppResult<NewSpending> {
    s.amount = validate_amount(s.amount)?;
    s.description = clean_description(s.description)?;
    Ok(s)
}

pub fn normalize_income(mut inc: NewIncome) -> AppResult<NewIncome> {
    inc.amount = validate_amount(inc.amount)?;
    inc.description = clean_description(inc.description)?;
    Ok(inc)
}

/// Ownership and consistency checks: the category is the caller's and is an
/// expense category, and the subcategory (if any) hangs under that category.
pub async fn check_spending_refs(
    pool: &Pool<MySql>,
    user_id: i64,
    s: &NewSpending,
) -> AppResult<()> {
    let category = queries::get_category(pool, user_id, s.category_id)
        .await?
        .ok_or_else(|| AppError::Validation(format!("unknown category {}", s.category_id)))?;

    if category.kind() != CategoryKind::Expense {
        return Err(AppError::Validation(format!(
            "category '{}' is not an expense category",
            category.name
        )));
    }

    if let Some(sub_id) = s.sub_category_id {
        let sub = queries::get_subcategory(pool, user_id, sub_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("unknown subcategory {sub_id}")))?;
        if sub.category_id != category.id {
            return Err(AppError::Validation(format!(
                "subcategory '{}' does not belong to category '{}'",
                sub.name, category.name
            )));
        }
    }
    Ok(())
}

pub async fn record_spending(
    pool: &Pool<MySql>,
    user_id: i64,
    spending: NewSpending,
) -> AppResult<SpendingView> {
    let spending = normalize_spending(spending)?;
    check_spending_refs(pool, user_id, &spending).await?;

    let id = queries::create_spending(pool, user_id, &spending).await?;
    tracing::info!(user_id, spending_id = id, amount = %spending.amount, "spending recorded");

    queries::get_spending(pool, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("spending", id))
}

pub async fn record_income(
    pool: &Pool<MySql>,
    user_id: i64,
    income: NewIncome,
) -> AppResult<IncomeView> {
    let income = normalize_income(income)?;
    if queries::get_income_source(pool, user_id, income.source_id).await?.is_none() {
        return Err(AppError::Validation(format!("unknown income source {}", income.source_id)));
    }

    let id = queries::create_income(pool, user_id, &income).await?;
    tracing::info!(user_id, income_id = id, amount = %income.amount, "income recorded");

    queries::get_income(pool, user_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("income", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(dec("-3.10")).is_err());
        assert_eq!(validate_amount(dec("12.5")).unwrap(), dec("12.50"));
    }

    #[test]
    fn amount_rejects_sub_cent_precision() {
        assert!(validate_amount(dec("1.005")).is_err());
        assert_eq!(validate_amount(dec("1.500")).unwrap(), dec("1.50"));
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(clean_name("  Groceries ", "category").unwrap(), "Groceries");
        assert!(clean_name("   ", "category").is_err());
        assert!(clean_name(&"x".repeat(MAX_NAME_LEN + 1), "category").is_err());
    }

    #[test]
    fn blank_description_becomes_none() {
        assert_eq!(clean_description(Some("   ".into())).unwrap(), None);
        assert_eq!(clean_description(Some(" milk ".into())).unwrap(), Some("milk".into()));
        assert!(clean_description(Some("y".repeat(MAX_DESCRIPTION_LEN + 1))).is_err());
    }

    #[test]
    fn normalize_spending_applies_all_field_checks() {
        let s = NewSpending {
            category_id: 1,
            sub_category_id: None,
            amount: dec("4"),
            description: Some("".into()),
            spent_on: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };
        let s = normalize_spending(s).unwrap();
        assert_eq!(s.amount, dec("4.00"));
        assert!(s.description.is_none());
    }
}
