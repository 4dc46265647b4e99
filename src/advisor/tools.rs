//! The single tool exposed to the model: `get_financial_metrics`.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{MySql, Pool};

use crate::database::db::analytics;
use crate::database::models::{CategoryTotal, SourceTotal};
use crate::error::{AppError, AppResult};

pub const FINANCIAL_METRICS_TOOL: &str = "get_financial_metrics";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub net: Decimal,
    /// Percent of income not spent; None when there was no income.
    pub savings_rate: Option<Decimal>,
    pub spending_by_category: Vec<CategoryMetric>,
    pub income_by_source: Vec<SourceMetric>,
}

/// Per-category line of the tool payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMetric {
    pub category_id: i64,
    pub category_name: String,
    pub total: Decimal,
    pub entries: i64,
}

impl From<CategoryTotal> for CategoryMetric {
    fn from(c: CategoryTotal) -> Self {
        Self {
            category_id: c.category_id,
            category_name: c.category_name,
            total: c.total,
            entries: c.entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetric {
    pub source_id: i64,
    pub source_name: String,
    pub total: Decimal,
    pub entries: i64,
}

impl From<SourceTotal> for SourceMetric {
    fn from(s: SourceTotal) -> Self {
        Self {
            source_id: s.source_id,
            source_name: s.source_name,
            total: s.total,
            entries: s.entries,
        }
    }
}

impl FinancialMetrics {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        spending_by_category: Vec<CategoryTotal>,
        income_by_source: Vec<SourceTotal>,
    ) -> Self {
        let total_spent: Decimal = spending_by_category.iter().map(|c| c.total).sum();
        let total_income: Decimal = income_by_source.iter().map(|s| s.total).sum();
        let net = total_income - total_spent;
        let savings_rate = (total_income > Decimal::ZERO)
            .then(|| (net * Decimal::ONE_HUNDRED / total_income).round_dp(1).normalize());

        Self {
            start_date,
            end_date,
            total_spent,
            total_income,
            net,
            savings_rate,
            spending_by_category: spending_by_category.into_iter().map(Into::into).collect(),
            income_by_source: income_by_source.into_iter().map(Into::into).collect(),
        }
    }
}

/// Where the tool reads its numbers from.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn financial_metrics(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<FinancialMetrics>;
}

pub struct MySqlMetrics {
    pool: Pool<MySql>,
}

impl MySqlMetrics {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricsSource for MySqlMetrics {
    async fn financial_metrics(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<FinancialMetrics> {
        let by_category = analytics::spending_by_category(&self.pool, user_id, start, end).await?;
        let by_source = analytics::income_by_source(&self.pool, user_id, start, end).await?;
        Ok(FinancialMetrics::new(start, end, by_category, by_source))
    }
}

/// Function declaration in Gemini's OpenAPI-subset schema.
pub fn financial_metrics_declaration() -> Value {
    json!({
        "name": FINANCIAL_METRICS_TOOL,
        "description": "Returns the user's total spending, total income, net savings, savings rate, \
spending grouped by category and income grouped by source for an inclusive date range.",
        "parameters": {
            "type": "OBJECT",
            "properties": {
                "startDate": {
                    "type": "STRING",
                    "description": "First day of the range, YYYY-MM-DD"
                },
                "endDate": {
                    "type": "STRING",
                    "description": "Last day of the range (inclusive), YYYY-MM-DD"
                }
            },
            "required": ["startDate", "endDate"]
        }
    })
}

fn date_arg(args: &Value, key: &str) -> AppResult<NaiveDate> {
    let raw = args
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation(format!("missing argument {key}")))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{key} must be YYYY-MM-DD, got {raw:?}")))
}

async fn call_financial_metrics(
    source: &dyn MetricsSource,
    user_id: i64,
    args: &Value,
) -> AppResult<Value> {
    let start = date_arg(args, "startDate")?;
    let end = date_arg(args, "endDate")?;
    if start > end {
        return Err(AppError::Validation("startDate must not be after endDate".into()));
    }
    let metrics = source.financial_metrics(user_id, start, end).await?;
    Ok(serde_json::to_value(metrics)?)
}

/// Runs a tool call requested by the model. Failures are reported back to the
/// model as `{"error": ...}` so it can correct itself.
pub async fn execute_tool(source: &dyn MetricsSource, user_id: i64, name: &str, args: &Value) -> Value {
    let result = match name {
        FINANCIAL_METRICS_TOOL => call_financial_metrics(source, user_id, args).await,
        other => Err(AppError::Validation(format!("unknown tool {other}"))),
    };

    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(tool = name, error = %e, "tool call failed");
            json!({ "error": e.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl MetricsSource for Fixed {
        async fn financial_metrics(
            &self,
            _user_id: i64,
            start: NaiveDate,
            end: NaiveDate,
        ) -> AppResult<FinancialMetrics> {
            Ok(FinancialMetrics::new(
                start,
                end,
                vec![CategoryTotal {
                    category_id: 1,
                    category_name: "Food".into(),
                    total: Decimal::from(250),
                    entries: 4,
                }],
                vec![SourceTotal {
                    source_id: 1,
                    source_name: "Salary".into(),
                    total: Decimal::from(1000),
                    entries: 1,
                }],
            ))
        }
    }

    #[test]
    fn metrics_derive_totals() {
        let m = FinancialMetrics::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            vec![],
            vec![],
        );
        assert_eq!(m.total_spent, Decimal::ZERO);
        assert!(m.savings_rate.is_none());
    }

    #[tokio::test]
    async fn executes_metrics_tool() {
        let args = json!({"startDate": "2024-01-01", "endDate": "2024-01-31"});
        let out = execute_tool(&Fixed, 1, FINANCIAL_METRICS_TOOL, &args).await;
        assert_eq!(out["totalSpent"], "250");
        assert_eq!(out["net"], "750");
        assert_eq!(
            out["savingsRate"].as_str().unwrap().parse::<Decimal>().unwrap(),
            Decimal::from(75)
        );
        assert_eq!(out["spendingByCategory"][0]["categoryName"], "Food");
        assert_eq!(out["incomeBySource"][0]["sourceName"], "Salary");
    }

    #[tokio::test]
    async fn payload_keys_are_camel_case_throughout() {
        let args = json!({"startDate": "2024-01-01", "endDate": "2024-01-31"});
        let out = execute_tool(&Fixed, 1, FINANCIAL_METRICS_TOOL, &args).await;
        let category = out["spendingByCategory"][0].as_object().unwrap();
        let source = out["incomeBySource"][0].as_object().unwrap();
        for key in out.as_object().unwrap().keys().chain(category.keys()).chain(source.keys()) {
            assert!(!key.contains('_'), "snake_case key {key} in tool payload");
        }
        assert_eq!(category["categoryId"], 1);
    }

    #[tokio::test]
    async fn bad_arguments_become_error_payloads() {
        let out = execute_tool(&Fixed, 1, FINANCIAL_METRICS_TOOL, &json!({"startDate": "Jan 1"})).await;
        assert!(out["error"].as_str().unwrap().contains("startDate"));

        let reversed = json!({"startDate": "2024-02-01", "endDate": "2024-01-01"});
        let out = execute_tool(&Fixed, 1, FINANCIAL_METRICS_TOOL, &reversed).await;
        assert!(out["error"].as_str().unwrap().contains("after"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let out = execute_tool(&Fixed, 1, "delete_everything", &json!({})).await;
        assert!(out["error"].as_str().unwrap().contains("unknown tool"));
    }

    #[test]
    fn declaration_requires_both_dates() {
        let decl = financial_metrics_declaration();
        assert_eq!(decl["name"], FINANCIAL_METRICS_TOOL);
        assert_eq!(decl["parameters"]["required"], json!(["startDate", "endDate"]));
    }
}
