use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    #[default]
    Expense,
    Income,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("expense") {
            Ok(Self::Expense)
        } else if s.eq_ignore_ascii_case("income") {
            Ok(Self::Income)
        } else {
            Err(format!("unknown category kind: {s}"))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: String, // 'expense' or 'income'
    pub created_at: NaiveDateTime,
}

impl Category {
    pub fn kind(&self) -> CategoryKind {
        self.kind.parse().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubCategory {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithSubs {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<SubCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub kind: CategoryKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Expense".parse::<CategoryKind>().unwrap(), CategoryKind::Expense);
        assert_eq!("INCOME".parse::<CategoryKind>().unwrap(), CategoryKind::Income);
        assert!("salary".parse::<CategoryKind>().is_err());
    }

    #[test]
    fn new_category_defaults_to_expense() {
        let c: NewCategory = serde_json::from_str(r#"{"name":"Groceries"}"#).unwrap();
        assert_eq!(c.kind, CategoryKind::Expense);
    }
}
