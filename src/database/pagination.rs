//! page/limit query parameters and the paginated response envelope.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub fn validate(&self) -> AppResult<Page> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".into()));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        if (page - 1).checked_mul(limit).is_none() {
            return Err(AppError::Validation("page is too large".into()));
        }
        Ok(Page { page, limit })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_LIMIT }
    }
}

impl Page {
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: Page, total: i64) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            (total + page.limit - 1) / page.limit
        };
        Self {
            data,
            pagination: PageInfo {
                page: page.page,
                limit: page.limit,
                total,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_missing() {
        let p = PageParams { page: None, limit: None }.validate().unwrap();
        assert_eq!(p, Page { page: 1, limit: DEFAULT_LIMIT });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn offset_follows_page() {
        let p = PageParams { page: Some(3), limit: Some(25) }.validate().unwrap();
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(PageParams { page: Some(0), limit: None }.validate().is_err());
        assert!(PageParams { page: None, limit: Some(0) }.validate().is_err());
        assert!(PageParams { page: None, limit: Some(MAX_LIMIT + 1) }.validate().is_err());
    }

    #[test]
    fn huge_page_is_rejected_instead_of_overflowing() {
        assert!(PageParams { page: Some(i64::MAX), limit: Some(10) }.validate().is_err());
        // still representable: allowed, and the query simply returns no rows
        let far = PageParams { page: Some(i64::MAX / 100), limit: Some(100) }.validate().unwrap();
        assert!(far.offset() > 0);
        // hand-built pages never panic
        assert_eq!(Page { page: i64::MAX, limit: MAX_LIMIT }.offset(), i64::MAX);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page { page: 1, limit: 10 };
        assert_eq!(Paginated::<i32>::new(vec![], page, 0).pagination.total_pages, 0);
        assert_eq!(Paginated::<i32>::new(vec![], page, 10).pagination.total_pages, 1);
        assert_eq!(Paginated::<i32>::new(vec![], page, 11).pagination.total_pages, 2);
    }

    #[test]
    fn serializes_camel_case_page_info() {
        let json = serde_json::to_value(Paginated::new(vec![1, 2], Page::default(), 2)).unwrap();
        assert_eq!(json["pagination"]["totalPages"], 1);
        assert_eq!(json["data"][1], 2);
    }
}
