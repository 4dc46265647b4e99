pub mod advisor;
pub mod bot;
pub mod budgets;
pub mod categories;
pub mod income;
pub mod reports;
pub mod spendings;
pub mod users;

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};

/// Rejects a date range whose start is after its end.
pub(crate) fn check_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> AppResult<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(AppError::Validation(
            "`from` must not be after `to`".into(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_ranges_are_allowed() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(check_range(None, None).is_ok());
        assert!(check_range(Some(d), None).is_ok());
        assert!(check_range(Some(d), Some(d)).is_ok());
        assert!(check_range(Some(d), d.pred_opt()).is_err());
    }
}
