pub mod user;
pub mod category;
pub mod spending;
pub mod income;
pub mod budget;
pub mod advisor;
pub mod report;

pub use user::{NewUser, User};
pub use category::{Category, CategoryKind, CategoryWithSubs, NewCategory, SubCategory};
pub use spending::{NewSpending, Spending, SpendingFilter, SpendingView};
pub use income::{Income, IncomeFilter, IncomeSource, IncomeView, NewIncome};
pub use budget::{Budget, BudgetLevel, BudgetStatus, NewBudget};
pub use advisor::{AdvisorContext, GeminiUsage};
pub use report::{CategoryTotal, CycleReport, MonthlyTotal, SourceTotal};
