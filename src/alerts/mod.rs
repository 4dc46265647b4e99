pub mod budget;
pub mod report;
pub mod scheduler;
pub mod store;
