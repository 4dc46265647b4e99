pub mod analytics;
pub mod connection;
pub mod logs;
pub mod migrate;
pub mod queries;
