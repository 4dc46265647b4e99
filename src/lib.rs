pub mod advisor;
pub mod alerts;
pub mod backend;
pub mod bot;
pub mod config;
pub mod cycle;
pub mod database;
pub mod error;
pub mod ledger;
