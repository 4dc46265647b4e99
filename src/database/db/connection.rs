use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool};
use std::time::Duration;

use crate::config::AppConfig;

pub async fn get_db_pool(config: &AppConfig) -> Result<Pool<MySql>, sqlx::Error> {
    tracing::info!(max_connections = config.db_max_connections, "connecting to MySQL");

    MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
}

/// Pool that only connects on first use; lets the router be built without a live server.
pub fn lazy_pool(database_url: &str) -> Result<Pool<MySql>, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(database_url)
}
