use sqlx::{MySql, Pool};

use crate::error::AppResult;

pub async fn run_migrations(pool: &Pool<MySql>) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}
