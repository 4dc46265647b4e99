mod extract;
mod handlers;
mod routes;

pub use extract::UserId;

use axum::{routing::get, Router};
use chrono::{Local, NaiveDate};
use sqlx::{MySql, Pool};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::advisor::Advisor;
use crate::bot::{BotContext, DiscordNotifier};
use crate::config::AppConfig;
use crate::cycle::BillingCycle;
use crate::error::AppResult;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<MySql>,
    pub config: Arc<AppConfig>,
    pub notifier: Arc<DiscordNotifier>,
    pub advisor: Option<Arc<Advisor>>,
}

impl AppState {
    pub fn new(
        db: Pool<MySql>,
        config: AppConfig,
        notifier: DiscordNotifier,
        advisor: Option<Advisor>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            notifier: Arc::new(notifier),
            advisor: advisor.map(Arc::new),
        }
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn current_cycle(&self) -> BillingCycle {
        BillingCycle::containing(self.today(), self.config.cycle_start_day)
    }

    pub fn bot_context(&self) -> BotContext {
        BotContext {
            pool: self.db.clone(),
            notifier: self.notifier.clone(),
            advisor: self.advisor.clone(),
            prefix: self.config.bot_prefix.clone(),
            cycle_start_day: self.config.cycle_start_day,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(state: AppState) -> AppResult<()> {
    let addr = state.config.bind_addr;
    let app = build_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
