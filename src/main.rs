// src/main.rs
use anyhow::{bail, Context};
use chrono::Local;
use dotenvy::dotenv;
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use household_finance::advisor::Advisor;
use household_finance::alerts::scheduler;
use household_finance::alerts::store::MySqlAlertStore;
use household_finance::backend::{self, AppState};
use household_finance::bot::{self, DiscordNotifier};
use household_finance::config::AppConfig;
use household_finance::database;

const USAGE: &str = "usage: household-finance [server | bot <discord_id> | check]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "household_finance=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mode = args.first().map(String::as_str).unwrap_or("server");
    if !matches!(mode, "server" | "bot" | "check") {
        bail!("unknown mode `{mode}`\n{USAGE}");
    }

    let config = AppConfig::from_env().context("invalid configuration")?;

    let pool = database::db::connection::get_db_pool(&config)
        .await
        .context("could not connect to MySQL")?;
    database::db::migrate::run_migrations(&pool)
        .await
        .context("database migrations failed")?;

    let notifier = DiscordNotifier::new(config.discord_webhook_url.clone())?;
    let advisor = Advisor::from_config(&config.gemini, config.cycle_start_day)?;
    let state = AppState::new(pool, config, notifier, advisor);

    match mode {
        "bot" => {
            let Some(discord_id) = args.get(1) else {
                bail!("bot mode needs a Discord user id\n{USAGE}");
            };
            bot::console::run(state.bot_context(), discord_id.clone()).await?;
        }
        "check" => {
            let outcome = scheduler::run_daily_check(
                &MySqlAlertStore::new(state.db.clone()),
                state.notifier.as_ref(),
                Local::now().date_naive(),
                state.config.cycle_start_day,
            )
            .await?;
            println!("{outcome:?}");
        }
        _ => {
            tracing::info!("Starting backend server...");
            let _scheduler = scheduler::spawn_daily_scheduler(
                state.db.clone(),
                state.notifier.clone(),
                state.config.cycle_start_day,
                state.config.daily_check_hour,
            );
            backend::run_server(state).await?;
        }
    }

    Ok(())
}
