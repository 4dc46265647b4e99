use axum::{
    routing::{delete, get, post, put},
    Router,
};
use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(handlers::users::create_user))
        .route("/api/users/me", get(handlers::users::me))
        .route("/api/users/me/discord", put(handlers::users::link_discord))
        .route(
            "/api/categories",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/api/categories/{id}",
            put(handlers::categories::rename_category).delete(handlers::categories::delete_category),
        )
        .route(
            "/api/categories/{id}/subcategories",
            get(handlers::categories::list_subcategories)
                .post(handlers::categories::create_subcategory),
        )
        .route("/api/subcategories/{id}", delete(handlers::categories::delete_subcategory))
        .route(
            "/api/spendings",
            get(handlers::spendings::list_spendings).post(handlers::spendings::create_spending),
        )
        .route(
            "/api/spendings/{id}",
            get(handlers::spendings::get_spending)
                .put(handlers::spendings::update_spending)
                .delete(handlers::spendings::delete_spending),
        )
        .route(
            "/api/income-sources",
            get(handlers::income::list_sources).post(handlers::income::create_source),
        )
        .route("/api/income-sources/{id}", delete(handlers::income::delete_source))
        .route(
            "/api/income",
            get(handlers::income::list_income).post(handlers::income::create_income),
        )
        .route(
            "/api/income/{id}",
            get(handlers::income::get_income)
                .put(handlers::income::update_income)
                .delete(handlers::income::delete_income),
        )
        .route(
            "/api/budgets",
            get(handlers::budgets::list_budgets).post(handlers::budgets::upsert_budget),
        )
        .route("/api/budgets/{id}", delete(handlers::budgets::delete_budget))
        .route("/api/dashboard", get(handlers::reports::dashboard))
        .route("/api/reports/monthly", get(handlers::reports::monthly))
        .route("/api/reports/categories", get(handlers::reports::categories))
        .route("/api/reports/cycles", get(handlers::reports::cycle_reports))
        .route("/api/advisor", post(handlers::advisor::advise))
        .route("/api/bot/command", post(handlers::bot::command))
}
