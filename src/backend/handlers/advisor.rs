use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::advisor::Advice;
use crate::backend::{AppState, UserId};
use crate::database::db::queries;
use crate::error::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
pub struct AdviceQuery {
    #[serde(default)]
    pub refresh: bool,
}

pub async fn advise(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(q): Query<AdviceQuery>,
) -> AppResult<Json<Advice>> {
    let advisor = state
        .advisor
        .clone()
        .ok_or_else(|| AppError::Unavailable("the financial advisor is not configured".into()))?;

    let user = queries::get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user", user_id))?;

    let advice = advisor.advise(&state.db, &user, state.today(), q.refresh).await?;
    Ok(Json(advice))
}
