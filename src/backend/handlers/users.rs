use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::backend::{AppState, UserId};
use crate::database::db::queries;
use crate::database::models::{NewUser, User};
use crate::error::{AppError, AppResult};
use crate::ledger;

fn clean_discord_id(raw: Option<String>) -> AppResult<Option<String>> {
    let Some(id) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    // Discord snowflakes are 17-20 digit integers
    if !(17..=20).contains(&id.len()) || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("discord_id must be a Discord user id".into()));
    }
    Ok(Some(id))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = NewUser {
        username: ledger::clean_name(&payload.username, "user")?,
        email: payload.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
        discord_id: clean_discord_id(payload.discord_id)?,
    };
    if let Some(email) = &user.email {
        if !email.contains('@') {
            return Err(AppError::Validation("email is not valid".into()));
        }
    }

    let id = queries::create_user(&state.db, &user).await?;
    tracing::info!(user_id = id, username = %user.username, "user created");

    let created = queries::get_user(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("user", id))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn me(State(state): State<AppState>, UserId(user_id): UserId) -> AppResult<Json<User>> {
    let user = queries::get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user", user_id))?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct LinkDiscord {
    pub discord_id: Option<String>,
}

pub async fn link_discord(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(payload): Json<LinkDiscord>,
) -> AppResult<Json<User>> {
    let discord_id = clean_discord_id(payload.discord_id)?;
    if !queries::set_discord_id(&state.db, user_id, discord_id.as_deref()).await? {
        return Err(AppError::not_found("user", user_id));
    }
    tracing::info!(user_id, linked = discord_id.is_some(), "discord link updated");

    let user = queries::get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user", user_id))?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discord_ids_must_be_snowflakes() {
        assert_eq!(clean_discord_id(None).unwrap(), None);
        assert_eq!(clean_discord_id(Some("  ".into())).unwrap(), None);
        assert_eq!(
            clean_discord_id(Some(" 123456789012345678 ".into())).unwrap().as_deref(),
            Some("123456789012345678")
        );
        assert!(clean_discord_id(Some("alice#1234".into())).is_err());
        assert!(clean_discord_id(Some("1234".into())).is_err());
    }
}
