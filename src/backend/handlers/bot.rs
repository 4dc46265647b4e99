use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::backend::AppState;
use crate::bot;
use crate::error::{AppError, AppResult};

pub const BOT_TOKEN_HEADER: &str = "x-bot-token";

#[derive(Debug, Deserialize)]
pub struct BotMessage {
    pub discord_id: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct BotReply {
    /// `None` when the message was not a bot command.
    pub reply: Option<String>,
}

fn authorize(expected: Option<&str>, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let given = headers.get(BOT_TOKEN_HEADER).and_then(|v| v.to_str().ok());
    if given != Some(expected) {
        return Err(AppError::Unauthorized("invalid bot token".into()));
    }
    Ok(())
}

/// Relay endpoint for a Discord gateway process: runs one chat message
/// through the command dispatcher and returns the reply text.
pub async fn command(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(msg): Json<BotMessage>,
) -> AppResult<Json<BotReply>> {
    authorize(state.config.bot_token.as_deref(), &headers)?;

    let discord_id = msg.discord_id.trim();
    if discord_id.is_empty() {
        return Err(AppError::Validation("discord_id must not be empty".into()));
    }

    let reply = bot::handle_message(&state.bot_context(), discord_id, &msg.content).await?;
    Ok(Json(BotReply { reply }))
}
