//! Outbound Discord messages through an incoming webhook.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::database::models::User;
use crate::error::{AppError, AppResult};

/// Discord rejects message content longer than this.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Where alerts and reports for a user are delivered.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, user: &User, content: &str) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>) -> AppResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, webhook_url })
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Posts `content` as one webhook message per chunk, in order.
    ///
    /// Not atomic: when chunk N fails, chunks before it have already been
    /// posted and an error is returned. Callers that log delivery (cycle
    /// reports, budget alerts) therefore leave the log empty and resend the
    /// whole message on the next run, repeating the chunks that did arrive.
    pub async fn send(&self, content: &str) -> AppResult<()> {
        let Some(url) = &self.webhook_url else {
            tracing::info!(target: "household_finance::notifier", "(no webhook configured)\n{content}");
            return Ok(());
        };

        for chunk in split_message(content, DISCORD_MESSAGE_LIMIT) {
            let response = self
                .client
                .post(url)
                .json(&json!({
                    "content": chunk,
                    "allowed_mentions": { "parse": ["users"] }
                }))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Upstream(format!(
                    "Discord webhook returned {status}: {body}"
                )));
            }
        }
        tracing::debug!(chars = content.len(), "discord message sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    /// Prefixed with a mention when a Discord id is linked.
    async fn notify_user(&self, user: &User, content: &str) -> AppResult<()> {
        self.send(&addressed(user, content)).await
    }
}

fn addressed(user: &User, content: &str) -> String {
    match &user.discord_id {
        Some(id) => format!("<@{id}>\n{content}"),
        None => format!("**{}**\n{content}", user.username),
    }
}

/// Splits `text` into chunks of at most `limit` characters, preferring line breaks.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
            continue;
        }
        // a single line longer than the limit is cut hard
        let chars: Vec<char> = line.chars().collect();
        for piece in chars.chunks(limit) {
            let piece: String = piece.iter().collect();
            if piece.chars().count() == limit {
                chunks.push(piece);
            } else {
                current_len = piece.chars().count();
                current = piece;
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
