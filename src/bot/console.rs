//! Line-oriented bot console: each stdin line is handled as a chat message.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::bot::dispatch::{handle_message, BotContext};
use crate::error::AppResult;

pub async fn run(ctx: BotContext, discord_id: String) -> AppResult<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let banner = format!(
        "Bot console as Discord user {discord_id}. Type {}help, Ctrl-D to exit.\n",
        ctx.prefix
    );
    stdout.write_all(banner.as_bytes()).await?;

    while let Some(line) = lines.next_line().await? {
        let reply = match handle_message(&ctx, &discord_id, &line).await {
            Ok(Some(reply)) => reply,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(error = %e, "bot command failed");
                format!("error: {e}")
            }
        };
        stdout.write_all(format!("{reply}\n\n").as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

