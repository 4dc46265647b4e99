//! Chat-bot surface: text commands in, replies and alerts out.

pub mod command;
pub mod console;
pub mod dispatch;
pub mod notifier;

pub use dispatch::{handle_message, BotContext};
pub use notifier::{DiscordNotifier, Notifier};
