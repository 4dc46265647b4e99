//! Text command parsing (`!spend 12.50 food/groceries lunch`).

use rust_decimal::Decimal;
use std::str::FromStr;

pub const MAX_RECENT: i64 = 20;
const DEFAULT_RECENT: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Spend {
        amount: Decimal,
        category: String,
        subcategory: Option<String>,
        note: Option<String>,
    },
    Income {
        amount: Decimal,
        source: String,
        note: Option<String>,
    },
    Summary,
    Budget,
    Recent { limit: i64 },
    Categories,
    Report,
    Advice,
}

pub fn help_text(prefix: &str) -> String {
    format!(
        "**Commands**\n\
         `{p}spend <amount> <category>[/<subcategory>] [note]` record a spending\n\
         `{p}income <amount> <source> [note]` record income\n\
         `{p}summary` totals for the current billing cycle\n\
         `{p}budget` budget usage for the current cycle\n\
         `{p}recent [n]` last n spendings (max {MAX_RECENT})\n\
         `{p}categories` your categories and subcategories\n\
         `{p}report` report for the current cycle so far\n\
         `{p}advice` today's advice from the financial advisor\n\
         Names with spaces go in double quotes: `{p}spend 30 \"eating out\" pizza`",
        p = prefix
    )
}

/// Splits on whitespace, keeping double-quoted runs together.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let cleaned = raw.trim_start_matches('$').replace(',', "");
    let amount = Decimal::from_str(&cleaned).map_err(|_| format!("`{raw}` is not an amount"))?;
    if amount <= Decimal::ZERO {
        return Err("amount must be greater than zero".into());
    }
    Ok(amount)
}

fn note_from(rest: &[String]) -> Option<String> {
    let note = rest.join(" ");
    let note = note.trim();
    (!note.is_empty()).then(|| note.to_string())
}

/// `None` when the message is not addressed to the bot; `Some(Err(usage))`
/// when it is but cannot be parsed.
pub fn parse(prefix: &str, message: &str) -> Option<Result<Command, String>> {
    let body = message.trim().strip_prefix(prefix)?;
    let tokens = tokenize(body);
    let (name, args) = tokens.split_first()?;

    let result = match name.to_ascii_lowercase().as_str() {
        "help" | "h" => Ok(Command::Help),
        "spend" | "s" | "expense" => parse_spend(prefix, args),
        "income" | "i" => parse_income(prefix, args),
        "summary" | "balance" => Ok(Command::Summary),
        "budget" | "budgets" => Ok(Command::Budget),
        "recent" => parse_recent(prefix, args),
        "categories" | "cats" => Ok(Command::Categories),
        "report" => Ok(Command::Report),
        "advice" | "advisor" => Ok(Command::Advice),
        other => Err(format!("Unknown command `{other}`. Try `{prefix}help`.")),
    };
    Some(result)
}

fn parse_spend(prefix: &str, args: &[String]) -> Result<Command, String> {
    let usage = format!("Usage: `{prefix}spend <amount> <category>[/<subcategory>] [note]`");
    let [amount, target, rest @ ..] = args else {
        return Err(usage);
    };
    let amount = parse_amount(amount).map_err(|e| format!("{e}. {usage}"))?;

    let (category, subcategory) = match target.split_once('/') {
        Some((cat, sub)) => (cat.trim(), Some(sub.trim())),
        None => (target.trim(), None),
    };
    if category.is_empty() {
        return Err(usage);
    }

    Ok(Command::Spend {
        amount,
        category: category.to_string(),
        subcategory: subcategory.filter(|s| !s.is_empty()).map(str::to_string),
        note: note_from(rest),
    })
}

fn parse_income(prefix: &str, args: &[String]) -> Result<Command, String> {
    let usage = format!("Usage: `{prefix}income <amount> <source> [note]`");
    let [amount, source, rest @ ..] = args else {
        return Err(usage);
    };
    let amount = parse_amount(amount).map_err(|e| format!("{e}. {usage}"))?;
    if source.trim().is_empty() {
        return Err(usage);
    }

    Ok(Command::Income {
        amount,
        source: source.trim().to_string(),
        note: note_from(rest),
    })
}

fn parse_recent(prefix: &str, args: &[String]) -> Result<Command, String> {
    let limit = match args.first() {
        None => DEFAULT_RECENT,
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|n| (1..=MAX_RECENT).contains(n))
            .ok_or_else(|| format!("Usage: `{prefix}recent [1-{MAX_RECENT}]`"))?,
    };
    Ok(Command::Recent { limit })
}
