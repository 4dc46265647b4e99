use chrono::NaiveDate;

use crate::cycle::BillingCycle;

pub const SYSTEM_PROMPT: &str = "You are a careful, friendly household financial advisor. \
You help one household understand its spending and income and suggest practical improvements.

Rules:
- Base every number you mention on data returned by the get_financial_metrics tool. Never invent figures.
- Call the tool for each period you need; compare the current billing cycle with the previous one when useful.
- Keep the answer under 250 words, formatted for a chat message: a one-line overview, then at most five short bullet points.
- Point out categories that grew the most, whether the household is saving, and one or two concrete actions.
- Amounts are in the household's own currency; do not add currency symbols or conversions.
- Do not give investment, tax or legal advice.";

/// Opening user turn for a daily advice request.
pub fn advice_request(username: &str, today: NaiveDate, cycle_start_day: u32) -> String {
    let current = BillingCycle::containing(today, cycle_start_day);
    let previous = current.previous();

    format!(
        "Hi, I'm {username}. Today is {today}.\n\
         My billing cycle runs from day {cycle_start_day} of each month.\n\
         Current cycle: {} to {} (in progress).\n\
         Previous cycle: {} to {}.\n\
         How am I doing, and what should I change?",
        current.start,
        current.end,
        previous.start,
        previous.end,
    )
}
