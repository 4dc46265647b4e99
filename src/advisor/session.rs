//! Multi-turn tool-calling loop.

use crate::advisor::gemini::{Content, GenerateRequest, GenerationConfig, LlmClient, Part, Tool};
use crate::advisor::tools::{execute_tool, financial_metrics_declaration, MetricsSource};
use crate::error::{AppError, AppResult};

pub const MAX_TURNS: usize = 5;

/// Token and request counts accumulated over one conversation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UsageTally {
    pub requests: i64,
    pub prompt_tokens: i64,
    pub output_tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisorReply {
    pub text: String,
    pub turns: usize,
    pub tool_calls: usize,
}

/// Sends the conversation, runs any requested tool calls and feeds their
/// results back, until the model answers with text or `max_turns` model
/// calls have been made (`Ok(None)`). `tally` is updated even when the loop
/// fails.
pub async fn run_tool_loop(
    llm: &dyn LlmClient,
    metrics: &dyn MetricsSource,
    user_id: i64,
    system_prompt: &str,
    user_prompt: &str,
    max_turns: usize,
    tally: &mut UsageTally,
) -> AppResult<Option<AdvisorReply>> {
    let mut request = GenerateRequest {
        system_instruction: Content::system(system_prompt),
        contents: vec![Content::user_text(user_prompt)],
        tools: vec![Tool {
            function_declarations: vec![financial_metrics_declaration()],
        }],
        generation_config: GenerationConfig::default(),
    };
    let mut tool_calls = 0;

    for turn in 1..=max_turns.min(MAX_TURNS) {
        let response = llm.generate(&request).await?;
        tally.requests += 1;
        if let Some(usage) = response.usage_metadata {
            tally.prompt_tokens += usage.prompt_token_count;
            tally.output_tokens += usage.candidates_token_count;
        }

        let content = response
            .first_content()
            .cloned()
            .ok_or_else(|| AppError::Upstream("model returned no candidates".into()))?;

        let calls = content.function_calls();
        if calls.is_empty() {
            let text = content.text().trim().to_string();
            if text.is_empty() {
                return Err(AppError::Upstream("model returned an empty answer".into()));
            }
            tracing::debug!(turn, tool_calls, "advisor answered");
            return Ok(Some(AdvisorReply { text, turns: turn, tool_calls }));
        }

        let mut responses = Vec::with_capacity(calls.len());
        for call in &calls {
            tracing::debug!(turn, tool = %call.name, args = %call.args, "model requested tool");
            let result = execute_tool(metrics, user_id, &call.name, &call.args).await;
            responses.push(Part::function_response(call.name.clone(), result));
        }
        tool_calls += calls.len();

        let mut model_turn = content.clone();
        model_turn.role = Some("model".into());
        request.contents.push(model_turn);
        request.contents.push(Content {
            role: Some("user".into()),
            parts: responses,
        });
    }

    Ok(None)
}
