//! Generated dialogue for one conversation turn.
//!
//! Asks the gateway for a line when it is ready and falls back to canned
//! dialogue otherwise. Whatever comes back is cleaned before it reaches the
//! transcript.

use townsim_core::{Phase, TurnContext, clean_response};
use townsim_llm::{PromptKind, PromptSet, PromptVars, TextGenerator};
use tracing::{debug, warn};

/// Template used for a conversation phase.
#[must_use]
pub fn prompt_kind(phase: Phase) -> PromptKind {
    match phase {
        Phase::Start => PromptKind::Start,
        Phase::Continue => PromptKind::Continue,
        Phase::Leave => PromptKind::Leave,
    }
}

/// Render the prompt for the turn described by `ctx`.
#[must_use]
pub fn build_prompt(prompts: &PromptSet, ctx: &TurnContext) -> String {
    let history = ctx.history_lines();
    prompts.render(
        prompt_kind(ctx.phase),
        &PromptVars {
            speaker: &ctx.speaker_name,
            identity: &ctx.speaker_identity,
            listener: &ctx.listener_name,
            history: &history,
        },
    )
}

/// Ask the gateway for raw text.
///
/// `None` means the caller must use a canned line: the gateway is not
/// ready, failed, or timed out.
pub async fn generate_raw(
    gateway: &dyn TextGenerator,
    prompts: &PromptSet,
    ctx: &TurnContext,
) -> Option<String> {
    if !gateway.is_ready() {
        debug!(conversation = %ctx.conversation, "gateway not ready, using canned line");
        return None;
    }
    let prompt = build_prompt(prompts, ctx);
    match gateway.generate_text(&prompt, ctx.max_tokens).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(
                conversation = %ctx.conversation,
                speaker = %ctx.speaker_name,
                error = %e,
                "generation failed, using canned line"
            );
            None
        }
    }
}

/// Clean `raw` for the speaker and listener of `ctx`.
#[must_use]
pub fn finish_line(raw: &str, ctx: &TurnContext) -> String {
    clean_response(raw, &ctx.speaker_name, &ctx.listener_name, ctx.max_chars)
}
