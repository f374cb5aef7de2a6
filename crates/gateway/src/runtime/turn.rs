//! Turn execution — the per-request state machine.
//!
//! One call to [`run_turn`] processes one utterance to completion:
//! classify, maybe switch intents, merge extracted slots, and either ask a
//! follow-up or execute the matching backend handler.  The caller holds
//! the user's session lock for the whole call, so turns for one user are
//! strictly serialized.
//!
//! The turn works on a snapshot of the conversation context and commits it
//! back only after every external call has finished.  A client that
//! disconnects mid-turn (dropping this future) leaves the previously
//! committed state intact.

use serde_json::Value;
use std::collections::BTreeMap;

use wf_dialogue::schema::required_slot_names;
use wf_dialogue::{
    extract_json, find_missing_slots, merge_slots, ConversationContext, Coordinates, Intent,
    SlotValue,
};
use wf_domain::chat::Message;
use wf_providers::ChatRequest;

use crate::handlers;
use crate::state::AppState;

use super::prompts;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Input / outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Input to a single turn.
pub struct TurnInput {
    /// Authenticated user identity; keys the context store and locks.
    pub user_id: String,
    /// The raw utterance.
    pub utterance: String,
    /// The caller's credential, passed through to backend handlers.
    pub auth_token: Option<String>,
    /// The client's reported position, if any.
    pub current_location: Option<Coordinates>,
}

/// The state the turn ended in.  Observability only — every state still
/// produces exactly one outward message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No intent has ever been confidently established.
    NoActiveIntent,
    /// Slots are still being collected; a follow-up was asked.
    CollectingSlots,
    /// All requirements were met and the handler ran.
    ReadyToExecute,
    /// The context was wiped at the user's request.
    Resetting,
    /// A capability summary was produced.
    HelpOrFallback,
}

/// The single outward result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub message: String,
    pub intent: Option<Intent>,
    /// The full slot map (including still-unknown entries) when an intent
    /// is actively being worked on.
    pub slots: Option<BTreeMap<String, Option<SlotValue>>>,
    /// Structured handler result (routes, arrivals, created plan).
    pub data: Option<Value>,
    pub state: TurnState,
}

impl TurnOutcome {
    fn message_only(text: impl Into<String>, state: TurnState) -> Self {
        Self {
            message: text.into(),
            intent: None,
            slots: None,
            data: None,
            state,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// run_turn — the state machine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process one utterance against the user's conversation context.
///
/// Never fails: every internal error resolves into a normal user-facing
/// message.  The caller must hold the user's session lock.
pub async fn run_turn(state: &AppState, input: TurnInput) -> TurnOutcome {
    let now = state.local_now();

    let (mut ctx, is_new) = state.contexts.snapshot_or_create(&input.user_id);
    if is_new {
        tracing::info!(user_id = %input.user_id, session_id = %ctx.session_id, "new conversation context");
    }
    ctx.current_location = input.current_location;

    // ── Classify ─────────────────────────────────────────────────────
    let prediction = match &state.classifier {
        Some(classifier) => match classifier.classify(&input.utterance).await {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "intent classification failed, keeping active intent");
                None
            }
        },
        None => None,
    };

    // ── Gated intent switch ──────────────────────────────────────────
    // The only path that clears slots.  A low-confidence or too-short
    // prediction never overrides an in-progress intent.
    if let Some(p) = prediction.as_ref() {
        if let Some(predicted) = p.intent {
            let confident = p.confidence >= state.config.dialogue.confidence_threshold;
            let long_enough =
                word_count(&input.utterance) >= state.config.dialogue.min_utterance_words;
            let differs = ctx.active_intent != Some(predicted);

            if confident && long_enough && differs {
                tracing::info!(
                    user_id = %input.user_id,
                    from = ?ctx.active_intent,
                    to = %predicted,
                    confidence = p.confidence,
                    "intent switch"
                );
                ctx.history.clear();
                ctx.clear_slots();
                ctx.active_intent = Some(predicted);
            } else {
                tracing::debug!(
                    predicted = %predicted,
                    confidence = p.confidence,
                    confident,
                    long_enough,
                    differs,
                    "prediction did not change the active intent"
                );
            }
        }
    }

    // ── Record the user turn, bounded ────────────────────────────────
    ctx.push_turn(
        Message::user(input.utterance.clone()),
        state.config.dialogue.max_history_turns,
    );

    // ── Dispatch on the active intent ────────────────────────────────
    match ctx.active_intent {
        Some(Intent::Reset) => {
            ctx.reset();
            state.contexts.commit(&input.user_id, ctx);
            TurnOutcome::message_only(
                "Starting fresh. What would you like to do?",
                TurnState::Resetting,
            )
        }

        None | Some(Intent::Help) => {
            let ended_as = if ctx.active_intent.is_some() {
                TurnState::HelpOrFallback
            } else {
                TurnState::NoActiveIntent
            };
            let prompt = prompts::build_help_prompt(&ctx.history);
            let message = generate_text(state, &prompt)
                .await
                .unwrap_or_else(|| prompts::HELP_FALLBACK.to_owned());
            let intent = ctx.active_intent;
            state.contexts.commit(&input.user_id, ctx);
            TurnOutcome {
                message,
                intent,
                slots: None,
                data: None,
                state: ended_as,
            }
        }

        Some(intent) => collect_and_execute(state, &input, ctx, intent, now).await,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CollectingSlots / ReadyToExecute
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn collect_and_execute(
    state: &AppState,
    input: &TurnInput,
    mut ctx: ConversationContext,
    intent: Intent,
    now: chrono::NaiveDateTime,
) -> TurnOutcome {
    // Extraction is scoped to what is still missing; on a fresh intent
    // that is every required slot.
    let missing = find_missing_slots(intent, &ctx.slots);
    let to_request: Vec<&str> = if missing.is_empty() {
        required_slot_names(intent)
    } else {
        missing
    };

    let extraction_prompt = prompts::build_extraction_prompt(
        intent,
        &to_request,
        &ctx.history,
        ctx.current_location,
    );
    let raw_response = generate_text(state, &extraction_prompt).await;
    let extracted = raw_response.as_deref().and_then(extract_json);

    let Some(extracted) = extracted else {
        // Extraction failure is a normal outcome: apologize, and leave the
        // committed context untouched so earlier turns' slots are not lost.
        tracing::info!(user_id = %input.user_id, %intent, "slot extraction produced no usable JSON");
        return TurnOutcome::message_only(
            "Sorry, I couldn't quite understand that. Could you say it another way?",
            TurnState::CollectingSlots,
        );
    };

    let new_slots = extracted
        .get("slots")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    merge_slots(&mut ctx.slots, &new_slots, now);

    let missing = find_missing_slots(intent, &ctx.slots);
    tracing::debug!(user_id = %input.user_id, %intent, missing = ?missing, "slots after merge");

    if missing.is_empty() {
        // ── ReadyToExecute ───────────────────────────────────────────
        let reply = handlers::execute_intent(
            state.backend.as_ref(),
            intent,
            &ctx.slots,
            ctx.current_location,
            input.auth_token.as_deref(),
            now,
        )
        .await;

        let backend_summary = reply.summary_text();
        let final_prompt = prompts::build_final_prompt(intent, &ctx.slots, &backend_summary);
        // If the generator is down, the plain handler summary still
        // answers the user.
        let message = generate_text(state, &final_prompt)
            .await
            .unwrap_or(backend_summary);

        ctx.push_turn(
            Message::assistant(message.clone()),
            state.config.dialogue.max_history_turns,
        );
        let slots = ctx.slots.clone();
        state.contexts.commit(&input.user_id, ctx);

        TurnOutcome {
            message,
            intent: Some(intent),
            slots: Some(slots),
            data: reply.payload,
            state: TurnState::ReadyToExecute,
        }
    } else {
        // ── Still collecting: ask a follow-up ────────────────────────
        let followup_prompt =
            prompts::build_followup_prompt(intent, &ctx.slots, &missing, &ctx.history);
        let message = generate_text(state, &followup_prompt)
            .await
            .unwrap_or_else(|| fallback_followup(&missing));

        ctx.push_turn(
            Message::assistant(message.clone()),
            state.config.dialogue.max_history_turns,
        );
        let slots = ctx.slots.clone();
        state.contexts.commit(&input.user_id, ctx);

        TurnOutcome {
            message,
            intent: Some(intent),
            slots: Some(slots),
            data: None,
            state: TurnState::CollectingSlots,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Ask the default provider for one completion.  `None` on any failure or
/// empty output; callers fall back to static text.
async fn generate_text(state: &AppState, prompt: &str) -> Option<String> {
    let provider = match state.llm.default_provider() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "no LLM provider available");
            return None;
        }
    };

    let req = ChatRequest {
        messages: vec![Message::user(prompt)],
        temperature: Some(0.2),
        max_tokens: Some(300),
        model: None,
    };

    match provider.chat(&req).await {
        Ok(resp) => {
            let content = resp.content.trim();
            if content.is_empty() {
                None
            } else {
                Some(content.to_owned())
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "text generation failed");
            None
        }
    }
}

fn word_count(utterance: &str) -> usize {
    utterance.split_whitespace().count()
}

/// Static follow-up used when the generator is unavailable.
fn fallback_followup(missing: &[&str]) -> String {
    let wanted: Vec<String> = missing.iter().map(|name| name.replace('_', " ")).collect();
    format!(
        "I still need a bit more information: {}.",
        wanted.join(", or ")
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
