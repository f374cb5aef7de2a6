//! Prompt builders for the LLM collaborators.
//!
//! Wording here steers a text model, nothing more: the engine never relies
//! on the model echoing these instructions back, and extraction output is
//! always re-validated through the defensive JSON boundary.

use std::collections::BTreeMap;

use wf_dialogue::{Coordinates, Intent, SlotValue};
use wf_domain::chat::Message;

/// Render a bounded transcript as `User:`/`Assistant:` lines.
fn render_dialogue(history: &[Message]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_slots(slots: &BTreeMap<String, Option<SlotValue>>) -> String {
    serde_json::to_string_pretty(slots).unwrap_or_else(|_| "{}".into())
}

/// Ask the extractor for the listed slots, given the recent conversation.
pub fn build_extraction_prompt(
    intent: Intent,
    slot_names: &[&str],
    history: &[Message],
    current_location: Option<Coordinates>,
) -> String {
    let slot_list = serde_json::to_string_pretty(slot_names).unwrap_or_else(|_| "[]".into());
    let location_note = match current_location {
        Some(loc) => format!(
            "\nThe user's current position is latitude {}, longitude {}. \
             When the user says \"here\" or \"current location\", use the literal \
             string \"current location\" as the slot value.\n",
            loc.latitude, loc.longitude
        ),
        None => String::new(),
    };

    format!(
        "You are a helpful assistant that extracts structured information from a \
         multi-turn conversation.\n\n\
         The user's task is \"{intent}\". Extract these slot fields if the \
         conversation provides them:\n{slot_list}\n{location_note}\n\
         Return a JSON object of the form {{\"slots\": {{...}}}} with only the \
         fields you found. Use null for anything not mentioned. Do not add \
         explanations.\n\n\
         Conversation:\n{dialogue}\n\nJSON:",
        dialogue = render_dialogue(history),
    )
}

/// Ask the generator to phrase a follow-up question for the missing slots.
pub fn build_followup_prompt(
    intent: Intent,
    slots: &BTreeMap<String, Option<SlotValue>>,
    missing: &[&str],
    history: &[Message],
) -> String {
    let missing_list = serde_json::to_string_pretty(missing).unwrap_or_else(|_| "[]".into());

    format!(
        "You are an assistant helping a user with the task \"{intent}\".\n\n\
         Here are the values provided so far:\n{provided}\n\n\
         Some required information is still missing. Ask one short follow-up \
         question to collect:\n{missing_list}\n\
         When several of these are alternatives for the same thing, offer the \
         alternatives in a single question. Prompt the user only for these \
         missing values.\n\n\
         Do not include explanations or labels. Just write the next message \
         from the assistant.\n\n\
         Conversation:\n{dialogue}\n\nAssistant:",
        provided = render_slots(slots),
        dialogue = render_dialogue(history),
    )
}

/// Ask the generator to phrase the final answer around the backend result.
pub fn build_final_prompt(
    intent: Intent,
    slots: &BTreeMap<String, Option<SlotValue>>,
    backend_result: &str,
) -> String {
    format!(
        "You are an assistant that just completed the task \"{intent}\" for the \
         user.\n\n\
         Collected information:\n{provided}\n\n\
         Result from the transit service:\n{backend_result}\n\n\
         Write a short, friendly message conveying this result to the user. \
         Do not invent information that is not in the result. Do not ask for \
         anything else.\n\nAssistant:",
        provided = render_slots(slots),
    )
}

/// Ask the generator to phrase the capability summary.  Independent of slot
/// state; a static fallback exists for when the generator is unavailable.
pub fn build_help_prompt(history: &[Message]) -> String {
    format!(
        "You are a commute assistant. Briefly tell the user what you can do:\n\
         1. Route info — directions from one place to another.\n\
         2. Schedule a commute — they say when to arrive, you plan when to leave \
         and notify them.\n\
         3. Next bus — given a bus service and stop, when the next one arrives.\n\n\
         Invite them to just ask a question in their own words. Keep it short.\n\n\
         Conversation:\n{dialogue}\n\nAssistant:",
        dialogue = render_dialogue(history),
    )
}

/// Shown when the generator itself is unavailable.
pub const HELP_FALLBACK: &str = "Here's what I can help you with:\n\
    1. Route info — ask me how to get from one place to another.\n\
    2. Schedule a commute — tell me when you need to arrive and I'll plan the timing.\n\
    3. Next bus — give me a bus service and stop and I'll tell you when the next one arrives.\n\
    Just ask a question and I'll guide you step by step!";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
