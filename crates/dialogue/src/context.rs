//! Per-user conversation state and the store that owns it.
//!
//! The store holds one [`ConversationContext`] per user identity for the
//! lifetime of the process.  Turn processing works on a snapshot and
//! commits it back once all external calls have finished, so an abandoned
//! turn never leaves a context half-mutated.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use wf_domain::chat::Message;

use crate::schema::{known_slots, Intent};
use crate::value::SlotValue;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Coordinates
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A latitude/longitude pair supplied by the client per request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything the engine remembers about one user across turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Stable id for this context incarnation; a reset mints a new one.
    pub session_id: String,
    /// The intent currently being collected for, if any.
    pub active_intent: Option<Intent>,
    /// One entry per known slot name; `None` means "not yet known".
    pub slots: BTreeMap<String, Option<SlotValue>>,
    /// Bounded transcript of user/assistant turns, oldest first.
    pub history: Vec<Message>,
    /// Last reported client position.  Per-request ancillary context, not
    /// part of the slot set.
    #[serde(default)]
    pub current_location: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            active_intent: None,
            slots: empty_slot_map(),
            history: Vec::new(),
            current_location: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Forget the active intent and every slot value, keeping history.
    /// Used when a confident prediction switches the intent mid-stream
    /// (the caller clears history separately where required).
    pub fn clear_slots(&mut self) {
        self.slots = empty_slot_map();
    }

    /// Full reset: slots to all-`None`, history emptied, no active intent.
    /// The session id is re-minted so observers can tell incarnations apart.
    pub fn reset(&mut self) {
        let now = Utc::now();
        self.session_id = uuid::Uuid::new_v4().to_string();
        self.active_intent = None;
        self.slots = empty_slot_map();
        self.history.clear();
        self.updated_at = now;
    }

    /// Append a turn and drop the oldest entries beyond `max_turns`.
    pub fn push_turn(&mut self, message: Message, max_turns: usize) {
        self.history.push(message);
        if self.history.len() > max_turns {
            let excess = self.history.len() - max_turns;
            self.history.drain(..excess);
        }
        self.updated_at = Utc::now();
    }

    /// The slot values that are currently filled (non-null, non-empty).
    pub fn filled_slots(&self) -> BTreeMap<String, SlotValue> {
        self.slots
            .iter()
            .filter_map(|(name, value)| {
                value
                    .as_ref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (name.clone(), v.clone()))
            })
            .collect()
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_slot_map() -> BTreeMap<String, Option<SlotValue>> {
    known_slots().map(|name| (name.to_owned(), None)).collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide map of user identity → conversation context.
///
/// Injected into the turn controller rather than accessed as ambient
/// state.  The lock only guards map access; per-user turn serialization
/// is the session-lock layer's job.
pub struct ContextStore {
    contexts: RwLock<HashMap<String, ConversationContext>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Clone the user's context, creating an empty one on first contact.
    /// Returns `(snapshot, is_new)`.
    pub fn snapshot_or_create(&self, user_id: &str) -> (ConversationContext, bool) {
        {
            let contexts = self.contexts.read();
            if let Some(ctx) = contexts.get(user_id) {
                return (ctx.clone(), false);
            }
        }

        let ctx = ConversationContext::new();
        let mut contexts = self.contexts.write();
        // Double-checked: another thread may have created it meanwhile.
        let entry = contexts
            .entry(user_id.to_owned())
            .or_insert_with(|| ctx.clone());
        (entry.clone(), true)
    }

    /// Look up a context without creating one.
    pub fn get(&self, user_id: &str) -> Option<ConversationContext> {
        self.contexts.read().get(user_id).cloned()
    }

    /// Write a mutated snapshot back.  Call only after every external call
    /// of the turn has completed.
    pub fn commit(&self, user_id: &str, ctx: ConversationContext) {
        self.contexts.write().insert(user_id.to_owned(), ctx);
    }

    /// Reset a user's context in place.  Returns `false` when the user has
    /// no context yet.
    pub fn reset(&self, user_id: &str) -> bool {
        let mut contexts = self.contexts.write();
        match contexts.get_mut(user_id) {
            Some(ctx) => {
                let old_id = ctx.session_id.clone();
                ctx.reset();
                tracing::info!(
                    user_id = %user_id,
                    old_session_id = %old_id,
                    new_session_id = %ctx.session_id,
                    "context reset"
                );
                true
            }
            None => false,
        }
    }

    /// User identities with an active context.
    pub fn user_ids(&self) -> Vec<String> {
        self.contexts.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
