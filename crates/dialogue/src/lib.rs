//! The slot-filling dialogue engine.
//!
//! A conversation is a sequence of turns against a per-user
//! [`ConversationContext`].  Each turn classifies the utterance into an
//! [`Intent`], merges newly extracted slot values into the context
//! ([`merge_slots`]), and asks [`find_missing_slots`] which requirements are
//! still open.  An intent executes only once that list is empty.
//!
//! Everything in this crate is deterministic and side-effect free apart
//! from the [`ContextStore`]; all LLM and HTTP collaborators live in the
//! gateway crate.

pub mod context;
pub mod extract;
pub mod merge;
pub mod resolve;
pub mod schema;
pub mod value;

pub use context::{ContextStore, ConversationContext, Coordinates};
pub use extract::extract_json;
pub use merge::merge_slots;
pub use resolve::find_missing_slots;
pub use schema::{slot, Intent, SlotRequirement, SlotType};
pub use value::{convert_slot_value, is_valid_future, SlotValue};
