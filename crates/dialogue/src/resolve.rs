//! The missing-slot resolver.
//!
//! A pure function of the static schema and the current slot map: no side
//! effects, idempotent, and the single source of truth for "is this intent
//! ready to execute".

use std::collections::BTreeMap;

use crate::schema::{requirements, Intent, SlotRequirement};
use crate::value::SlotValue;

/// Compute which slots still need to be asked for, in declaration order.
///
/// - A standalone requirement contributes its slot when the value is
///   absent or empty.
/// - An alternation group contributes **all** of its members when none is
///   filled (the caller phrases a request offering every alternative), and
///   nothing at all once at least one member is filled — even if other
///   members remain open, and even if several members end up filled
///   simultaneously.  Redundant members are never reconciled here;
///   downstream handlers pick among them.
pub fn find_missing_slots(
    intent: Intent,
    slots: &BTreeMap<String, Option<SlotValue>>,
) -> Vec<&'static str> {
    let filled = |name: &str| -> bool {
        slots
            .get(name)
            .and_then(|v| v.as_ref())
            .is_some_and(|v| !v.is_empty())
    };

    let mut missing = Vec::new();
    for req in requirements(intent) {
        match req {
            SlotRequirement::Single(name) => {
                if !filled(name) {
                    missing.push(*name);
                }
            }
            SlotRequirement::AnyOf(group) => {
                if !group.iter().any(|name| filled(name)) {
                    missing.extend(group.iter().copied());
                }
            }
        }
    }
    missing
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
