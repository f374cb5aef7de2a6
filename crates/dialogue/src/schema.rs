//! Static slot schema: the closed intent set, the global slot-name → type
//! mapping, and the ordered slot requirements per intent.
//!
//! The schema is declaration-time data.  A slot name has one type
//! everywhere it appears, and appears in exactly one requirement per
//! intent (standalone or inside an alternation group, never both).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intents
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The closed set of tasks the assistant recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// "How do I get from A to B?"
    RouteInfo,
    /// "Notify me when to leave so I arrive by 9."
    ScheduleCommute,
    /// "When is the next 96 at my stop?"
    NextBus,
    Help,
    Reset,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::RouteInfo,
        Intent::ScheduleCommute,
        Intent::NextBus,
        Intent::Help,
        Intent::Reset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::RouteInfo => "route_info",
            Intent::ScheduleCommute => "schedule_commute",
            Intent::NextBus => "next_bus",
            Intent::Help => "help",
            Intent::Reset => "reset",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "route_info" => Ok(Intent::RouteInfo),
            "schedule_commute" => Ok(Intent::ScheduleCommute),
            "next_bus" => Ok(Intent::NextBus),
            "help" => Ok(Intent::Help),
            "reset" => Ok(Intent::Reset),
            other => Err(UnknownIntent(other.to_owned())),
        }
    }
}

/// Error returned when a label is not one of the known intents.
#[derive(Debug, Clone)]
pub struct UnknownIntent(pub String);

impl fmt::Display for UnknownIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown intent '{}'", self.0)
    }
}

impl std::error::Error for UnknownIntent {}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slot names
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Canonical slot names.  Referenced by the schema tables below and by the
/// backend handlers; extraction prompts use these names verbatim.
pub mod slot {
    pub const START_LOCATION: &str = "start_location";
    pub const END_LOCATION: &str = "end_location";
    pub const NOTIFICATION_START_TIME: &str = "notification_start_time";
    pub const ARRIVAL_TIME: &str = "arrival_time";
    pub const BUS_SERVICE_NUMBER: &str = "bus_service_number";
    pub const BOARDING_BUS_STOP_NAME: &str = "boarding_bus_stop_name";
    pub const BOARDING_BUS_STOP_CODE: &str = "boarding_bus_stop_code";
    pub const COMMUTE_PLAN_NAME: &str = "commute_plan_name";
    pub const RECURRENCE_DAYS: &str = "recurrence_days";
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slot types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The value type of a slot, fixed per slot name across all intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotType {
    String,
    TimeOfDay,
    ListOfStrings,
}

/// Every known slot name with its declared type.
const SLOT_TYPES: &[(&str, SlotType)] = &[
    (slot::START_LOCATION, SlotType::String),
    (slot::END_LOCATION, SlotType::String),
    (slot::NOTIFICATION_START_TIME, SlotType::TimeOfDay),
    (slot::ARRIVAL_TIME, SlotType::TimeOfDay),
    (slot::BUS_SERVICE_NUMBER, SlotType::String),
    (slot::BOARDING_BUS_STOP_NAME, SlotType::String),
    (slot::BOARDING_BUS_STOP_CODE, SlotType::String),
    (slot::COMMUTE_PLAN_NAME, SlotType::String),
    (slot::RECURRENCE_DAYS, SlotType::ListOfStrings),
];

/// Slots whose values must lie strictly in the future.  A fixed named set,
/// not inferred from the time-of-day type.
const FUTURE_VALIDATED: &[&str] = &[slot::NOTIFICATION_START_TIME, slot::ARRIVAL_TIME];

/// Look up the declared type of a slot.  `None` for unknown names.
pub fn slot_type(name: &str) -> Option<SlotType> {
    SLOT_TYPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, t)| *t)
}

/// All known slot names, in declaration order.
pub fn known_slots() -> impl Iterator<Item = &'static str> {
    SLOT_TYPES.iter().map(|(n, _)| *n)
}

/// Whether a slot's value must be validated as lying in the future.
pub fn is_future_validated(name: &str) -> bool {
    FUTURE_VALIDATED.contains(&name)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requirements
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One entry in an intent's ordered requirement list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRequirement {
    /// This slot must be filled.
    Single(&'static str),
    /// At least one member must be filled.
    AnyOf(&'static [&'static str]),
}

const ROUTE_INFO_REQS: &[SlotRequirement] = &[
    SlotRequirement::Single(slot::START_LOCATION),
    SlotRequirement::Single(slot::END_LOCATION),
];

const SCHEDULE_COMMUTE_REQS: &[SlotRequirement] = &[
    SlotRequirement::Single(slot::START_LOCATION),
    SlotRequirement::Single(slot::END_LOCATION),
    SlotRequirement::Single(slot::NOTIFICATION_START_TIME),
    SlotRequirement::Single(slot::ARRIVAL_TIME),
];

const NEXT_BUS_REQS: &[SlotRequirement] = &[
    SlotRequirement::Single(slot::BUS_SERVICE_NUMBER),
    SlotRequirement::AnyOf(&[slot::BOARDING_BUS_STOP_NAME, slot::BOARDING_BUS_STOP_CODE]),
];

/// The ordered slot requirements of an intent.  `help` and `reset` need
/// nothing.
pub fn requirements(intent: Intent) -> &'static [SlotRequirement] {
    match intent {
        Intent::RouteInfo => ROUTE_INFO_REQS,
        Intent::ScheduleCommute => SCHEDULE_COMMUTE_REQS,
        Intent::NextBus => NEXT_BUS_REQS,
        Intent::Help | Intent::Reset => &[],
    }
}

/// Every slot name referenced by an intent's requirements, flattened.
pub fn required_slot_names(intent: Intent) -> Vec<&'static str> {
    let mut names = Vec::new();
    for req in requirements(intent) {
        match req {
            SlotRequirement::Single(name) => names.push(*name),
            SlotRequirement::AnyOf(group) => names.extend(group.iter().copied()),
        }
    }
    names
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn intent_labels_round_trip() {
        for intent in Intent::ALL {
            let parsed: Intent = intent.as_str().parse().unwrap();
            assert_eq!(parsed, intent);
        }
    }

    #[test]
    fn unknown_intent_is_rejected() {
        assert!("order_pizza".parse::<Intent>().is_err());
    }

    #[test]
    fn every_required_slot_has_a_type() {
        for intent in Intent::ALL {
            for name in required_slot_names(intent) {
                assert!(
                    slot_type(name).is_some(),
                    "{intent}: slot '{name}' missing from the type table"
                );
            }
        }
    }

    #[test]
    fn slot_appears_in_one_requirement_per_intent() {
        for intent in Intent::ALL {
            let names = required_slot_names(intent);
            let unique: HashSet<_> = names.iter().collect();
            assert_eq!(
                names.len(),
                unique.len(),
                "{intent}: a slot is referenced by more than one requirement"
            );
        }
    }

    #[test]
    fn future_validated_slots_are_times() {
        for name in FUTURE_VALIDATED {
            assert_eq!(slot_type(name), Some(SlotType::TimeOfDay));
        }
    }

    #[test]
    fn next_bus_has_the_stop_alternation() {
        let reqs = requirements(Intent::NextBus);
        assert!(matches!(
            reqs[1],
            SlotRequirement::AnyOf(group)
                if group == [slot::BOARDING_BUS_STOP_NAME, slot::BOARDING_BUS_STOP_CODE]
        ));
    }
}
