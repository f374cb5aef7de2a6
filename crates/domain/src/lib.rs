//! Shared domain types for the Wayfinder workspace: the common error
//! type, the configuration tree, and provider-agnostic chat messages.

pub mod chat;
pub mod config;
pub mod error;
