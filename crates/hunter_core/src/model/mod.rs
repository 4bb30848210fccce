//! Domain model for hunter progression.
//!
//! # Responsibility
//! - Define canonical data structures used by the progression rules.
//! - Validate entity invariants before they reach persistence.
//!
//! # Invariants
//! - Users and quests are identified by stable UUIDs; missions by catalog key.
//! - Mission completion lives in per-user records, never on the catalog entry.

pub mod mission;
pub mod quest;
pub mod rank;
pub mod user;
