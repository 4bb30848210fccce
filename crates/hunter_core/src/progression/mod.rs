//! Pure progression rules.
//!
//! # Responsibility
//! - Hold the side-effect-free building blocks composed by the service:
//!   experience ledger, mission availability, daily wins and streaks.
//!
//! # Invariants
//! - Nothing in this module performs I/O or reads the wall clock; dates are
//!   always passed in.

pub mod daily_wins;
pub mod ledger;
pub mod missions;
pub mod streak;
