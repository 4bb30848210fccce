//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence collaborator consumed by the progression service.
//! - Isolate SQLite query details from progression rules.
//!
//! # Invariants
//! - Repository writes validate entities before persistence.
//! - Repository APIs return semantic errors (`*NotFound`) in addition to DB
//!   transport errors.

pub mod progress_repo;
