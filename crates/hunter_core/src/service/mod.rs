//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate pure progression rules and repository calls into use-case
//!   level APIs.
//! - Keep presentation layers decoupled from storage details.

pub mod events;
pub mod progression_service;
