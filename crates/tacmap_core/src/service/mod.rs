//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep host drag-and-drop wiring decoupled from storage details.

pub mod placement;
