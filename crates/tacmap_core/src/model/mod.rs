//! Marker domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by the store and every tool.
//!
//! # Invariants
//! - Every marker is identified by a stable `unique_id`.
//! - Deletion is permanent; there are no tombstones.

pub mod marker;
