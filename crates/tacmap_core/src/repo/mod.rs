//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define row-level data access contracts for markers.
//! - Isolate SQLite query details from the store and services.
//!
//! # Invariants
//! - Repository writes enforce `Marker::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod marker_repo;
