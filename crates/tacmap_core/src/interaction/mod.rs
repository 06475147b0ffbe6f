//! Pointer-driven marker manipulation.
//!
//! # Responsibility
//! - Host the modal controller (hover, move, resize, pan) and its throttles.
//! - Define the pointer input and observer output boundary.
//!
//! # Invariants
//! - The controller borrows the store; it never owns marker records.
//! - Observers receive notifications only; they never drive the controller.

pub mod controller;
pub mod events;
pub mod state;
pub mod throttle;

pub use controller::{EngineError, EngineResult, InteractionController};
pub use events::{Cursor, InteractionObserver, NoopObserver, PointerButton, PointerEvent};
pub use state::{InteractionState, MoveGesture, PanGesture, ResizeGesture};
