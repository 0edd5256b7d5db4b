//! Deferred destructive actions
//!
//! - Clock abstraction (system and hand-driven)
//! - Controller owning armed actions, their deadlines and callbacks

pub mod clock;
pub mod controller;

pub use controller::{ArmHandle, DeferredActions, PendingPolicy, UndoDelay};

#[cfg(test)]
pub use clock::ManualClock;
