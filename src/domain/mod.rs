//! Domain layer types and invariants.

pub mod bot;
pub mod error;
pub mod event;
