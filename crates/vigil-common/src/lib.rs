//! Shared core types for the vigil health engine.
//!
//! Everything the other crates agree on lives here: the ordered alert
//! [`types::Status`], the monitored [`types::Entity`] model, the
//! [`types::NotificationEvent`] handed to notifiers, lookup primitives,
//! the simple-pattern matcher used by selectors, and process-wide id
//! generation.

pub mod id;
pub mod pattern;
pub mod types;
