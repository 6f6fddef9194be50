//! Data models for the admin core.
//!
//! These models match the backend's introspection, listing and media payloads.

mod introspection;
mod listing;
mod media;

pub use introspection::*;
pub use listing::*;
pub use media::*;
