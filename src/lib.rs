//! Schema Admin
//!
//! Headless core of a server-driven admin panel: resource schemas are
//! introspected from the backend and drive widgets, validation, submission
//! payloads and fractional-sort reordering for every resource.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod fields;
pub mod form;
pub mod listing;
pub mod media;
pub mod microres;
pub mod models;
pub mod notifications;
pub mod picker;
pub mod schema;
