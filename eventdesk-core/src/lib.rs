//! Core types for eventdesk.
//!
//! This crate provides everything the CLI builds on:
//! - `form` for registration-form schemas and their synchronization
//! - `session` for the per-event editing context
//! - `event` and `feature` for the event registry and feature flags
//! - `store` for the hosted table store contract and its implementations

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod feature;
pub mod form;
pub mod session;
pub mod store;

pub use error::{EventDeskError, EventDeskResult};
