//! # MGVP Common Library
//!
//! Shared code for the MGVP (motion-gesture video player) services including:
//! - Event types (MgvpEvent enum) and the EventBus
//! - Wire types for the remote budget authority and sequence provider
//! - Configuration loading
//! - Clock abstraction used by gesture timing
//! - SSE helpers

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
