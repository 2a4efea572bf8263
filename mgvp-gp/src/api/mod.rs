//! HTTP API for the gesture playback service
//!
//! Platform input (sensor events, consent answers, player reports) comes in
//! over JSON; state changes and player commands go out on the SSE stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
