//! # MGVP Gesture Playback (mgvp-gp)
//!
//! Motion-gesture recognition and playback control for a sequential video
//! player operated without on-screen controls.
//!
//! **Input:** device orientation, acceleration and touch events reported by
//! the front end. **Output:** player commands and state changes on the event
//! bus, enforced against a remote watch budget.

pub mod api;
pub mod budget;
pub mod config;
pub mod error;
pub mod gesture;
pub mod playback;
pub mod session;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
