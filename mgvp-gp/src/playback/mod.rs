//! Playback control
//!
//! The controller owns the sequence position and the playback state; the
//! transition table it consults is a pure function in [`transitions`].

pub mod controller;
pub mod player;
pub mod sequence;
pub mod transitions;

pub use controller::{ControlAction, ControllerConfig, PlaybackController, SessionOutcome};
pub use player::{BroadcastPlayer, MediaPlayer, PlayerEvent};
pub use sequence::{HttpSequenceProvider, Sequence, SequenceProvider};
