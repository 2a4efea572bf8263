//! Media player capability
//!
//! The controller commands an abstract player and learns about readiness,
//! progress and failures through [`PlayerEvent`]s fed back to it.

use mgvp_common::api::SequencedMediaItem;
use mgvp_common::events::{EventBus, MgvpEvent, PlayerCommand};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Commands the playback controller issues
///
/// Implementations must not block; results come back as [`PlayerEvent`]s.
pub trait MediaPlayer: Send {
    fn load(&mut self, item: &SequencedMediaItem, start_seconds: f64);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position_seconds: f64);
    fn stop(&mut self);
}

/// Player feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Item loaded and able to play
    Ready { item_id: String },
    /// Periodic playback position
    Position {
        item_id: String,
        position_seconds: f64,
    },
    /// Item played to its natural end
    Completed { item_id: String },
    /// Item could not be loaded or decoded
    LoadFailed { item_id: String, reason: String },
}

impl PlayerEvent {
    pub fn item_id(&self) -> &str {
        match self {
            PlayerEvent::Ready { item_id }
            | PlayerEvent::Position { item_id, .. }
            | PlayerEvent::Completed { item_id }
            | PlayerEvent::LoadFailed { item_id, .. } => item_id,
        }
    }
}

/// Player that forwards every command to the front end over the event bus
#[derive(Debug, Clone)]
pub struct BroadcastPlayer {
    bus: EventBus,
}

impl BroadcastPlayer {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    fn issue(&self, command: PlayerCommand) {
        trace!("Player command: {:?}", command);
        self.bus.emit_lossy(MgvpEvent::PlayerCommandIssued {
            command,
            timestamp: chrono::Utc::now(),
        });
    }
}

impl MediaPlayer for BroadcastPlayer {
    fn load(&mut self, item: &SequencedMediaItem, start_seconds: f64) {
        self.issue(PlayerCommand::Load {
            item_id: item.id.clone(),
            start_seconds,
        });
    }

    fn play(&mut self) {
        self.issue(PlayerCommand::Play);
    }

    fn pause(&mut self) {
        self.issue(PlayerCommand::Pause);
    }

    fn seek(&mut self, position_seconds: f64) {
        self.issue(PlayerCommand::Seek { position_seconds });
    }

    fn stop(&mut self) {
        self.issue(PlayerCommand::Stop);
    }
}
