//! Event types for the MGVP event system
//!
//! Provides shared event definitions and the EventBus used by the gesture
//! playback service to publish state changes, detected gestures and player
//! commands to SSE clients.

mod gesture_types;
mod playback_types;

pub use gesture_types::{ShakeDirection, SwipeDirection, TiltDirection};
pub use playback_types::{InputMode, PlaybackState, PlayerCommand, SessionEndReason};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// MGVP event types
///
/// Events are broadcast via [`EventBus`] and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MgvpEvent {
    /// A playback session was started for a scanned token
    SessionStarted {
        session_id: Option<String>,
        item_count: usize,
        input_mode: InputMode,
        timestamp: DateTime<Utc>,
    },

    /// Playback controller changed state
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// An item became current (loading begins)
    ItemStarted {
        item_id: String,
        /// 0-based index within the sequence
        index: usize,
        order: u32,
        timestamp: DateTime<Utc>,
    },

    /// Position moved by tilt scrubbing
    ScrubProgress {
        item_id: String,
        position_seconds: f64,
        direction: TiltDirection,
        intensity: f64,
        timestamp: DateTime<Utc>,
    },

    /// Shake classified
    ShakeDetected {
        direction: ShakeDirection,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// Swipe classified
    SwipeDetected {
        direction: SwipeDirection,
        distance_px: f64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Shake right (or next button) on the last item; nothing to advance to
    LastItemReached {
        item_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Shake left (or previous button) on the first item restarted it
    ItemRestarted {
        item_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Item failed to load and was skipped
    ItemSkipped {
        item_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Scanned token resolved to no playable items
    EmptySequence {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Budget authority answered a heartbeat
    BudgetUpdated {
        remaining_seconds: f64,
        limit_reached: bool,
        timestamp: DateTime<Utc>,
    },

    /// Heartbeat could not reach the authority; retried next interval
    HeartbeatMissed {
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Interaction mode decided by the permission gate
    InputModeChanged {
        mode: InputMode,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Command for the front-end media player
    PlayerCommandIssued {
        command: PlayerCommand,
        timestamp: DateTime<Utc>,
    },

    /// Session finished and all of its listeners and timers were released
    SessionEnded {
        reason: SessionEndReason,
        final_position_seconds: f64,
        timestamp: DateTime<Utc>,
    },
}

impl MgvpEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            MgvpEvent::SessionStarted { .. } => "SessionStarted",
            MgvpEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            MgvpEvent::ItemStarted { .. } => "ItemStarted",
            MgvpEvent::ScrubProgress { .. } => "ScrubProgress",
            MgvpEvent::ShakeDetected { .. } => "ShakeDetected",
            MgvpEvent::SwipeDetected { .. } => "SwipeDetected",
            MgvpEvent::LastItemReached { .. } => "LastItemReached",
            MgvpEvent::ItemRestarted { .. } => "ItemRestarted",
            MgvpEvent::ItemSkipped { .. } => "ItemSkipped",
            MgvpEvent::EmptySequence { .. } => "EmptySequence",
            MgvpEvent::BudgetUpdated { .. } => "BudgetUpdated",
            MgvpEvent::HeartbeatMissed { .. } => "HeartbeatMissed",
            MgvpEvent::InputModeChanged { .. } => "InputModeChanged",
            MgvpEvent::PlayerCommandIssued { .. } => "PlayerCommandIssued",
            MgvpEvent::SessionEnded { .. } => "SessionEnded",
        }
    }
}

/// Broadcast bus for [`MgvpEvent`]s
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and lose
/// the oldest events rather than blocking the publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MgvpEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use mgvp_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MgvpEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MgvpEvent,
    ) -> Result<usize, broadcast::error::SendError<MgvpEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MgvpEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
