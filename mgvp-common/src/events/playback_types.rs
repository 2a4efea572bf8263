//! Playback-related type definitions
//!
//! Supporting types for the playback controller state machine and session lifecycle.

use serde::{Deserialize, Serialize};

/// Playback controller state
///
/// Owned exclusively by the playback controller; every other component only
/// observes it through events or snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    /// No sequence loaded yet
    Idle,
    /// Waiting for the media player to report the current item ready
    LoadingItem,
    /// Normal playback
    Playing,
    /// Tilt-driven position scrubbing (player paused)
    Scrubbing,
    /// Moving to another item after a shake or natural completion
    Transitioning,
    /// Last item completed naturally
    Ended,
    /// Watch budget exhausted (terminal for the session)
    LimitReached,
    /// Unrecoverable failure (empty sequence, every remaining item failed)
    Error,
}

impl PlaybackState {
    /// States in which an item is loaded or being loaded and gestures apply
    pub fn is_playing_family(self) -> bool {
        matches!(
            self,
            PlaybackState::LoadingItem
                | PlaybackState::Playing
                | PlaybackState::Scrubbing
                | PlaybackState::Transitioning
        )
    }

    /// States that end the session's playback for good
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PlaybackState::Ended | PlaybackState::LimitReached | PlaybackState::Error
        )
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::LoadingItem => write!(f, "loadingItem"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Scrubbing => write!(f, "scrubbing"),
            PlaybackState::Transitioning => write!(f, "transitioning"),
            PlaybackState::Ended => write!(f, "ended"),
            PlaybackState::LimitReached => write!(f, "limitReached"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}

/// How the user drives playback for the current session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Tilt / shake / swipe
    Gestures,
    /// Discrete next / previous / exit buttons (sensor fallback)
    Buttons,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputMode::Gestures => write!(f, "gestures"),
            InputMode::Buttons => write!(f, "buttons"),
        }
    }
}

/// Reason a playback session finished, reported to the budget authority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// User swiped down or pressed exit
    Exited,
    /// Sequence played to completion
    Completed,
    /// Watch budget exhausted
    LimitReached,
    /// Playback failed with no remaining items
    Error,
    /// Explicit stop from the caller
    Stopped,
    /// Owner dropped without stopping (best-effort flush)
    Teardown,
}

impl SessionEndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEndReason::Exited => "exited",
            SessionEndReason::Completed => "completed",
            SessionEndReason::LimitReached => "limit_reached",
            SessionEndReason::Error => "error",
            SessionEndReason::Stopped => "stopped",
            SessionEndReason::Teardown => "teardown",
        }
    }
}

impl std::fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command for the front-end media player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerCommand {
    /// Load an item and start it at `start_seconds`
    Load { item_id: String, start_seconds: f64 },
    Play,
    Pause,
    Seek { position_seconds: f64 },
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playing_family_membership() {
        assert!(PlaybackState::LoadingItem.is_playing_family());
        assert!(PlaybackState::Playing.is_playing_family());
        assert!(PlaybackState::Scrubbing.is_playing_family());
        assert!(PlaybackState::Transitioning.is_playing_family());
        assert!(!PlaybackState::Idle.is_playing_family());
        assert!(!PlaybackState::Ended.is_playing_family());
        assert!(!PlaybackState::LimitReached.is_playing_family());
        assert!(!PlaybackState::Error.is_playing_family());
    }

    #[test]
    fn test_playback_state_serializes_camel_case() {
        let json = serde_json::to_string(&PlaybackState::LimitReached).unwrap();
        assert_eq!(json, "\"limitReached\"");
        assert_eq!(PlaybackState::LoadingItem.to_string(), "loadingItem");
    }

    #[test]
    fn test_player_command_tagging() {
        let json = serde_json::to_value(PlayerCommand::Seek { position_seconds: 12.5 }).unwrap();
        assert_eq!(json["command"], "seek");
        assert_eq!(json["position_seconds"], 12.5);
    }
}
