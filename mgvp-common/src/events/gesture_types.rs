//! Gesture direction types shared between the classifiers and event consumers

use serde::{Deserialize, Serialize};

/// Scrub direction derived from device tilt
///
/// Positive beta (top edge tipped away from the viewer) maps to `Forward`.
/// That mapping is a product choice, not a physical law; flipping it is a
/// breaking UX change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TiltDirection {
    Forward,
    Backward,
    Neutral,
}

/// Lateral shake direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShakeDirection {
    Left,
    Right,
}

/// Swipe direction in screen coordinates (+y is down)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl std::fmt::Display for ShakeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShakeDirection::Left => write!(f, "left"),
            ShakeDirection::Right => write!(f, "right"),
        }
    }
}

impl std::fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwipeDirection::Up => write!(f, "up"),
            SwipeDirection::Down => write!(f, "down"),
            SwipeDirection::Left => write!(f, "left"),
            SwipeDirection::Right => write!(f, "right"),
        }
    }
}
