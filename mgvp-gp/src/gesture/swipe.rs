//! Swipe classifier
//!
//! Pairs a touch start with the following touch end. Below-threshold touches
//! produce nothing; no partial state is exposed to callers.

use super::samples::TouchPoint;
use mgvp_common::events::SwipeDirection;
use serde::Serialize;
use tracing::trace;

/// Swipe classifier configuration
#[derive(Debug, Clone)]
pub struct SwipeConfig {
    /// Minimum displacement along the dominant axis (px)
    pub min_distance_px: f64,
    /// Maximum perpendicular displacement as a fraction of `min_distance_px`
    pub max_perpendicular_ratio: f64,
    /// Maximum start-to-end duration (ms)
    pub max_duration_ms: u64,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            min_distance_px: 100.0,
            max_perpendicular_ratio: 0.5,
            max_duration_ms: 500,
        }
    }
}

/// A classified discrete swipe
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwipeEvent {
    pub direction: SwipeDirection,
    /// Displacement along the dominant axis (px)
    pub distance: f64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SwipeClassifier {
    config: SwipeConfig,
    start: Option<TouchPoint>,
}

impl SwipeClassifier {
    pub fn new(config: SwipeConfig) -> Self {
        Self {
            config,
            start: None,
        }
    }

    /// Record a touch start, replacing any unfinished one
    pub fn start(&mut self, point: TouchPoint) {
        self.start = Some(point);
    }

    /// Drop an unfinished touch (e.g. touch cancel)
    pub fn cancel(&mut self) {
        self.start = None;
    }

    /// Finish the current touch and classify it
    pub fn end(&mut self, point: TouchPoint) -> Option<SwipeEvent> {
        let start = self.start.take()?;

        let dx = point.x - start.x;
        let dy = point.y - start.y;
        if !dx.is_finite() || !dy.is_finite() {
            return None;
        }
        let duration_ms = point.timestamp_ms.checked_sub(start.timestamp_ms)?;

        let (dominant, perpendicular, direction) = if dx.abs() >= dy.abs() {
            let direction = if dx >= 0.0 {
                SwipeDirection::Right
            } else {
                SwipeDirection::Left
            };
            (dx.abs(), dy.abs(), direction)
        } else {
            let direction = if dy >= 0.0 {
                SwipeDirection::Down
            } else {
                SwipeDirection::Up
            };
            (dy.abs(), dx.abs(), direction)
        };

        let max_perpendicular = self.config.min_distance_px * self.config.max_perpendicular_ratio;
        if dominant < self.config.min_distance_px
            || perpendicular > max_perpendicular
            || duration_ms > self.config.max_duration_ms
        {
            trace!(
                "Touch not a swipe (dominant={:.0}px, perpendicular={:.0}px, {}ms)",
                dominant,
                perpendicular,
                duration_ms
            );
            return None;
        }

        Some(SwipeEvent {
            direction,
            distance: dominant,
            duration_ms,
        })
    }
}
