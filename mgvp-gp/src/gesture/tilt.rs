//! Tilt classifier
//!
//! Folds orientation samples into a continuous [`TiltState`] used to scrub
//! through the current item. Classification is rate limited to one result per
//! tick; samples arriving inside a tick are dropped, not queued.

use super::samples::OrientationSample;
use mgvp_common::events::TiltDirection;
use serde::Serialize;
use tracing::trace;

/// Tilt classifier configuration
#[derive(Debug, Clone)]
pub struct TiltConfig {
    /// Angles with `|beta|` below this are ignored (degrees)
    pub dead_zone_deg: f64,
    /// Angle at which intensity saturates at 1.0 (degrees)
    pub max_angle_deg: f64,
    /// Minimum spacing between classifications (ms, ~60 Hz)
    pub tick_ms: u64,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            dead_zone_deg: 15.0,
            max_angle_deg: 45.0,
            tick_ms: 16,
        }
    }
}

/// Derived continuous scrub signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TiltState {
    pub direction: TiltDirection,
    /// 0.0 at the dead-zone edge, 1.0 at or beyond the max angle
    pub intensity: f64,
    /// Timestamp of the sample that produced this state
    pub timestamp_ms: u64,
}

impl TiltState {
    pub fn neutral(timestamp_ms: u64) -> Self {
        Self {
            direction: TiltDirection::Neutral,
            intensity: 0.0,
            timestamp_ms,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.direction == TiltDirection::Neutral
    }
}

/// Dead-zone / clamp classifier with a per-tick throttle
#[derive(Debug, Clone)]
pub struct TiltClassifier {
    config: TiltConfig,
    last_tick_ms: Option<u64>,
}

impl TiltClassifier {
    pub fn new(config: TiltConfig) -> Self {
        Self {
            config,
            last_tick_ms: None,
        }
    }

    /// Classify one sample, ignoring the throttle
    ///
    /// Missing or non-finite beta degrades to neutral.
    pub fn classify(&self, sample: &OrientationSample) -> TiltState {
        let beta = match sample.beta {
            Some(beta) if beta.is_finite() => beta,
            _ => return TiltState::neutral(sample.timestamp_ms),
        };

        let magnitude = beta.abs();
        if magnitude < self.config.dead_zone_deg {
            return TiltState::neutral(sample.timestamp_ms);
        }

        let span = self.config.max_angle_deg - self.config.dead_zone_deg;
        let intensity = if span <= 0.0 {
            1.0
        } else {
            ((magnitude - self.config.dead_zone_deg) / span).clamp(0.0, 1.0)
        };

        let direction = if beta > 0.0 {
            TiltDirection::Forward
        } else {
            TiltDirection::Backward
        };

        TiltState {
            direction,
            intensity,
            timestamp_ms: sample.timestamp_ms,
        }
    }

    /// Classify a sample if a new tick has started since the last classification
    ///
    /// Returns `None` for samples dropped by the throttle.
    pub fn feed(&mut self, sample: &OrientationSample) -> Option<TiltState> {
        if let Some(last) = self.last_tick_ms {
            if sample.timestamp_ms < last.saturating_add(self.config.tick_ms) {
                trace!("Tilt sample at {}ms dropped by throttle", sample.timestamp_ms);
                return None;
            }
        }

        self.last_tick_ms = Some(sample.timestamp_ms);
        Some(self.classify(sample))
    }
}

impl Default for TiltClassifier {
    fn default() -> Self {
        Self::new(TiltConfig::default())
    }
}
