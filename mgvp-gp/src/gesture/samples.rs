//! Normalized sensor records
//!
//! The sample source adapter turns raw platform events into these records.
//! Timestamps are milliseconds on the session clock's monotonic timeline.

use serde::{Deserialize, Serialize};

/// One instantaneous device-tilt reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    /// Forward/back tilt in degrees; `None` while the sensor is unavailable
    pub beta: Option<f64>,
    /// Left/right tilt in degrees
    pub gamma: Option<f64>,
    /// Compass heading in degrees
    pub alpha: Option<f64>,
    pub timestamp_ms: u64,
}

impl OrientationSample {
    /// Sample carrying only a beta reading
    pub fn with_beta(beta: f64, timestamp_ms: u64) -> Self {
        Self {
            beta: Some(beta),
            gamma: None,
            alpha: None,
            timestamp_ms,
        }
    }
}

/// One instantaneous acceleration reading (m/s², gravity excluded)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Lateral acceleration
    pub x: f64,
    /// Vertical acceleration, used by the dominant-axis check when present
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub timestamp_ms: u64,
}

impl MotionSample {
    /// Sample carrying only lateral acceleration
    pub fn lateral(x: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y: None,
            z: None,
            timestamp_ms,
        }
    }

    /// Sample carrying lateral and vertical acceleration
    pub fn planar(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y: Some(y),
            z: None,
            timestamp_ms,
        }
    }
}

/// Touch start or end position in CSS pixels (+y is down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
    pub timestamp_ms: u64,
}

impl TouchPoint {
    pub fn new(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self { x, y, timestamp_ms }
    }
}
