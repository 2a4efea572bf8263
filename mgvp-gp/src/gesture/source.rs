//! Sample source adapter
//!
//! Normalizes raw platform events (as posted by the front end) into the
//! classifier records. Orientation and motion events are dispatched only after
//! the permission gate activated the adapter in a secure context; touch events
//! need the gate to have run but not the motion permission itself.

use super::samples::{MotionSample, OrientationSample, TouchPoint};
use crate::error::{Error, Result};
use mgvp_common::time::SharedClock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

/// A client timestamp this far behind the timeline means the client clock
/// restarted; the offset is captured again
const CLIENT_CLOCK_RESET_MS: u64 = 1_000;

/// Raw platform event
///
/// `timestamp_ms` is optional; events without one are stamped with the
/// session clock on arrival. Client timestamps are shifted onto the session
/// clock so both kinds share one timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawSensorEvent {
    Orientation {
        #[serde(default)]
        beta: Option<f64>,
        #[serde(default)]
        gamma: Option<f64>,
        #[serde(default)]
        alpha: Option<f64>,
        #[serde(default)]
        timestamp_ms: Option<u64>,
    },
    Motion {
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
        #[serde(default)]
        z: Option<f64>,
        #[serde(default)]
        timestamp_ms: Option<u64>,
    },
    TouchStart {
        x: f64,
        y: f64,
        #[serde(default)]
        timestamp_ms: Option<u64>,
    },
    TouchEnd {
        x: f64,
        y: f64,
        #[serde(default)]
        timestamp_ms: Option<u64>,
    },
    TouchCancel,
}

/// Classifier-ready sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedSample {
    Orientation(OrientationSample),
    Motion(MotionSample),
    TouchStart(TouchPoint),
    TouchEnd(TouchPoint),
    TouchCancel,
}

/// Adapter dispatch state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    /// Permission gate has not run; nothing is dispatched
    Disabled,
    /// Sensors permitted in a secure context; everything is dispatched
    Active,
    /// Sensors unavailable or denied; only touch is dispatched
    Fallback,
}

pub struct SampleSourceAdapter {
    clock: SharedClock,
    state: SourceState,
    last_timestamp_ms: u64,
    /// Session clock minus client clock, captured from the first stamped event
    client_offset_ms: Option<i64>,
    dropped: u64,
}

impl SampleSourceAdapter {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            state: SourceState::Disabled,
            last_timestamp_ms: 0,
            client_offset_ms: None,
            dropped: 0,
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Samples discarded since creation (inactive, malformed or non-finite)
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Start dispatching motion and orientation samples
    ///
    /// Sensor APIs are only exposed to secure contexts; without one the
    /// adapter stays inert and the caller must fall back.
    pub fn activate(&mut self, secure_context: bool) -> Result<()> {
        if !secure_context {
            return Err(Error::SensorUnavailable(
                "motion sensors require a secure context".to_string(),
            ));
        }
        info!("Sample source activated");
        self.state = SourceState::Active;
        Ok(())
    }

    /// Dispatch touch only
    pub fn fall_back(&mut self) {
        info!("Sample source in fallback mode (touch only)");
        self.state = SourceState::Fallback;
    }

    /// Stop dispatching entirely
    pub fn disable(&mut self) {
        debug!("Sample source disabled");
        self.state = SourceState::Disabled;
    }

    /// Normalize one raw event
    ///
    /// Returns `None` when the event must not be dispatched in the current
    /// state or carries no usable reading. Never fails.
    pub fn normalize(&mut self, raw: RawSensorEvent) -> Option<NormalizedSample> {
        let sample = match raw {
            RawSensorEvent::Orientation {
                beta,
                gamma,
                alpha,
                timestamp_ms,
            } => {
                if self.state != SourceState::Active {
                    return self.drop_sample("orientation while not active");
                }
                NormalizedSample::Orientation(OrientationSample {
                    beta: beta.filter(|v| v.is_finite()),
                    gamma: gamma.filter(|v| v.is_finite()),
                    alpha: alpha.filter(|v| v.is_finite()),
                    timestamp_ms: self.stamp(timestamp_ms),
                })
            }
            RawSensorEvent::Motion {
                x,
                y,
                z,
                timestamp_ms,
            } => {
                if self.state != SourceState::Active {
                    return self.drop_sample("motion while not active");
                }
                let x = match x.filter(|v| v.is_finite()) {
                    Some(x) => x,
                    None => return self.drop_sample("motion without lateral reading"),
                };
                NormalizedSample::Motion(MotionSample {
                    x,
                    y: y.filter(|v| v.is_finite()),
                    z: z.filter(|v| v.is_finite()),
                    timestamp_ms: self.stamp(timestamp_ms),
                })
            }
            RawSensorEvent::TouchStart { x, y, timestamp_ms } => {
                if self.state == SourceState::Disabled {
                    return self.drop_sample("touch while disabled");
                }
                NormalizedSample::TouchStart(TouchPoint::new(x, y, self.stamp(timestamp_ms)))
            }
            RawSensorEvent::TouchEnd { x, y, timestamp_ms } => {
                if self.state == SourceState::Disabled {
                    return self.drop_sample("touch while disabled");
                }
                NormalizedSample::TouchEnd(TouchPoint::new(x, y, self.stamp(timestamp_ms)))
            }
            RawSensorEvent::TouchCancel => NormalizedSample::TouchCancel,
        };

        Some(sample)
    }

    /// Place the event on the session timeline, never moving backwards
    ///
    /// Client timestamps keep their spacing but are shifted by a fixed
    /// offset, so an unstamped event in between cannot pin later ones.
    fn stamp(&mut self, timestamp_ms: Option<u64>) -> u64 {
        let now = self.clock.now_ms();
        let ts = match timestamp_ms {
            None => now,
            Some(client) => {
                let offset = *self
                    .client_offset_ms
                    .get_or_insert_with(|| now as i64 - client as i64);
                let shifted = shift(client, offset);
                if shifted.saturating_add(CLIENT_CLOCK_RESET_MS) < self.last_timestamp_ms {
                    debug!("Client clock went back to {}ms; re-anchoring", client);
                    self.client_offset_ms = Some(now as i64 - client as i64);
                    now
                } else {
                    shifted
                }
            }
        };

        let ts = ts.max(self.last_timestamp_ms);
        self.last_timestamp_ms = ts;
        ts
    }

    fn drop_sample(&mut self, why: &str) -> Option<NormalizedSample> {
        self.dropped += 1;
        trace!("Dropping sample: {}", why);
        None
    }
}

fn shift(timestamp_ms: u64, offset_ms: i64) -> u64 {
    (timestamp_ms as i64).saturating_add(offset_ms).max(0) as u64
}
