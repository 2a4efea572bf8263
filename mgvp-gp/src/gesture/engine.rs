//! Gesture engine
//!
//! Owns the sample source adapter and the three classifiers for one playback
//! session. Classified gestures leave the engine only as [`GestureSignal`]s on
//! a channel; the engine never touches playback state.

use super::permission::PermissionGate;
use super::samples::{MotionSample, OrientationSample};
use super::shake::{ShakeClassifier, ShakeConfig, ShakeEvent};
use super::source::{NormalizedSample, RawSensorEvent, SampleSourceAdapter, SourceState};
use super::swipe::{SwipeClassifier, SwipeConfig, SwipeEvent};
use super::tilt::{TiltClassifier, TiltConfig, TiltState};
use mgvp_common::time::SharedClock;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Classifier output consumed by the playback controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureSignal {
    Tilt(TiltState),
    Shake(ShakeEvent),
    Swipe(SwipeEvent),
}

/// Thresholds for all three classifiers
#[derive(Debug, Clone, Default)]
pub struct GestureConfig {
    pub tilt: TiltConfig,
    pub shake: ShakeConfig,
    pub swipe: SwipeConfig,
}

pub struct GestureEngine {
    adapter: SampleSourceAdapter,
    tilt: TiltClassifier,
    shake: ShakeClassifier,
    swipe: SwipeClassifier,
    /// Last tilt forwarded, used to suppress repeated neutral states
    last_tilt_neutral: bool,
    signals: mpsc::UnboundedSender<GestureSignal>,
}

impl GestureEngine {
    pub fn new(
        config: GestureConfig,
        clock: SharedClock,
        signals: mpsc::UnboundedSender<GestureSignal>,
    ) -> Self {
        debug!("Gesture engine created");
        Self {
            adapter: SampleSourceAdapter::new(clock),
            tilt: TiltClassifier::new(config.tilt),
            shake: ShakeClassifier::new(config.shake),
            swipe: SwipeClassifier::new(config.swipe),
            last_tilt_neutral: true,
            signals,
        }
    }

    /// Bring the adapter in line with the permission gate
    pub fn apply_permission(&mut self, gate: &PermissionGate) {
        gate.apply(&mut self.adapter);
    }

    pub fn source_state(&self) -> SourceState {
        self.adapter.state()
    }

    /// Run one raw event through the adapter and the matching classifier
    ///
    /// Returns the number of signals published.
    pub fn ingest(&mut self, raw: RawSensorEvent) -> usize {
        let sample = match self.adapter.normalize(raw) {
            Some(sample) => sample,
            None => return 0,
        };

        match sample {
            NormalizedSample::Orientation(sample) => self.on_orientation(&sample),
            NormalizedSample::Motion(sample) => self.on_motion(sample),
            NormalizedSample::TouchStart(point) => {
                self.swipe.start(point);
                0
            }
            NormalizedSample::TouchEnd(point) => match self.swipe.end(point) {
                Some(event) => {
                    debug!(
                        "Swipe {} ({:.0}px in {}ms)",
                        event.direction, event.distance, event.duration_ms
                    );
                    self.publish(GestureSignal::Swipe(event))
                }
                None => 0,
            },
            NormalizedSample::TouchCancel => {
                self.swipe.cancel();
                0
            }
        }
    }

    fn on_orientation(&mut self, sample: &OrientationSample) -> usize {
        let state = match self.tilt.feed(sample) {
            Some(state) => state,
            None => return 0,
        };

        // A run of neutral ticks carries no information after the first
        if state.is_neutral() && self.last_tilt_neutral {
            return 0;
        }
        self.last_tilt_neutral = state.is_neutral();
        self.publish(GestureSignal::Tilt(state))
    }

    fn on_motion(&mut self, sample: MotionSample) -> usize {
        match self.shake.feed(sample) {
            Some(event) => {
                debug!(
                    "Shake {} (confidence {:.2})",
                    event.direction, event.confidence
                );
                self.publish(GestureSignal::Shake(event))
            }
            None => 0,
        }
    }

    fn publish(&self, signal: GestureSignal) -> usize {
        if self.signals.send(signal).is_err() {
            trace!("Gesture signal dropped: receiver closed");
            return 0;
        }
        1
    }
}

impl Drop for GestureEngine {
    fn drop(&mut self) {
        debug!(
            "Gesture engine released ({} samples dropped)",
            self.adapter.dropped()
        );
    }
}
