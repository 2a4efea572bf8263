//! Gesture recognition
//!
//! Raw platform events flow through the sample source adapter into the tilt,
//! shake and swipe classifiers. The [`engine::GestureEngine`] bundles them for
//! one playback session and publishes [`engine::GestureSignal`]s.

pub mod engine;
pub mod permission;
pub mod samples;
pub mod shake;
pub mod source;
pub mod swipe;
pub mod tilt;

pub use engine::{GestureConfig, GestureEngine, GestureSignal};
pub use permission::{
    PermissionDecision, PermissionGate, PermissionRequest, PermissionStatus, RequestOrigin,
};
pub use samples::{MotionSample, OrientationSample, TouchPoint};
pub use shake::{ShakeClassifier, ShakeConfig, ShakeEvent};
pub use source::{RawSensorEvent, SampleSourceAdapter, SourceState};
pub use swipe::{SwipeClassifier, SwipeConfig, SwipeEvent};
pub use tilt::{TiltClassifier, TiltConfig, TiltState};
