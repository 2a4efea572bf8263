//! Permission gate
//!
//! Decides once per consent request whether gestures drive playback or the
//! discrete button fallback does. The platform prompt itself happens in the
//! front end; the gate receives its result together with the circumstances of
//! the request and applies the decision to the sample source adapter.

use super::source::SampleSourceAdapter;
use crate::error::{Error, Result};
use mgvp_common::events::InputMode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What triggered the permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOrigin {
    /// Issued synchronously from a tap or click
    UserGesture,
    /// Issued from a lifecycle hook, timer or other deferred context
    Background,
}

/// Consent request as reported by the front end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub origin: RequestOrigin,
    /// Page served over a secure context (sensor APIs are hidden otherwise)
    pub secure_context: bool,
    /// Orientation/motion APIs present on the device
    pub sensors_available: bool,
    /// Platform demands an explicit consent prompt
    #[serde(default)]
    pub requires_consent: bool,
    /// Prompt answer (ignored when no prompt is required)
    #[serde(default)]
    pub granted: bool,
}

/// Gate status after the most recent request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// No request processed yet
    Pending,
    Granted,
    /// Consent refused, or requested from a non-user context
    Denied,
    /// No sensors or no secure context; final for the session
    Unavailable,
}

/// Result of one consent request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDecision {
    pub status: PermissionStatus,
    pub mode: InputMode,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct PermissionGate {
    status: PermissionStatus,
    secure_context: bool,
    reason: String,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGate {
    pub fn new() -> Self {
        Self {
            status: PermissionStatus::Pending,
            secure_context: false,
            reason: "permission not requested".to_string(),
        }
    }

    pub fn status(&self) -> PermissionStatus {
        self.status
    }

    /// Mode implied by the current status (buttons until gestures are granted)
    pub fn input_mode(&self) -> InputMode {
        match self.status {
            PermissionStatus::Granted => InputMode::Gestures,
            _ => InputMode::Buttons,
        }
    }

    pub fn decision(&self) -> PermissionDecision {
        PermissionDecision {
            status: self.status,
            mode: self.input_mode(),
            reason: self.reason.clone(),
        }
    }

    /// Process one consent request
    ///
    /// Never fails: refusals resolve to the button fallback. Once sensors are
    /// found unavailable further requests are answered without re-evaluation.
    pub fn request(&mut self, request: &PermissionRequest) -> PermissionDecision {
        if self.status == PermissionStatus::Unavailable {
            debug!("Sensors already unavailable; keeping button mode");
            return self.decision();
        }

        match Self::evaluate(request) {
            Ok(()) => {
                info!("Motion sensor permission granted");
                self.status = PermissionStatus::Granted;
                self.secure_context = request.secure_context;
                self.reason = "sensors permitted".to_string();
            }
            Err(e @ Error::SensorUnavailable(_)) => {
                warn!("{}; falling back to buttons for this session", e);
                self.status = PermissionStatus::Unavailable;
                self.reason = e.to_string();
            }
            Err(e) => {
                info!("{}; falling back to buttons", e);
                self.status = PermissionStatus::Denied;
                self.reason = e.to_string();
            }
        }

        self.decision()
    }

    /// Switch the adapter to match the current status
    ///
    /// Pending leaves the adapter disabled.
    pub fn apply(&self, adapter: &mut SampleSourceAdapter) {
        match self.status {
            PermissionStatus::Pending => adapter.disable(),
            PermissionStatus::Granted => {
                if let Err(e) = adapter.activate(self.secure_context) {
                    warn!("Could not activate sample source: {}", e);
                    adapter.fall_back();
                }
            }
            PermissionStatus::Denied | PermissionStatus::Unavailable => adapter.fall_back(),
        }
    }

    fn evaluate(request: &PermissionRequest) -> Result<()> {
        if !request.secure_context {
            return Err(Error::SensorUnavailable(
                "page is not a secure context".to_string(),
            ));
        }
        if !request.sensors_available {
            return Err(Error::SensorUnavailable(
                "device exposes no motion sensors".to_string(),
            ));
        }
        if !request.requires_consent {
            return Ok(());
        }
        if request.origin == RequestOrigin::Background {
            return Err(Error::PermissionDenied(
                "consent must be requested from a user action".to_string(),
            ));
        }
        if !request.granted {
            return Err(Error::PermissionDenied("user declined motion access".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::source::SourceState;
    use mgvp_common::time::ManualClock;
    use std::sync::Arc;

    fn request(origin: RequestOrigin, granted: bool) -> PermissionRequest {
        PermissionRequest {
            origin,
            secure_context: true,
            sensors_available: true,
            requires_consent: true,
            granted,
        }
    }

    #[test]
    fn test_pending_gate_means_buttons() {
        let gate = PermissionGate::new();
        assert_eq!(gate.status(), PermissionStatus::Pending);
        assert_eq!(gate.input_mode(), InputMode::Buttons);
    }

    #[test]
    fn test_user_gesture_grant_enables_gestures() {
        let mut gate = PermissionGate::new();
        let decision = gate.request(&request(RequestOrigin::UserGesture, true));
        assert_eq!(decision.status, PermissionStatus::Granted);
        assert_eq!(decision.mode, InputMode::Gestures);

        let mut adapter = SampleSourceAdapter::new(Arc::new(ManualClock::new(0)));
        gate.apply(&mut adapter);
        assert_eq!(adapter.state(), SourceState::Active);
    }

    #[test]
    fn test_background_request_rejected() {
        let mut gate = PermissionGate::new();
        // Even a positive answer is unusable when the prompt was not user-initiated
        let decision = gate.request(&request(RequestOrigin::Background, true));
        assert_eq!(decision.status, PermissionStatus::Denied);
        assert_eq!(decision.mode, InputMode::Buttons);

        // A later explicit user action may still succeed
        let decision = gate.request(&request(RequestOrigin::UserGesture, true));
        assert_eq!(decision.mode, InputMode::Gestures);
    }

    #[test]
    fn test_denied_falls_back_to_buttons() {
        let mut gate = PermissionGate::new();
        let decision = gate.request(&request(RequestOrigin::UserGesture, false));
        assert_eq!(decision.status, PermissionStatus::Denied);
        assert_eq!(decision.mode, InputMode::Buttons);

        let mut adapter = SampleSourceAdapter::new(Arc::new(ManualClock::new(0)));
        gate.apply(&mut adapter);
        assert_eq!(adapter.state(), SourceState::Fallback);
    }

    #[test]
    fn test_no_consent_platform_grants_without_prompt() {
        let mut gate = PermissionGate::new();
        let decision = gate.request(&PermissionRequest {
            origin: RequestOrigin::Background,
            secure_context: true,
            sensors_available: true,
            requires_consent: false,
            granted: false,
        });
        assert_eq!(decision.mode, InputMode::Gestures);
    }

    #[test]
    fn test_unavailable_is_permanent() {
        let mut gate = PermissionGate::new();
        let mut insecure = request(RequestOrigin::UserGesture, true);
        insecure.secure_context = false;

        let decision = gate.request(&insecure);
        assert_eq!(decision.status, PermissionStatus::Unavailable);

        let decision = gate.request(&request(RequestOrigin::UserGesture, true));
        assert_eq!(decision.status, PermissionStatus::Unavailable);
        assert_eq!(decision.mode, InputMode::Buttons);
    }
}
