//! Playback controller
//!
//! Single writer of [`PlaybackState`]. Gesture signals, player feedback,
//! fallback buttons and budget reports are all turned into
//! [`ControllerEvent`]s, looked up in the transition table, and the resulting
//! actions are carried out against the [`MediaPlayer`] and the event bus.

use super::player::{MediaPlayer, PlayerEvent};
use super::sequence::Sequence;
use super::transitions::{decide, scrub_position, Action, ControllerEvent, Cursor};
use crate::budget::WatchBudget;
use crate::error::{Error, Result};
use crate::gesture::{GestureSignal, TiltState};
use chrono::Utc;
use mgvp_common::api::SequencedMediaItem;
use mgvp_common::events::{
    EventBus, MgvpEvent, PlaybackState, SessionEndReason, ShakeDirection, SwipeDirection,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// Controller tuning
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Seconds of media per second of wall time at full tilt
    pub max_scrub_rate: f64,
    /// Longest gap between tilt ticks counted toward one scrub step (ms)
    pub max_scrub_step_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_scrub_rate: 2.0,
            max_scrub_step_ms: 250,
        }
    }
}

/// Discrete buttons shown when gestures are unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Next,
    Previous,
    Exit,
}

/// Why a session finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionOutcome {
    /// Swipe down or exit button
    Exited,
    /// Last item completed
    Ended,
    LimitReached,
    Error,
    /// Stopped by the caller
    Stopped,
}

impl SessionOutcome {
    pub fn end_reason(self) -> SessionEndReason {
        match self {
            SessionOutcome::Exited => SessionEndReason::Exited,
            SessionOutcome::Ended => SessionEndReason::Completed,
            SessionOutcome::LimitReached => SessionEndReason::LimitReached,
            SessionOutcome::Error => SessionEndReason::Error,
            SessionOutcome::Stopped => SessionEndReason::Stopped,
        }
    }
}

pub struct PlaybackController {
    config: ControllerConfig,
    state: PlaybackState,
    sequence: Option<Sequence>,
    index: usize,
    position_seconds: f64,
    /// Timestamp of the last applied scrub tick
    scrub_anchor_ms: Option<u64>,
    /// Single-slot queue for a shake arriving mid-transition
    pending_shake: Option<ShakeDirection>,
    /// Context for the next skip/empty signal
    failure_reason: Option<String>,
    outcome: Option<SessionOutcome>,
    player: Box<dyn MediaPlayer>,
    player_stopped: bool,
    bus: EventBus,
}

impl PlaybackController {
    pub fn new(config: ControllerConfig, player: Box<dyn MediaPlayer>, bus: EventBus) -> Self {
        Self {
            config,
            state: PlaybackState::Idle,
            sequence: None,
            index: 0,
            position_seconds: 0.0,
            scrub_anchor_ms: None,
            pending_shake: None,
            failure_reason: None,
            outcome: None,
            player,
            player_stopped: false,
            bus,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Set once the session should end
    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_seconds
    }

    pub fn current_item(&self) -> Option<&SequencedMediaItem> {
        self.sequence.as_ref().and_then(|s| s.get(self.index))
    }

    pub fn pending_shake(&self) -> Option<ShakeDirection> {
        self.pending_shake
    }

    pub fn item_count(&self) -> usize {
        self.sequence.as_ref().map_or(0, Sequence::len)
    }

    /// Hand the scanned sequence to the controller
    ///
    /// An empty or malformed sequence moves the controller to `error`, emits
    /// the friendly empty-sequence signal and returns the validation error.
    /// After a budget limit the sequence is kept for reporting but nothing
    /// is loaded.
    pub fn load_sequence(&mut self, items: Vec<SequencedMediaItem>) -> Result<()> {
        if self.sequence.is_some()
            || !matches!(self.state, PlaybackState::Idle | PlaybackState::LimitReached)
        {
            return Err(Error::InvalidState(format!(
                "sequence already loaded (state {})",
                self.state
            )));
        }

        match Sequence::new(items) {
            Ok(sequence) => {
                info!("Sequence loaded with {} items", sequence.len());
                self.sequence = Some(sequence);
                self.dispatch(ControllerEvent::SequenceLoaded);
                Ok(())
            }
            Err(e) => {
                warn!("Rejecting sequence: {}", e);
                self.failure_reason = Some(e.to_string());
                self.dispatch(ControllerEvent::SequenceLoaded);
                Err(e)
            }
        }
    }

    pub fn handle_signal(&mut self, signal: &GestureSignal) {
        let event = match signal {
            GestureSignal::Tilt(tilt) => ControllerEvent::Tilt(*tilt),
            GestureSignal::Shake(shake) => ControllerEvent::Shake(shake.direction),
            GestureSignal::Swipe(swipe) => ControllerEvent::Swipe(swipe.direction),
        };
        self.dispatch(event);
    }

    pub fn handle_control(&mut self, action: ControlAction) {
        debug!("Control button: {:?}", action);
        let event = match action {
            ControlAction::Next => ControllerEvent::Shake(ShakeDirection::Right),
            ControlAction::Previous => ControllerEvent::Shake(ShakeDirection::Left),
            ControlAction::Exit => ControllerEvent::Swipe(SwipeDirection::Down),
        };
        self.dispatch(event);
    }

    pub fn handle_player_event(&mut self, event: &PlayerEvent) {
        let current = match self.current_item() {
            Some(item) => item.id.clone(),
            None => return,
        };
        if event.item_id() != current {
            trace!(
                "Ignoring player event for {} (current {})",
                event.item_id(),
                current
            );
            return;
        }

        match event {
            PlayerEvent::Ready { .. } => self.dispatch(ControllerEvent::PlayerReady),
            PlayerEvent::Position {
                position_seconds, ..
            } => {
                // Scrubbing owns the position until the tilt returns to neutral
                if self.state == PlaybackState::Playing && position_seconds.is_finite() {
                    let duration = self.current_duration();
                    self.position_seconds = position_seconds.clamp(0.0, duration);
                }
            }
            PlayerEvent::Completed { .. } => {
                self.position_seconds = self.current_duration();
                self.dispatch(ControllerEvent::ItemCompleted);
            }
            PlayerEvent::LoadFailed { item_id, reason } => {
                let error = Error::ItemLoad {
                    item_id: item_id.clone(),
                    reason: reason.clone(),
                };
                warn!("{}", error);
                self.failure_reason = Some(reason.clone());
                self.dispatch(ControllerEvent::ItemLoadFailed);
            }
        }
    }

    /// Apply a budget report; only an explicit limit halts playback
    pub fn on_budget(&mut self, budget: &WatchBudget) {
        if budget.limit_reached {
            info!("Watch budget exhausted; stopping playback");
            self.dispatch(ControllerEvent::LimitReached);
        }
    }

    /// Stop the player if anything is still loaded
    pub fn shutdown(&mut self) {
        if self.state.is_playing_family() {
            self.stop_player();
        }
        self.pending_shake = None;
    }

    fn stop_player(&mut self) {
        if !self.player_stopped {
            self.player_stopped = true;
            self.player.stop();
        }
    }

    fn cursor(&self) -> Cursor {
        Cursor::new(self.index, self.item_count())
    }

    fn current_duration(&self) -> f64 {
        self.current_item().map_or(0.0, |item| item.duration_seconds)
    }

    fn dispatch(&mut self, event: ControllerEvent) {
        let decision = decide(self.state, &event, &self.cursor());
        if decision.is_ignored(self.state) {
            trace!("{:?} ignored in state {}", event, self.state);
            return;
        }

        for action in &decision.actions {
            self.perform(*action, &event);
        }
        self.set_state(decision.next);

        if event == ControllerEvent::PlayerReady && self.state == PlaybackState::Playing {
            if let Some(direction) = self.pending_shake.take() {
                debug!("Replaying queued shake {}", direction);
                self.dispatch(ControllerEvent::Shake(direction));
            }
        }
    }

    fn perform(&mut self, action: Action, event: &ControllerEvent) {
        match action {
            Action::Load { index } => self.load_item(index),
            Action::Restart => {
                self.position_seconds = 0.0;
                self.scrub_anchor_ms = None;
                self.player.seek(0.0);
                self.player.play();
            }
            Action::Play => self.player.play(),
            Action::BeginScrub => {
                self.player.pause();
                self.scrub_anchor_ms = match event {
                    ControllerEvent::Tilt(tilt) => Some(tilt.timestamp_ms),
                    _ => None,
                };
            }
            Action::Scrub => {
                if let ControllerEvent::Tilt(tilt) = event {
                    self.scrub(tilt);
                }
            }
            Action::EndScrub => {
                self.scrub_anchor_ms = None;
                self.player.seek(self.position_seconds);
                self.player.play();
            }
            Action::Stop => self.stop_player(),
            Action::QueueShake(direction) => {
                if self.pending_shake.is_none() {
                    debug!("Queueing shake {} until transition completes", direction);
                    self.pending_shake = Some(direction);
                } else {
                    debug!("Dropping shake {}: one already queued", direction);
                }
            }
            Action::SignalLastItem => {
                info!("Already on the last item; not advancing");
                let item_id = self.current_item_id();
                self.emit(MgvpEvent::LastItemReached {
                    item_id,
                    timestamp: Utc::now(),
                });
            }
            Action::SignalRestarted => {
                let item_id = self.current_item_id();
                self.emit(MgvpEvent::ItemRestarted {
                    item_id,
                    timestamp: Utc::now(),
                });
            }
            Action::SignalItemSkipped => {
                let item_id = self.current_item_id();
                let reason = self
                    .failure_reason
                    .take()
                    .unwrap_or_else(|| "load failed".to_string());
                self.emit(MgvpEvent::ItemSkipped {
                    item_id,
                    reason,
                    timestamp: Utc::now(),
                });
            }
            Action::SignalEmptySequence => {
                let message = self
                    .failure_reason
                    .take()
                    .unwrap_or_else(|| Error::EmptySequence.to_string());
                self.emit(MgvpEvent::EmptySequence {
                    message,
                    timestamp: Utc::now(),
                });
            }
            Action::Exit => {
                info!("Exit requested");
                self.outcome = Some(SessionOutcome::Exited);
            }
        }
    }

    fn load_item(&mut self, index: usize) {
        let item = match self.sequence.as_ref().and_then(|s| s.get(index)) {
            Some(item) => item.clone(),
            None => {
                warn!("No item at index {}", index);
                return;
            }
        };

        self.index = index;
        self.position_seconds = 0.0;
        self.scrub_anchor_ms = None;
        info!("Loading item {} (index {})", item.id, index);

        self.player.load(&item, 0.0);
        self.emit(MgvpEvent::ItemStarted {
            item_id: item.id,
            index,
            order: item.order,
            timestamp: Utc::now(),
        });
    }

    fn scrub(&mut self, tilt: &TiltState) {
        let elapsed_ms = self
            .scrub_anchor_ms
            .map_or(0, |anchor| tilt.timestamp_ms.saturating_sub(anchor))
            .min(self.config.max_scrub_step_ms);
        self.scrub_anchor_ms = Some(tilt.timestamp_ms);

        self.position_seconds = scrub_position(
            self.position_seconds,
            self.current_duration(),
            tilt,
            self.config.max_scrub_rate,
            elapsed_ms as f64 / 1000.0,
        );
        self.player.seek(self.position_seconds);

        let item_id = self.current_item_id();
        self.emit(MgvpEvent::ScrubProgress {
            item_id,
            position_seconds: self.position_seconds,
            direction: tilt.direction,
            intensity: tilt.intensity,
            timestamp: Utc::now(),
        });
    }

    fn set_state(&mut self, next: PlaybackState) {
        if next == self.state {
            return;
        }

        let old = self.state;
        self.state = next;
        info!("Playback state: {} -> {}", old, next);

        if !next.is_playing_family() {
            self.pending_shake = None;
        }
        match next {
            PlaybackState::Ended => self.outcome = Some(SessionOutcome::Ended),
            PlaybackState::LimitReached => self.outcome = Some(SessionOutcome::LimitReached),
            PlaybackState::Error => self.outcome = Some(SessionOutcome::Error),
            _ => {}
        }

        self.emit(MgvpEvent::PlaybackStateChanged {
            old_state: old,
            new_state: next,
            timestamp: Utc::now(),
        });
    }

    fn current_item_id(&self) -> String {
        self.current_item()
            .map(|item| item.id.clone())
            .unwrap_or_default()
    }

    fn emit(&self, event: MgvpEvent) {
        self.bus.emit_lossy(event);
    }
}
