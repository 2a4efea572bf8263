//! Playback transition table
//!
//! [`decide`] maps `(state, event, cursor)` to the next state plus the side
//! effects the controller must carry out. It is a pure function; the
//! controller owns the player, the position and the event bus.
//!
//! ```text
//! idle ──sequence──▶ loadingItem ──ready──▶ playing ◀──neutral── scrubbing
//!                                            │  ▲   ──tilt────▶
//!                                      shake │  │ ready
//!                                  completed ▼  │
//!                                          transitioning
//! playing|scrubbing ──completed (last)──▶ ended
//! any non-terminal ──limit──▶ limitReached
//! load failure with nothing left ──▶ error
//! ```

use crate::gesture::TiltState;
use mgvp_common::events::{PlaybackState, ShakeDirection, SwipeDirection, TiltDirection};

/// Inputs to the transition table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// A sequence was handed to the controller (`cursor.len` may be 0)
    SequenceLoaded,
    /// Player reports the current item ready
    PlayerReady,
    /// Current item played to its end
    ItemCompleted,
    /// Current item could not be loaded
    ItemLoadFailed,
    Tilt(TiltState),
    /// Shake, or the next/previous button in fallback mode
    Shake(ShakeDirection),
    /// Swipe, or the exit button in fallback mode
    Swipe(SwipeDirection),
    /// Budget authority reported the limit reached
    LimitReached,
}

/// Position within the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub index: usize,
    pub len: usize,
}

impl Cursor {
    pub fn new(index: usize, len: usize) -> Self {
        Self { index, len }
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.len
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Make the item at `index` current and load it from 0
    Load { index: usize },
    /// Seek the current item to 0 and play
    Restart,
    Play,
    /// Pause and start tracking scrub time
    BeginScrub,
    /// Advance the position by the tilt and seek
    Scrub,
    /// Seek to the scrubbed position and resume
    EndScrub,
    Stop,
    /// Hold a shake until the running transition finishes
    QueueShake(ShakeDirection),
    SignalLastItem,
    SignalRestarted,
    SignalItemSkipped,
    SignalEmptySequence,
    /// End the session with the "exited" outcome
    Exit,
}

/// Result of one table lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub next: PlaybackState,
    pub actions: Vec<Action>,
}

impl Decision {
    fn stay(state: PlaybackState) -> Self {
        Self {
            next: state,
            actions: Vec::new(),
        }
    }

    fn to(next: PlaybackState, actions: Vec<Action>) -> Self {
        Self { next, actions }
    }

    /// True when the event had no effect in `from`
    pub fn is_ignored(&self, from: PlaybackState) -> bool {
        self.next == from && self.actions.is_empty()
    }
}

/// Look up the transition for `event` in `state`
pub fn decide(state: PlaybackState, event: &ControllerEvent, cursor: &Cursor) -> Decision {
    use PlaybackState as S;

    if state.is_terminal() {
        return Decision::stay(state);
    }

    if *event == ControllerEvent::LimitReached {
        return Decision::to(S::LimitReached, vec![Action::Stop]);
    }

    match (state, *event) {
        (S::Idle, ControllerEvent::SequenceLoaded) => {
            if cursor.len == 0 {
                Decision::to(S::Error, vec![Action::SignalEmptySequence])
            } else {
                Decision::to(S::LoadingItem, vec![Action::Load { index: 0 }])
            }
        }

        (S::LoadingItem | S::Transitioning, ControllerEvent::PlayerReady) => {
            Decision::to(S::Playing, vec![Action::Play])
        }
        (S::LoadingItem | S::Transitioning, ControllerEvent::Shake(direction)) => {
            Decision::to(state, vec![Action::QueueShake(direction)])
        }

        (S::Playing | S::Scrubbing, ControllerEvent::Shake(ShakeDirection::Right)) => {
            if cursor.has_next() {
                Decision::to(
                    S::Transitioning,
                    vec![Action::Load {
                        index: cursor.index + 1,
                    }],
                )
            } else if state == S::Scrubbing {
                Decision::to(S::Playing, vec![Action::EndScrub, Action::SignalLastItem])
            } else {
                Decision::to(S::Playing, vec![Action::SignalLastItem])
            }
        }
        (S::Playing | S::Scrubbing, ControllerEvent::Shake(ShakeDirection::Left)) => {
            if cursor.has_previous() {
                Decision::to(
                    S::Transitioning,
                    vec![Action::Load {
                        index: cursor.index - 1,
                    }],
                )
            } else {
                Decision::to(S::Playing, vec![Action::Restart, Action::SignalRestarted])
            }
        }

        (S::Playing, ControllerEvent::Tilt(tilt)) => {
            if tilt.direction == TiltDirection::Neutral {
                Decision::stay(state)
            } else {
                Decision::to(S::Scrubbing, vec![Action::BeginScrub, Action::Scrub])
            }
        }
        (S::Scrubbing, ControllerEvent::Tilt(tilt)) => {
            if tilt.direction == TiltDirection::Neutral {
                Decision::to(S::Playing, vec![Action::EndScrub])
            } else {
                Decision::to(S::Scrubbing, vec![Action::Scrub])
            }
        }

        (S::Playing | S::Scrubbing, ControllerEvent::ItemCompleted) => {
            if cursor.has_next() {
                Decision::to(
                    S::Transitioning,
                    vec![Action::Load {
                        index: cursor.index + 1,
                    }],
                )
            } else {
                Decision::to(S::Ended, vec![Action::Stop])
            }
        }

        (_, ControllerEvent::ItemLoadFailed) if state.is_playing_family() => {
            if cursor.has_next() {
                let next = if state == S::LoadingItem {
                    S::LoadingItem
                } else {
                    S::Transitioning
                };
                Decision::to(
                    next,
                    vec![
                        Action::SignalItemSkipped,
                        Action::Load {
                            index: cursor.index + 1,
                        },
                    ],
                )
            } else {
                Decision::to(S::Error, vec![Action::SignalItemSkipped, Action::Stop])
            }
        }

        (_, ControllerEvent::Swipe(SwipeDirection::Down)) if state.is_playing_family() => {
            Decision::to(state, vec![Action::Stop, Action::Exit])
        }

        _ => Decision::stay(state),
    }
}

/// Scrubbed position after `elapsed_secs` at the given tilt
///
/// Moves by `intensity × max_rate × elapsed`, clamped to `[0, duration]`.
pub fn scrub_position(
    position: f64,
    duration: f64,
    tilt: &TiltState,
    max_rate: f64,
    elapsed_secs: f64,
) -> f64 {
    let delta = tilt.intensity * max_rate * elapsed_secs.max(0.0);
    let moved = match tilt.direction {
        TiltDirection::Forward => position + delta,
        TiltDirection::Backward => position - delta,
        TiltDirection::Neutral => position,
    };
    moved.clamp(0.0, duration.max(0.0))
}
