//! Shared fixtures for mgvp-gp integration tests
//!
//! - MockPlayer: records every command the controller issues
//! - MockAuthority: scripted budget authority that records its calls
//! - StaticSequences: in-memory sequence provider

#![allow(dead_code)]

use async_trait::async_trait;
use mgvp_common::api::{HeartbeatResponse, SequencedMediaItem, StartSessionResponse};
use mgvp_common::events::{EventBus, MgvpEvent, PlayerCommand, SessionEndReason};
use mgvp_common::time::{ManualClock, SharedClock};
use mgvp_gp::budget::BudgetAuthority;
use mgvp_gp::config::ServiceConfig;
use mgvp_gp::gesture::{PermissionGate, PermissionRequest, RequestOrigin};
use mgvp_gp::playback::{MediaPlayer, SequenceProvider};
use mgvp_gp::session::{SessionContext, SessionHandle, SessionSettings, SessionSnapshot};
use mgvp_gp::{Error, Result, SharedState};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub fn item(id: &str, duration_seconds: f64, order: u32) -> SequencedMediaItem {
    SequencedMediaItem {
        id: id.to_string(),
        duration_seconds,
        order,
    }
}

/// The two-item sequence used by the end-to-end scenarios
pub fn two_items() -> Vec<SequencedMediaItem> {
    vec![item("A", 300.0, 0), item("B", 200.0, 1)]
}

// ============================================================================
// Player
// ============================================================================

#[derive(Clone, Default)]
pub struct MockPlayer {
    commands: Arc<Mutex<Vec<PlayerCommand>>>,
}

impl MockPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<PlayerCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// Item ids passed to `load`, in order
    pub fn loads(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                PlayerCommand::Load { item_id, .. } => Some(item_id),
                _ => None,
            })
            .collect()
    }

    fn push(&self, command: PlayerCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

impl MediaPlayer for MockPlayer {
    fn load(&mut self, item: &SequencedMediaItem, start_seconds: f64) {
        self.push(PlayerCommand::Load {
            item_id: item.id.clone(),
            start_seconds,
        });
    }

    fn play(&mut self) {
        self.push(PlayerCommand::Play);
    }

    fn pause(&mut self) {
        self.push(PlayerCommand::Pause);
    }

    fn seek(&mut self, position_seconds: f64) {
        self.push(PlayerCommand::Seek { position_seconds });
    }

    fn stop(&mut self) {
        self.push(PlayerCommand::Stop);
    }
}

// ============================================================================
// Budget authority
// ============================================================================

pub fn answer(remaining_seconds: f64, limit_reached: bool) -> Result<HeartbeatResponse> {
    Ok(HeartbeatResponse {
        elapsed_seconds: 60.0,
        remaining_seconds,
        limit_reached,
    })
}

/// Authority answering from a script; unscripted heartbeats keep 600s remaining
pub struct MockAuthority {
    start: Mutex<Option<Result<StartSessionResponse>>>,
    heartbeats: Mutex<VecDeque<Result<HeartbeatResponse>>>,
    pub heartbeat_positions: Mutex<Vec<f64>>,
    pub ended: Mutex<Vec<(String, SessionEndReason, f64)>>,
    /// Latency of the final report
    end_delay: Mutex<Duration>,
}

impl MockAuthority {
    pub fn new() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    pub fn scripted(heartbeats: Vec<Result<HeartbeatResponse>>) -> Arc<Self> {
        Arc::new(Self {
            start: Mutex::new(Some(Ok(StartSessionResponse {
                session_id: "session-1".to_string(),
                remaining_seconds: 600.0,
                limit_reached: false,
            }))),
            heartbeats: Mutex::new(heartbeats.into()),
            heartbeat_positions: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
            end_delay: Mutex::new(Duration::ZERO),
        })
    }

    /// Authority that takes `delay` to acknowledge the final report
    pub fn slow_to_end(delay: Duration) -> Arc<Self> {
        let authority = Self::new();
        *authority.end_delay.lock().unwrap() = delay;
        authority
    }

    /// Authority refusing to open a session
    pub fn refusing_start(error: Error) -> Arc<Self> {
        let authority = Self::new();
        *authority.start.lock().unwrap() = Some(Err(error));
        authority
    }

    pub fn heartbeat_count(&self) -> usize {
        self.heartbeat_positions.lock().unwrap().len()
    }

    pub fn ended(&self) -> Vec<(String, SessionEndReason, f64)> {
        self.ended.lock().unwrap().clone()
    }
}

#[async_trait]
impl BudgetAuthority for MockAuthority {
    async fn start_session(&self, _profile_id: &str, _item_id: &str) -> Result<StartSessionResponse> {
        self.start
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(Error::Internal("session started twice".to_string())))
    }

    async fn heartbeat(&self, _session_id: &str, position_seconds: f64) -> Result<HeartbeatResponse> {
        self.heartbeat_positions.lock().unwrap().push(position_seconds);
        self.heartbeats
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| answer(600.0, false))
    }

    async fn end_session(
        &self,
        session_id: &str,
        reason: SessionEndReason,
        final_position_seconds: f64,
    ) -> Result<()> {
        let delay = *self.end_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.ended
            .lock()
            .unwrap()
            .push((session_id.to_string(), reason, final_position_seconds));
        Ok(())
    }
}

// ============================================================================
// Sequence provider
// ============================================================================

#[derive(Default)]
pub struct StaticSequences {
    sequences: HashMap<String, Vec<SequencedMediaItem>>,
    delay: Duration,
}

impl StaticSequences {
    pub fn with(token: &str, items: Vec<SequencedMediaItem>) -> Self {
        let mut sequences = HashMap::new();
        sequences.insert(token.to_string(), items);
        Self {
            sequences,
            delay: Duration::ZERO,
        }
    }

    /// Answer every fetch after `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl SequenceProvider for StaticSequences {
    async fn fetch(&self, token: &str) -> Result<Vec<SequencedMediaItem>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.sequences
            .get(token)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("sequence {}", token)))
    }
}

// ============================================================================
// Sessions
// ============================================================================

pub fn granted_gate() -> PermissionGate {
    let mut gate = PermissionGate::new();
    gate.request(&PermissionRequest {
        origin: RequestOrigin::UserGesture,
        secure_context: true,
        sensors_available: true,
        requires_consent: true,
        granted: true,
    });
    gate
}

pub fn session_context(
    authority: Arc<MockAuthority>,
    player: MockPlayer,
    bus: EventBus,
    permission: PermissionGate,
) -> SessionContext {
    let clock: SharedClock = Arc::new(ManualClock::new(0));
    SessionContext {
        clock,
        bus,
        authority,
        player: Box::new(player),
        permission,
        settings: SessionSettings::default(),
    }
}

/// Yield until the session snapshot satisfies `check`
pub async fn wait_for_snapshot<F>(handle: &SessionHandle, check: F) -> SessionSnapshot
where
    F: Fn(&SessionSnapshot) -> bool,
{
    for _ in 0..200 {
        let snapshot = handle.snapshot();
        if check(&snapshot) {
            return snapshot;
        }
        tokio::task::yield_now().await;
    }
    panic!("snapshot never matched: {:?}", handle.snapshot());
}

/// Receive events until one satisfies `check`
pub async fn wait_for_event<F>(rx: &mut broadcast::Receiver<MgvpEvent>, check: F) -> MgvpEvent
where
    F: Fn(&MgvpEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event bus closed");
        if check(&event) {
            return event;
        }
    }
}

/// Let detached tasks (final report flush) run
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// HTTP
// ============================================================================

pub fn test_state(
    authority: Arc<MockAuthority>,
    sequences: StaticSequences,
) -> Arc<SharedState> {
    let clock: SharedClock = Arc::new(ManualClock::new(0));
    Arc::new(SharedState::new(
        ServiceConfig::default(),
        clock,
        authority,
        Arc::new(sequences),
    ))
}
