//! Playback session runner
//!
//! One session owns one playback controller, one budget monitor and (while an
//! item is loaded) one gesture engine. All of them are driven from a single
//! task: platform input, classifier signals and heartbeat reports are handled
//! one at a time in arrival order, and nothing on that task blocks. The
//! heartbeat loop and the final report flush are the only other tasks.
//!
//! When the session finishes, the engine, the heartbeat and the input channel
//! are released together.

use crate::budget::{
    BudgetAuthority, BudgetReport, MonitorConfig, SessionBudgetMonitor, WatchBudget,
};
use crate::error::{Error, Result};
use crate::gesture::{
    GestureConfig, GestureEngine, GestureSignal, PermissionGate, RawSensorEvent, SourceState,
};
use crate::playback::{
    ControlAction, ControllerConfig, MediaPlayer, PlaybackController, PlayerEvent, Sequence,
    SessionOutcome,
};
use chrono::Utc;
use mgvp_common::api::SequencedMediaItem;
use mgvp_common::events::{EventBus, InputMode, MgvpEvent, PlaybackState};
use mgvp_common::time::SharedClock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

/// Queued input per session; sensor events beyond this are dropped
const COMMAND_CAPACITY: usize = 256;

/// Input delivered to a running session
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Sensor(RawSensorEvent),
    Player(PlayerEvent),
    Control(ControlAction),
    /// Permission gate changed; reapply it to the live engine
    Permission(PermissionGate),
    Stop,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Local identifier, also attached to every log line of the session
    pub run_id: Uuid,
    /// Budget authority session (absent when the budget was exhausted at start)
    pub session_id: Option<String>,
    pub state: PlaybackState,
    pub item_id: Option<String>,
    pub index: usize,
    pub item_count: usize,
    pub position_seconds: f64,
    pub input_mode: InputMode,
    pub budget: Option<WatchBudget>,
    pub outcome: Option<SessionOutcome>,
}

/// Tuning for every component of a session
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub controller: ControllerConfig,
    pub gestures: GestureConfig,
    pub monitor: MonitorConfig,
}

/// Collaborators a session needs
pub struct SessionContext {
    pub clock: SharedClock,
    pub bus: EventBus,
    pub authority: Arc<dyn BudgetAuthority>,
    pub player: Box<dyn MediaPlayer>,
    pub permission: PermissionGate,
    pub settings: SessionSettings,
}

/// What the runner leaves behind
struct SessionExit {
    outcome: SessionOutcome,
    /// Final budget report still in flight
    final_report: Option<JoinHandle<()>>,
}

/// Handle to a running session
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<SessionExit>,
}

impl SessionHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Queue a command, waiting for room
    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::InvalidState("session has ended".to_string()))
    }

    /// Queue a sensor event without waiting; dropped when the queue is full
    pub fn send_sensor(&self, event: RawSensorEvent) -> Result<bool> {
        match self.commands.try_send(SessionCommand::Sensor(event)) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!("Session input queue full; dropping sensor event");
                Ok(false)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(Error::InvalidState("session has ended".to_string()))
            }
        }
    }

    /// Stop the session and wait for teardown
    ///
    /// The final budget report keeps flushing in the background.
    pub async fn stop(self) -> Result<SessionOutcome> {
        // Already finished sessions have closed their input
        let _ = self.commands.send(SessionCommand::Stop).await;
        self.wait().await
    }

    /// Stop the session and give the final budget report up to `grace` to land
    ///
    /// For process exit, where a background flush would be cancelled.
    pub async fn shutdown(self, grace: Duration) -> Result<SessionOutcome> {
        let _ = self.commands.send(SessionCommand::Stop).await;
        let exit = self.finish().await?;

        if let Some(report) = exit.final_report {
            match tokio::time::timeout(grace, report).await {
                Ok(Ok(())) => debug!("Final budget report flushed"),
                Ok(Err(e)) => warn!("Final budget report task failed: {}", e),
                Err(_) => warn!("Final budget report not delivered within {:?}", grace),
            }
        }
        Ok(exit.outcome)
    }

    /// Wait for the session to finish on its own
    pub async fn wait(self) -> Result<SessionOutcome> {
        Ok(self.finish().await?.outcome)
    }

    async fn finish(self) -> Result<SessionExit> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("session task failed: {}", e)))
    }
}

/// Validate the sequence, open the budget session and start the runner
///
/// An empty or malformed sequence emits the friendly empty-sequence signal
/// and fails without contacting the budget authority or the player.
pub async fn start_session(
    items: Vec<SequencedMediaItem>,
    ctx: SessionContext,
) -> Result<SessionHandle> {
    let SessionContext {
        clock,
        bus,
        authority,
        player,
        permission,
        settings,
    } = ctx;

    let mut controller = PlaybackController::new(settings.controller.clone(), player, bus.clone());
    let first_item = match Sequence::new(items.clone()) {
        Ok(sequence) => sequence.items()[0].id.clone(),
        Err(e) => {
            // Moves the controller to error and emits the friendly signal
            let _ = controller.load_sequence(items);
            return Err(e);
        }
    };

    let mut monitor = SessionBudgetMonitor::new(authority, settings.monitor.clone());
    let budget = monitor.start(&first_item).await?;

    let input_mode = permission.input_mode();
    bus.emit_lossy(MgvpEvent::SessionStarted {
        session_id: monitor.session_id().map(str::to_string),
        item_count: items.len(),
        input_mode,
        timestamp: Utc::now(),
    });

    // An exhausted budget ends the session before anything is loaded
    controller.on_budget(&budget);
    controller.load_sequence(items)?;

    let (budget_tx, budget_rx) = mpsc::unbounded_channel();
    let heartbeat = monitor.spawn_heartbeat(budget_tx);
    let (gestures_tx, gestures_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);

    let run_id = Uuid::new_v4();
    let (snapshot_tx, snapshot_rx) = watch::channel(build_snapshot(
        run_id,
        &controller,
        &monitor,
        None,
        &permission,
        None,
    ));

    let runner = SessionRunner {
        run_id,
        controller,
        monitor,
        engine: None,
        permission,
        clock,
        bus,
        gesture_config: settings.gestures,
        gestures_tx,
        gestures_rx,
        budget_rx,
        commands: commands_rx,
        heartbeat,
        snapshot_tx,
    };
    let task = tokio::spawn(runner.run().instrument(info_span!("session", %run_id)));

    Ok(SessionHandle {
        commands: commands_tx,
        snapshot: snapshot_rx,
        task,
    })
}

struct SessionRunner {
    run_id: Uuid,
    controller: PlaybackController,
    monitor: SessionBudgetMonitor,
    engine: Option<GestureEngine>,
    permission: PermissionGate,
    clock: SharedClock,
    bus: EventBus,
    gesture_config: GestureConfig,
    gestures_tx: mpsc::UnboundedSender<GestureSignal>,
    gestures_rx: mpsc::UnboundedReceiver<GestureSignal>,
    budget_rx: mpsc::UnboundedReceiver<BudgetReport>,
    commands: mpsc::Receiver<SessionCommand>,
    heartbeat: Option<JoinHandle<()>>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionRunner {
    async fn run(mut self) -> SessionExit {
        info!(
            "Session running ({} items, {} mode)",
            self.controller.item_count(),
            self.permission.input_mode()
        );
        self.sync_engine();
        self.publish(None);

        let outcome = loop {
            if let Some(outcome) = self.controller.outcome() {
                break outcome;
            }

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Stop) | None => break SessionOutcome::Stopped,
                    Some(command) => self.handle_command(command),
                },
                Some(signal) = self.gestures_rx.recv() => self.handle_signal(signal),
                Some(report) = self.budget_rx.recv() => self.handle_budget(report),
            }

            self.sync_engine();
            self.monitor
                .report_position(self.controller.position_seconds());
            self.publish(None);
        };

        let final_report = self.teardown(outcome);
        SessionExit {
            outcome,
            final_report,
        }
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Sensor(event) => match self.engine.as_mut() {
                Some(engine) => {
                    engine.ingest(event);
                }
                None => trace!("No gesture engine; sensor event dropped"),
            },
            SessionCommand::Player(event) => self.controller.handle_player_event(&event),
            SessionCommand::Control(action) => self.controller.handle_control(action),
            SessionCommand::Permission(gate) => {
                self.permission = gate;
                if let Some(engine) = self.engine.as_mut() {
                    engine.apply_permission(&self.permission);
                }
            }
            SessionCommand::Stop => {}
        }
    }

    fn handle_signal(&mut self, signal: GestureSignal) {
        match &signal {
            GestureSignal::Shake(shake) => self.bus.emit_lossy(MgvpEvent::ShakeDetected {
                direction: shake.direction,
                confidence: shake.confidence,
                timestamp: Utc::now(),
            }),
            GestureSignal::Swipe(swipe) => self.bus.emit_lossy(MgvpEvent::SwipeDetected {
                direction: swipe.direction,
                distance_px: swipe.distance,
                duration_ms: swipe.duration_ms,
                timestamp: Utc::now(),
            }),
            GestureSignal::Tilt(_) => {}
        }
        self.controller.handle_signal(&signal);
    }

    fn handle_budget(&mut self, report: BudgetReport) {
        let budget = self.monitor.record(&report);
        match report {
            BudgetReport::Updated(update) => {
                self.bus.emit_lossy(MgvpEvent::BudgetUpdated {
                    remaining_seconds: update.remaining_seconds,
                    limit_reached: update.limit_reached,
                    timestamp: Utc::now(),
                });
                if let Some(budget) = budget {
                    self.controller.on_budget(&budget);
                }
            }
            BudgetReport::Missed(error) => {
                self.bus.emit_lossy(MgvpEvent::HeartbeatMissed {
                    error,
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Keep exactly one engine alive while the controller is in the playing family
    fn sync_engine(&mut self) {
        let active = self.controller.state().is_playing_family();
        match (self.engine.is_some(), active) {
            (false, true) => {
                let mut engine = GestureEngine::new(
                    self.gesture_config.clone(),
                    self.clock.clone(),
                    self.gestures_tx.clone(),
                );
                engine.apply_permission(&self.permission);
                self.engine = Some(engine);
            }
            (true, false) => self.release_engine(),
            _ => {}
        }
    }

    fn release_engine(&mut self) {
        if self.engine.take().is_some() {
            // Signals classified before release must not reach the controller
            let mut discarded = 0;
            while self.gestures_rx.try_recv().is_ok() {
                discarded += 1;
            }
            if discarded > 0 {
                debug!("Discarded {} gesture signals on release", discarded);
            }
        }
    }

    fn teardown(&mut self, outcome: SessionOutcome) -> Option<JoinHandle<()>> {
        info!("Session finished: {:?}", outcome);

        self.controller.shutdown();
        self.release_engine();

        let position = self.controller.position_seconds();
        self.monitor.report_position(position);
        let final_report = self.monitor.stop(outcome.end_reason());
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        self.commands.close();

        self.bus.emit_lossy(MgvpEvent::SessionEnded {
            reason: outcome.end_reason(),
            final_position_seconds: position,
            timestamp: Utc::now(),
        });
        self.publish(Some(outcome));
        final_report
    }

    fn publish(&self, outcome: Option<SessionOutcome>) {
        self.snapshot_tx.send_replace(build_snapshot(
            self.run_id,
            &self.controller,
            &self.monitor,
            self.engine.as_ref(),
            &self.permission,
            outcome,
        ));
    }
}

fn build_snapshot(
    run_id: Uuid,
    controller: &PlaybackController,
    monitor: &SessionBudgetMonitor,
    engine: Option<&GestureEngine>,
    permission: &PermissionGate,
    outcome: Option<SessionOutcome>,
) -> SessionSnapshot {
    // A live engine knows whether its adapter actually came up
    let input_mode = match engine.map(GestureEngine::source_state) {
        Some(SourceState::Active) => InputMode::Gestures,
        Some(_) => InputMode::Buttons,
        None => permission.input_mode(),
    };

    SessionSnapshot {
        run_id,
        session_id: monitor.session_id().map(str::to_string),
        state: controller.state(),
        item_id: controller.current_item().map(|item| item.id.clone()),
        index: controller.index(),
        item_count: controller.item_count(),
        position_seconds: controller.position_seconds(),
        input_mode,
        budget: monitor.budget(),
        outcome: outcome.or_else(|| controller.outcome()),
    }
}
