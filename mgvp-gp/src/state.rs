//! Shared service state
//!
//! Everything the HTTP handlers touch. At most one playback session runs at a
//! time; the permission gate outlives sessions so a consent answer given
//! before a scan applies to the session that follows.

use crate::budget::BudgetAuthority;
use crate::config::ServiceConfig;
use crate::gesture::{PermissionDecision, PermissionGate, PermissionRequest};
use crate::playback::SequenceProvider;
use crate::session::SessionHandle;
use chrono::Utc;
use mgvp_common::events::{EventBus, MgvpEvent};
use mgvp_common::time::SharedClock;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Event bus capacity for SSE subscribers
pub const EVENT_BUS_CAPACITY: usize = 512;

/// Shared state accessible by all handlers
pub struct SharedState {
    pub config: ServiceConfig,
    pub bus: EventBus,
    pub clock: SharedClock,
    pub authority: Arc<dyn BudgetAuthority>,
    pub sequences: Arc<dyn SequenceProvider>,

    /// Latest consent decision, applied to new and running sessions
    pub permission: RwLock<PermissionGate>,

    /// Current session (None before the first scan or after stop)
    pub session: Mutex<Option<SessionHandle>>,

    /// Held while a new session fetches its sequence and opens the budget
    /// session; `session` stays free for other handlers meanwhile
    pub starting: Mutex<()>,
}

impl SharedState {
    pub fn new(
        config: ServiceConfig,
        clock: SharedClock,
        authority: Arc<dyn BudgetAuthority>,
        sequences: Arc<dyn SequenceProvider>,
    ) -> Self {
        Self {
            config,
            bus: EventBus::new(EVENT_BUS_CAPACITY),
            clock,
            authority,
            sequences,
            permission: RwLock::new(PermissionGate::new()),
            session: Mutex::new(None),
            starting: Mutex::new(()),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<MgvpEvent> {
        self.bus.subscribe()
    }

    /// Run a consent request through the gate and announce the resulting mode
    pub async fn request_permission(
        &self,
        request: &PermissionRequest,
    ) -> (PermissionDecision, PermissionGate) {
        let mut gate = self.permission.write().await;
        let decision = gate.request(request);

        self.bus.emit_lossy(MgvpEvent::InputModeChanged {
            mode: decision.mode,
            reason: decision.reason.clone(),
            timestamp: Utc::now(),
        });

        (decision, gate.clone())
    }

    pub async fn permission_gate(&self) -> PermissionGate {
        self.permission.read().await.clone()
    }
}
