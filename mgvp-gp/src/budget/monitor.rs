//! Session budget monitor
//!
//! Opens a session with the budget authority, reports the playback position
//! on a fixed interval and relays the authority's answer. A missed heartbeat
//! is logged and retried on the next interval; only an explicit limit from
//! the authority halts playback.
//!
//! Teardown cancels the interval and flushes a final `end-session` report on
//! a separate task, so stopping never waits on the network. Callers that are
//! about to exit can await the returned handle.

use super::authority::BudgetAuthority;
use super::WatchBudget;
use crate::error::{Error, Result};
use mgvp_common::events::SessionEndReason;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Profile reported when opening a session
    pub profile_id: String,
    /// Spacing between heartbeats
    pub heartbeat_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            profile_id: "default".to_string(),
            heartbeat_interval: Duration::from_secs(60),
        }
    }
}

/// Outcome of one heartbeat
#[derive(Debug, Clone, PartialEq)]
pub enum BudgetReport {
    /// Authority answered; values are adopted verbatim
    Updated(WatchBudget),
    /// Authority unreachable; retried next interval
    Missed(String),
}

/// Send one heartbeat and fold the answer into a report
pub async fn heartbeat_once(
    authority: &dyn BudgetAuthority,
    session_id: &str,
    position_seconds: f64,
) -> BudgetReport {
    match authority.heartbeat(session_id, position_seconds).await {
        Ok(response) => BudgetReport::Updated(WatchBudget {
            remaining_seconds: response.remaining_seconds,
            limit_reached: response.limit_reached,
        }),
        Err(Error::BudgetExhausted) => BudgetReport::Updated(WatchBudget::exhausted()),
        Err(e) => BudgetReport::Missed(e.to_string()),
    }
}

pub struct SessionBudgetMonitor {
    authority: Arc<dyn BudgetAuthority>,
    config: MonitorConfig,
    session_id: Option<String>,
    budget: Option<WatchBudget>,
    position_tx: watch::Sender<f64>,
    cancel: CancellationToken,
    stopped: bool,
}

impl SessionBudgetMonitor {
    pub fn new(authority: Arc<dyn BudgetAuthority>, config: MonitorConfig) -> Self {
        let (position_tx, _) = watch::channel(0.0);
        Self {
            authority,
            config,
            session_id: None,
            budget: None,
            position_tx,
            cancel: CancellationToken::new(),
            stopped: false,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Last budget reported by the authority
    pub fn budget(&self) -> Option<WatchBudget> {
        self.budget
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Open a session with the authority
    ///
    /// An exhausted budget is not an error here: the returned budget has
    /// `limit_reached` set and no session is opened.
    pub async fn start(&mut self, item_id: &str) -> Result<WatchBudget> {
        if self.session_id.is_some() || self.stopped {
            return Err(Error::InvalidState("budget session already started".to_string()));
        }

        let budget = match self
            .authority
            .start_session(&self.config.profile_id, item_id)
            .await
        {
            Ok(response) => {
                info!(
                    "Budget session {} started ({:.0}s remaining)",
                    response.session_id, response.remaining_seconds
                );
                self.session_id = Some(response.session_id);
                WatchBudget {
                    remaining_seconds: response.remaining_seconds,
                    limit_reached: response.limit_reached,
                }
            }
            Err(Error::BudgetExhausted) => {
                info!("Watch budget already exhausted for {}", self.config.profile_id);
                WatchBudget::exhausted()
            }
            Err(e) => return Err(e),
        };

        self.budget = Some(budget);
        Ok(budget)
    }

    /// Position used by the next heartbeat and the final report
    pub fn report_position(&self, position_seconds: f64) {
        self.position_tx.send_replace(position_seconds);
    }

    /// Adopt a budget from a heartbeat report
    pub fn record(&mut self, report: &BudgetReport) -> Option<WatchBudget> {
        match report {
            BudgetReport::Updated(budget) => {
                debug!(
                    "Budget: {:.0}s remaining, limit_reached={}",
                    budget.remaining_seconds, budget.limit_reached
                );
                self.budget = Some(*budget);
            }
            BudgetReport::Missed(error) => {
                warn!("Heartbeat missed, retrying next interval: {}", error);
            }
        }
        self.budget
    }

    /// Send one heartbeat now
    ///
    /// Returns the authoritative budget, or the last known one when the
    /// authority could not be reached.
    pub async fn tick(&mut self, position_seconds: f64) -> Option<WatchBudget> {
        self.report_position(position_seconds);
        let session_id = match (&self.session_id, self.stopped) {
            (Some(id), false) => id.clone(),
            _ => return self.budget,
        };

        let report = heartbeat_once(self.authority.as_ref(), &session_id, position_seconds).await;
        self.record(&report)
    }

    /// Run heartbeats on the configured interval until stopped
    ///
    /// Reports go to `reports`; the first heartbeat fires one interval after
    /// the call. Returns `None` when no session is open.
    pub fn spawn_heartbeat(
        &self,
        reports: mpsc::UnboundedSender<BudgetReport>,
    ) -> Option<JoinHandle<()>> {
        let session_id = match (&self.session_id, self.stopped) {
            (Some(id), false) => id.clone(),
            _ => return None,
        };

        let authority = self.authority.clone();
        let cancel = self.cancel.clone();
        let position = self.position_tx.subscribe();
        let period = self.config.heartbeat_interval;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let position_seconds = *position.borrow();
                let report = tokio::select! {
                    _ = cancel.cancelled() => break,
                    report = heartbeat_once(authority.as_ref(), &session_id, position_seconds) => report,
                };

                if reports.send(report).is_err() {
                    break;
                }
            }

            debug!("Heartbeat loop for session {} stopped", session_id);
        }))
    }

    /// Cancel the heartbeat and flush the final report in the background
    ///
    /// Returns the flush task when a report was sent. Idempotent; later calls
    /// do nothing and return `None`.
    pub fn stop(&mut self, reason: SessionEndReason) -> Option<JoinHandle<()>> {
        if self.stopped {
            return None;
        }
        self.stopped = true;
        self.cancel.cancel();

        let session_id = self.session_id.take()?;
        let position_seconds = *self.position_tx.borrow();
        let authority = self.authority.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                info!("Ending budget session {} ({})", session_id, reason);
                Some(handle.spawn(async move {
                    match authority
                        .end_session(&session_id, reason, position_seconds)
                        .await
                    {
                        Ok(()) => debug!("Final report for session {} delivered", session_id),
                        Err(e) => warn!("Final report for session {} lost: {}", session_id, e),
                    }
                }))
            }
            Err(_) => {
                warn!(
                    "No runtime to flush final report for session {}",
                    session_id
                );
                None
            }
        }
    }
}

impl Drop for SessionBudgetMonitor {
    fn drop(&mut self) {
        let _ = self.stop(SessionEndReason::Teardown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mgvp_common::api::{HeartbeatResponse, StartSessionResponse};
    use std::sync::Mutex;

    /// Authority answering heartbeats from a fixed script
    struct ScriptedAuthority {
        start: Mutex<Option<Result<StartSessionResponse>>>,
        heartbeats: Mutex<Vec<Result<HeartbeatResponse>>>,
        ended: Mutex<Vec<(String, SessionEndReason, f64)>>,
    }

    impl ScriptedAuthority {
        fn new(heartbeats: Vec<Result<HeartbeatResponse>>) -> Arc<Self> {
            Arc::new(Self {
                start: Mutex::new(Some(Ok(StartSessionResponse {
                    session_id: "s1".to_string(),
                    remaining_seconds: 600.0,
                    limit_reached: false,
                }))),
                heartbeats: Mutex::new(heartbeats.into_iter().rev().collect()),
                ended: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl BudgetAuthority for ScriptedAuthority {
        async fn start_session(&self, _: &str, _: &str) -> Result<StartSessionResponse> {
            self.start
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(Error::Internal("started twice".to_string())))
        }

        async fn heartbeat(&self, _: &str, _: f64) -> Result<HeartbeatResponse> {
            self.heartbeats
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(Error::Network("script exhausted".to_string())))
        }

        async fn end_session(
            &self,
            session_id: &str,
            reason: SessionEndReason,
            final_position_seconds: f64,
        ) -> Result<()> {
            self.ended
                .lock()
                .unwrap()
                .push((session_id.to_string(), reason, final_position_seconds));
            Ok(())
        }
    }

    fn answer(remaining: f64, limit_reached: bool) -> Result<HeartbeatResponse> {
        Ok(HeartbeatResponse {
            elapsed_seconds: 60.0,
            remaining_seconds: remaining,
            limit_reached,
        })
    }

    #[tokio::test]
    async fn test_tick_adopts_authority_values() {
        let authority = ScriptedAuthority::new(vec![answer(123.0, false)]);
        let mut monitor = SessionBudgetMonitor::new(authority.clone(), MonitorConfig::default());

        let budget = monitor.start("a").await.unwrap();
        assert_eq!(budget.remaining_seconds, 600.0);
        assert_eq!(monitor.session_id(), Some("s1"));

        // Remaining time comes from the authority, not from local arithmetic
        let budget = monitor.tick(30.0).await.unwrap();
        assert_eq!(budget.remaining_seconds, 123.0);
        assert!(!budget.limit_reached);
    }

    #[tokio::test]
    async fn test_network_failure_keeps_last_budget() {
        let authority =
            ScriptedAuthority::new(vec![Err(Error::Network("connection refused".to_string()))]);
        let mut monitor = SessionBudgetMonitor::new(authority, MonitorConfig::default());
        monitor.start("a").await.unwrap();

        let budget = monitor.tick(10.0).await.unwrap();
        assert_eq!(budget.remaining_seconds, 600.0);
        assert!(!budget.limit_reached);
    }

    #[tokio::test]
    async fn test_exhausted_response_reports_limit() {
        let authority = ScriptedAuthority::new(vec![Err(Error::BudgetExhausted)]);
        let mut monitor = SessionBudgetMonitor::new(authority, MonitorConfig::default());
        monitor.start("a").await.unwrap();

        assert!(monitor.tick(10.0).await.unwrap().limit_reached);
    }

    #[tokio::test]
    async fn test_start_with_exhausted_budget() {
        let authority = ScriptedAuthority::new(vec![]);
        *authority.start.lock().unwrap() = Some(Err(Error::BudgetExhausted));
        let mut monitor = SessionBudgetMonitor::new(authority, MonitorConfig::default());

        let budget = monitor.start("a").await.unwrap();
        assert!(budget.limit_reached);
        assert!(monitor.session_id().is_none());
    }

    #[tokio::test]
    async fn test_stop_flushes_final_report_once() {
        let authority = ScriptedAuthority::new(vec![]);
        let mut monitor = SessionBudgetMonitor::new(authority.clone(), MonitorConfig::default());
        monitor.start("a").await.unwrap();
        monitor.report_position(42.5);

        assert!(monitor.stop(SessionEndReason::Exited).is_some());
        assert!(monitor.stop(SessionEndReason::Stopped).is_none());
        drop(monitor);

        // Let the detached flush run
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let ended = authority.ended.lock().unwrap().clone();
        assert_eq!(
            ended,
            vec![("s1".to_string(), SessionEndReason::Exited, 42.5)]
        );
    }

    #[tokio::test]
    async fn test_awaiting_stop_handle_delivers_report() {
        let authority = ScriptedAuthority::new(vec![]);
        let mut monitor = SessionBudgetMonitor::new(authority.clone(), MonitorConfig::default());
        monitor.start("a").await.unwrap();
        monitor.report_position(7.0);

        let flush = monitor.stop(SessionEndReason::Teardown).unwrap();
        flush.await.unwrap();

        let ended = authority.ended.lock().unwrap().clone();
        assert_eq!(
            ended,
            vec![("s1".to_string(), SessionEndReason::Teardown, 7.0)]
        );
    }

    #[tokio::test]
    async fn test_stop_without_session_has_nothing_to_flush() {
        let authority = ScriptedAuthority::new(vec![]);
        let mut monitor = SessionBudgetMonitor::new(authority.clone(), MonitorConfig::default());

        assert!(monitor.stop(SessionEndReason::Stopped).is_none());
        assert!(authority.ended.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_flushes_teardown_report() {
        let authority = ScriptedAuthority::new(vec![]);
        let mut monitor = SessionBudgetMonitor::new(authority.clone(), MonitorConfig::default());
        monitor.start("a").await.unwrap();
        drop(monitor);

        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let ended = authority.ended.lock().unwrap().clone();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].1, SessionEndReason::Teardown);
    }
}
