//! Attendance status poller
//!
//! Loading → {Registered | Pending | Error}; Pending repeats on a fixed
//! interval until the attempt budget runs out, which ends in
//! StillProcessing rather than Error.
//!
//! Each query is awaited before the next tick, so at most one is in flight.
//! Ticks missed while a slow query runs are skipped, not queued.

use crate::backend::AttendanceBackend;
use crate::models::{AttendanceState, AttendanceStatus, AttendeeInfo};
use geoattend_common::api::{ApiError, AttendanceStatusResponse, RawReply};
use geoattend_common::config::PollConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why polling stopped in the Error state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollError {
    #[error("{0}")]
    NotFound(String),

    /// Backend reported verification failure
    #[error("{0}")]
    Rejected(String),

    #[error("Status check failed ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Could not reach the attendance service: {0}")]
    Network(String),

    #[error("unexpected status")]
    UnexpectedStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// No answer yet
    Loading,
    /// Backend still processing; `attempts` queries made so far
    Pending { attempts: u32 },
    Registered(AttendeeInfo),
    Error(PollError),
    /// Budget exhausted while pending
    StillProcessing { attempts: u32 },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::Registered(_) | PollState::Error(_) | PollState::StillProcessing { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_attempts: 10,
        }
    }
}

impl From<&PollConfig> for PollPolicy {
    fn from(config: &PollConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// How a poll run ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Finished(PollState),
    Cancelled,
}

/// Interpret one status query
pub fn interpret_status(reply: Result<RawReply, ApiError>, reg_no: &str, attempts: u32) -> PollState {
    let reply = match reply {
        Ok(reply) => reply,
        Err(ApiError::Status { status: 404, message }) => {
            return PollState::Error(PollError::NotFound(message));
        }
        Err(ApiError::Status { status, message }) => {
            return PollState::Error(PollError::Http { status, message });
        }
        Err(e) => return PollState::Error(PollError::Network(e.to_string())),
    };

    if reply.status == 404 {
        return PollState::Error(PollError::NotFound(
            reply
                .message()
                .unwrap_or_else(|| "No attendance record found for this registration".to_string()),
        ));
    }
    if !reply.is_success() {
        return PollState::Error(PollError::Http {
            status: reply.status,
            message: reply.message().unwrap_or_else(|| "Unexpected response".to_string()),
        });
    }

    let response: AttendanceStatusResponse = match serde_json::from_str(&reply.body) {
        Ok(response) => response,
        Err(e) => {
            debug!("Unreadable status body: {}", e);
            return PollState::Error(PollError::UnexpectedStatus);
        }
    };

    match AttendanceStatus::from_response(&response, reg_no) {
        Some(AttendanceStatus {
            state: AttendanceState::Registered,
            attendee,
            ..
        }) => PollState::Registered(
            attendee.unwrap_or_else(|| AttendeeInfo::from_data(None, reg_no)),
        ),
        Some(AttendanceStatus {
            state: AttendanceState::Pending,
            ..
        }) => PollState::Pending { attempts },
        Some(AttendanceStatus {
            state: AttendanceState::Error,
            message,
            ..
        }) => PollState::Error(PollError::Rejected(
            message.unwrap_or_else(|| "Attendance could not be verified".to_string()),
        )),
        None => PollState::Error(PollError::UnexpectedStatus),
    }
}

pub struct StatusPoller {
    backend: Arc<dyn AttendanceBackend>,
    policy: PollPolicy,
    state_tx: watch::Sender<PollState>,
}

impl StatusPoller {
    pub fn new(backend: Arc<dyn AttendanceBackend>, policy: PollPolicy) -> Self {
        let (state_tx, _) = watch::channel(PollState::Loading);
        Self {
            backend,
            policy,
            state_tx,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Receiver for every published state, starting from the current one
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PollState {
        self.state_tx.borrow().clone()
    }

    /// Poll until a terminal state, budget exhaustion, or cancellation
    ///
    /// The first query runs immediately. A reply that arrives after
    /// cancellation is dropped without publishing.
    pub async fn run(&mut self, event_id: &str, reg_no: &str, cancel: &CancellationToken) -> PollOutcome {
        self.publish(PollState::Loading);
        info!(event_id, reg_no, max_attempts = self.policy.max_attempts, "Polling attendance status");

        let mut ticker = tokio::time::interval(self.policy.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut attempts = 0u32;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(attempts),
                _ = ticker.tick() => {}
            }

            attempts += 1;
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(attempts),
                reply = self.backend.attendance_status(event_id, reg_no) => reply,
            };

            let mut state = interpret_status(reply, reg_no, attempts);
            if matches!(state, PollState::Pending { .. }) && attempts >= self.policy.max_attempts {
                info!(attempts, "Status still pending, poll budget exhausted");
                state = PollState::StillProcessing { attempts };
            }

            match &state {
                PollState::Error(e) => warn!(attempts, "Status polling stopped: {}", e),
                PollState::Registered(attendee) => {
                    info!(attempts, reg_no = %attendee.registration_id, "Attendance registered")
                }
                _ => debug!(attempts, ?state, "Status poll"),
            }

            self.publish(state.clone());
            if state.is_terminal() {
                return PollOutcome::Finished(state);
            }
        }
    }

    fn cancelled(&self, attempts: u32) -> PollOutcome {
        debug!(attempts, "Status polling cancelled");
        PollOutcome::Cancelled
    }

    fn publish(&self, state: PollState) {
        self.state_tx.send_replace(state);
    }
}
