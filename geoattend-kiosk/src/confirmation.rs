//! Confirmation screen
//!
//! Shows the record handed over by the submission when there is one;
//! otherwise (a revisit or refresh) polls status for the remembered
//! registration identifier.

use crate::models::{ErrorCategory, SubmissionOutcome, SubmissionResult};
use crate::poller::{PollOutcome, PollState, StatusPoller};
use crate::submission::{result_slot, HandedOverResult};
use crate::wizard::REGISTRATION_ID;
use geoattend_common::store::{KeyValueStore, TransferSlot};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationView {
    Registered {
        name: Option<String>,
        registration_id: String,
        timestamp: Option<String>,
        already_registered: bool,
    },
    Failed {
        message: String,
        category: Option<ErrorCategory>,
    },
    /// Budget exhausted while the backend was still processing
    StillProcessing,
    Error(String),
    /// Nothing handed over and no remembered registration
    NoRegistration,
}

impl ConfirmationView {
    fn from_result(result: SubmissionResult) -> Self {
        match result.outcome {
            SubmissionOutcome::Success | SubmissionOutcome::AlreadyRegistered => {
                ConfirmationView::Registered {
                    name: result.attendee_name,
                    registration_id: result.registration_id.unwrap_or_default(),
                    timestamp: None,
                    already_registered: result.outcome == SubmissionOutcome::AlreadyRegistered,
                }
            }
            SubmissionOutcome::Failed => ConfirmationView::Failed {
                message: result.message,
                category: result.error_category,
            },
        }
    }

    fn from_poll_state(state: PollState) -> Self {
        match state {
            PollState::Registered(attendee) => ConfirmationView::Registered {
                name: Some(attendee.name).filter(|n| !n.is_empty()),
                registration_id: attendee.registration_id,
                timestamp: attendee.timestamp,
                already_registered: false,
            },
            PollState::Error(e) => ConfirmationView::Error(e.to_string()),
            PollState::StillProcessing { .. } | PollState::Pending { .. } | PollState::Loading => {
                ConfirmationView::StillProcessing
            }
        }
    }
}

impl fmt::Display for ConfirmationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationView::Registered {
                name,
                registration_id,
                timestamp,
                already_registered,
            } => {
                if *already_registered {
                    writeln!(f, "Attendance was already registered")?;
                } else {
                    writeln!(f, "Attendance registered")?;
                }
                if let Some(name) = name {
                    writeln!(f, "  Name:         {}", name)?;
                }
                write!(f, "  Registration: {}", registration_id)?;
                if let Some(timestamp) = timestamp {
                    write!(f, "\n  Recorded at:  {}", timestamp)?;
                }
                Ok(())
            }
            ConfirmationView::Failed { message, category } => match category {
                Some(category) => write!(f, "Registration failed ({}): {}", category, message),
                None => write!(f, "Registration failed: {}", message),
            },
            ConfirmationView::StillProcessing => {
                write!(f, "Your attendance is still being processed, check back later")
            }
            ConfirmationView::Error(message) => write!(f, "Could not confirm attendance: {}", message),
            ConfirmationView::NoRegistration => {
                write!(f, "No registration found on this device, please register first")
            }
        }
    }
}

pub struct ConfirmationScreen {
    store: Arc<dyn KeyValueStore>,
    slot: TransferSlot<HandedOverResult>,
    poller: StatusPoller,
}

impl ConfirmationScreen {
    pub fn new(store: Arc<dyn KeyValueStore>, poller: StatusPoller, result_ttl: Duration) -> Self {
        Self {
            store,
            slot: result_slot(result_ttl),
            poller,
        }
    }

    pub fn poller(&self) -> &StatusPoller {
        &self.poller
    }

    /// Resolve what to show for `event_id`
    ///
    /// A handed-over record for another event is consumed but not shown.
    /// Returns `None` when cancelled while polling.
    pub async fn load(
        &mut self,
        event_id: &str,
        cancel: &CancellationToken,
    ) -> geoattend_common::Result<Option<ConfirmationView>> {
        if let Some(HandedOverResult {
            event_id: submitted_for,
            result,
        }) = self.slot.take(self.store.as_ref())?
        {
            if submitted_for == event_id {
                info!(outcome = ?result.outcome, "Showing handed-over submission result");
                return Ok(Some(ConfirmationView::from_result(result)));
            }
            debug!(
                event_id,
                submitted_for = %submitted_for,
                "Ignoring submission result for another event"
            );
        }

        let Some(reg_no) = REGISTRATION_ID.load(self.store.as_ref())? else {
            debug!("No handed-over result and no remembered registration");
            return Ok(Some(ConfirmationView::NoRegistration));
        };

        match self.poller.run(event_id, &reg_no, cancel).await {
            PollOutcome::Finished(state) => Ok(Some(ConfirmationView::from_poll_state(state))),
            PollOutcome::Cancelled => Ok(None),
        }
    }
}
