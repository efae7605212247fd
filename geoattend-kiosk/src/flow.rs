//! Wizard plus submission
//!
//! Routes each submission result to where the attendee goes next.

use crate::capture::{CameraDevice, PositionSource};
use crate::models::{ErrorCategory, SubmissionResult};
use crate::submission::{SubmissionClient, SubmissionError};
use crate::wizard::{RegistrationWizard, StepResult};
use tracing::info;

/// Where the attendee goes after a submission
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// Registered or already registered; show the confirmation screen
    Confirmed(SubmissionResult),
    /// Verification rejected; the wizard is back on Capture
    RetakePhoto(SubmissionResult),
    /// Event or registration unknown; go back to the event list
    ReturnToEventList(SubmissionResult),
    /// Stay on the submit step with the message shown inline
    Failed(SubmissionResult),
}

impl FlowOutcome {
    pub fn result(&self) -> &SubmissionResult {
        match self {
            FlowOutcome::Confirmed(r)
            | FlowOutcome::RetakePhoto(r)
            | FlowOutcome::ReturnToEventList(r)
            | FlowOutcome::Failed(r) => r,
        }
    }
}

pub struct RegistrationFlow<C, P> {
    event_id: String,
    wizard: RegistrationWizard<C, P>,
    client: SubmissionClient,
}

impl<C: CameraDevice, P: PositionSource> RegistrationFlow<C, P> {
    pub fn new(event_id: impl Into<String>, wizard: RegistrationWizard<C, P>, client: SubmissionClient) -> Self {
        Self {
            event_id: event_id.into(),
            wizard,
            client,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn wizard(&self) -> &RegistrationWizard<C, P> {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut RegistrationWizard<C, P> {
        &mut self.wizard
    }

    /// Submit the wizard's draft and move the wizard accordingly
    ///
    /// Client-side errors are also shown inline on the wizard.
    pub async fn submit(&mut self) -> Result<FlowOutcome, SubmissionError> {
        let result = match self.client.submit(&self.event_id, self.wizard.draft()).await {
            Ok(result) => result,
            Err(e) => {
                self.wizard.set_message(e.to_string());
                return Err(e);
            }
        };

        let outcome = if result.is_registered() {
            self.wizard.teardown();
            FlowOutcome::Confirmed(result)
        } else {
            match result.error_category {
                Some(ErrorCategory::VerificationFailed) => {
                    let message = match self.wizard.return_to_capture().await {
                        StepResult::Moved { .. } => match self.wizard.message() {
                            Some(camera) => format!("{} {}", result.message, camera),
                            None => result.message.clone(),
                        },
                        _ => result.message.clone(),
                    };
                    self.wizard.set_message(message);
                    FlowOutcome::RetakePhoto(result)
                }
                Some(ErrorCategory::NotFound) => {
                    self.wizard.teardown();
                    FlowOutcome::ReturnToEventList(result)
                }
                _ => {
                    self.wizard.set_message(result.message.clone());
                    FlowOutcome::Failed(result)
                }
            }
        };

        info!(event_id = %self.event_id, step = %self.wizard.step(), "Submission routed");
        Ok(outcome)
    }

    /// Release devices when the attendee leaves the flow
    pub fn teardown(&mut self) {
        self.wizard.teardown();
    }
}
