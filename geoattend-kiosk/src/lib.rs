//! geoattend-kiosk library interface
//!
//! Attendee-side registration: device capture, the registration wizard,
//! submission, and the confirmation screen with status polling.

pub mod backend;
pub mod capture;
pub mod confirmation;
pub mod error;
pub mod flow;
pub mod models;
pub mod poller;
pub mod submission;
pub mod wizard;

pub use crate::error::{KioskError, KioskResult};

use crate::backend::AttendanceBackend;
use crate::capture::{CameraDevice, PositionOptions, PositionSource};
use crate::confirmation::ConfirmationScreen;
use crate::flow::RegistrationFlow;
use crate::poller::{PollPolicy, StatusPoller};
use crate::submission::SubmissionClient;
use crate::wizard::RegistrationWizard;
use geoattend_common::api::ApiClient;
use geoattend_common::config::TomlConfig;
use geoattend_common::store::{FileStore, KeyValueStore};
use std::sync::Arc;
use tracing::info;

/// Shared kiosk state: configuration, backend and the client-side store
#[derive(Clone)]
pub struct Kiosk {
    pub config: TomlConfig,
    pub api: Arc<ApiClient>,
    pub backend: Arc<dyn AttendanceBackend>,
    pub store: Arc<dyn KeyValueStore>,
}

impl Kiosk {
    /// Connect to the configured backend and open the file store
    pub fn open(config: TomlConfig) -> KioskResult<Self> {
        let api = Arc::new(ApiClient::new(&config.api)?);
        let store = FileStore::open(config.storage.resolved_dir())?;
        info!(
            api = %api.base_url(),
            store = %store.dir().display(),
            "Kiosk initialized"
        );
        let backend: Arc<dyn AttendanceBackend> = api.clone();
        Ok(Self {
            config,
            api,
            backend,
            store: Arc::new(store),
        })
    }

    /// Same as [`Kiosk::open`] but with a caller-supplied backend and store
    pub fn with_parts(
        config: TomlConfig,
        backend: Arc<dyn AttendanceBackend>,
        store: Arc<dyn KeyValueStore>,
    ) -> KioskResult<Self> {
        let api = Arc::new(ApiClient::new(&config.api)?);
        Ok(Self {
            config,
            api,
            backend,
            store,
        })
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions::from(&self.config.geolocation)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from(&self.config.poll)
    }

    pub fn wizard<C: CameraDevice, P: PositionSource>(&self, camera: C, position_source: P) -> RegistrationWizard<C, P> {
        RegistrationWizard::new(camera, position_source, self.position_options(), Arc::clone(&self.store))
    }

    pub fn submission_client(&self) -> SubmissionClient {
        SubmissionClient::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.store),
            self.config.storage.result_ttl(),
        )
    }

    pub fn registration_flow<C: CameraDevice, P: PositionSource>(
        &self,
        event_id: impl Into<String>,
        camera: C,
        position_source: P,
    ) -> RegistrationFlow<C, P> {
        RegistrationFlow::new(event_id, self.wizard(camera, position_source), self.submission_client())
    }

    pub fn status_poller(&self) -> StatusPoller {
        StatusPoller::new(Arc::clone(&self.backend), self.poll_policy())
    }

    pub fn confirmation_screen(&self) -> ConfirmationScreen {
        ConfirmationScreen::new(
            Arc::clone(&self.store),
            self.status_poller(),
            self.config.storage.result_ttl(),
        )
    }
}
