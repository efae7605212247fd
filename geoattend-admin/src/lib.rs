//! geoattend-admin library interface
//!
//! Administrator dashboard: event creation and listing, attendance report
//! download, and review of failed attendance attempts.

pub mod attendance;
pub mod error;
pub mod events;

pub use crate::error::{AdminError, AdminResult};

use geoattend_common::api::ApiClient;
use geoattend_common::config::TomlConfig;
use tracing::info;

/// Dashboard operations over the attendance API
#[derive(Debug, Clone)]
pub struct Dashboard {
    api: ApiClient,
}

impl Dashboard {
    pub fn new(config: &TomlConfig) -> AdminResult<Self> {
        let api = ApiClient::new(&config.api)?;
        info!(api = %api.base_url(), "Dashboard initialized");
        Ok(Self { api })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}
