use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::core::api::{ApiResult, Backends, HttpApi};
use crate::core::session::{run_job, Job};

use super::events::AppEvent;

/// Centralized handle to the backend APIs.
///
/// Created once at startup; views and the app run network jobs through it.
/// Results come back on the event channel as [`AppEvent::Completed`].
pub struct Services {
    pub backends: Backends,
    /// Cover image host, for rendering cover references.
    pub covers_url: String,
    pub event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl Services {
    /// Build the HTTP clients from config.
    ///
    /// Fails only on a malformed base URL; the server is not contacted here.
    pub fn init(config: &AppConfig, event_tx: mpsc::UnboundedSender<AppEvent>) -> ApiResult<Self> {
        log::info!(
            "Using collection API at {} and catalog at {}",
            config.api.base_url,
            config.api.catalog_url
        );
        let api = HttpApi::new(&config.api.base_url, &config.api.catalog_url)?;
        Ok(Self::new(
            Backends::http(api),
            config.api.covers_url.clone(),
            event_tx,
        ))
    }

    pub fn new(
        backends: Backends,
        covers_url: String,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            backends,
            covers_url,
            event_tx,
        }
    }

    /// Run a network job on a tokio task; its completion is sent back as an event.
    pub fn spawn(&self, job: Job) {
        let backends = self.backends.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            if let Some(completion) = run_job(job, &backends).await {
                let _ = tx.send(AppEvent::Completed(completion));
            }
        });
    }
}
