//! Periodic refetch of the three source snapshots.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use crate::config::SourcesSettings;
use crate::data_files::DataDir;
use crate::pipeline::{refresh_sources, SourceClients};
use std::time::Duration;
use tracing::info;

/// Fetches Last.fm, Spotify and MusicBrainz into snapshot files, then asks
/// for a graph rebuild.
///
/// Only registered when source credentials are configured.
pub struct SourceRefreshJob {
    clients: SourceClients,
    settings: SourcesSettings,
    data_dir: DataDir,
    interval: Duration,
}

impl SourceRefreshJob {
    pub fn new(
        settings: SourcesSettings,
        data_dir: DataDir,
        interval: Duration,
    ) -> Result<Self, String> {
        let clients = SourceClients::from_settings(&settings)
            .map_err(|e| format!("Failed to create source clients: {:#}", e))?;
        Ok(Self {
            clients,
            settings,
            data_dir,
            interval,
        })
    }
}

impl BackgroundJob for SourceRefreshJob {
    fn id(&self) -> &'static str {
        "source_refresh"
    }

    fn name(&self) -> &'static str {
        "Source Refresh"
    }

    fn description(&self) -> &'static str {
        "Fetch artist data from Last.fm, Spotify and MusicBrainz"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(self.interval)
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let report = ctx.runtime.block_on(refresh_sources(
            &self.clients,
            &self.settings,
            &self.data_dir,
            &ctx.cancellation_token,
            None,
        ))?;
        info!(
            "Refreshed sources for {} chart artists: {} Last.fm, {} Spotify, {} MusicBrainz",
            report.chart_artists,
            report.listening_history.found,
            report.catalog.found,
            report.registry.found
        );
        ctx.fire_hook(HookEvent::OnSourcesRefreshed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn configured() -> SourcesSettings {
        SourcesSettings {
            lastfm_api_key: Some("key".to_string()),
            spotify_client_id: Some("id".to_string()),
            spotify_client_secret: Some("secret".to_string()),
            ..SourcesSettings::default()
        }
    }

    #[test]
    fn test_requires_credentials() {
        let dir = TempDir::new().unwrap();
        let result = SourceRefreshJob::new(
            SourcesSettings::default(),
            DataDir::new(dir.path()),
            Duration::from_secs(3600),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_interval_schedule() {
        let dir = TempDir::new().unwrap();
        let job = SourceRefreshJob::new(
            configured(),
            DataDir::new(dir.path()),
            Duration::from_secs(168 * 3600),
        )
        .unwrap();
        assert_eq!(job.id(), "source_refresh");
        assert_eq!(job.schedule().interval(), Some(Duration::from_secs(168 * 3600)));
        assert!(!job.schedule().listens_to(HookEvent::OnStartup));
    }
}
