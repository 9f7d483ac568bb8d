//! Periodic reconciliation and export of the graph.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use crate::config::PipelineSettings;
use crate::data_files::DataDir;
use crate::export::GraphExporter;
use crate::pipeline::rebuild_graph;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Rebuilds the graph from the current source snapshots.
///
/// Runs at startup (when enabled), after every source refresh and then on
/// its own interval.
pub struct GraphRebuildJob {
    data_dir: DataDir,
    settings: PipelineSettings,
    cache_ttl: Duration,
}

impl GraphRebuildJob {
    pub fn new(data_dir: DataDir, settings: PipelineSettings, cache_ttl: Duration) -> Self {
        Self {
            data_dir,
            settings,
            cache_ttl,
        }
    }
}

impl BackgroundJob for GraphRebuildJob {
    fn id(&self) -> &'static str {
        "graph_rebuild"
    }

    fn name(&self) -> &'static str {
        "Graph Rebuild"
    }

    fn description(&self) -> &'static str {
        "Reconcile source snapshots and publish the artist graph"
    }

    fn schedule(&self) -> JobSchedule {
        let mut hooks = vec![HookEvent::OnSourcesRefreshed];
        if self.settings.rebuild_on_startup {
            hooks.push(HookEvent::OnStartup);
        }
        JobSchedule::Combined {
            interval: Some(self.settings.rebuild_interval()),
            hooks,
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let exporter = GraphExporter::new(
            Arc::clone(&ctx.graph_store),
            Arc::clone(&ctx.cache_store),
            self.cache_ttl,
        );
        let report = rebuild_graph(
            &self.data_dir,
            &self.settings,
            &exporter,
            &ctx.cancellation_token,
        )?;
        info!(
            "Rebuild published {} artists ({} duplicates, {} uncorroborated, {} without known genres)",
            report.export.artists,
            report.reconcile.duplicates,
            report.reconcile.uncorroborated,
            report.reconcile.no_known_genres
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryCacheStore, SyncTokenSource};
    use crate::genre_map::CoordinateSpace;
    use crate::graph_store::{GraphStore, SqliteGraphStore};
    use crate::sources::{save_snapshot, SourceArtist, SourceKind};
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn settings(rebuild_on_startup: bool) -> PipelineSettings {
        PipelineSettings {
            rebuild_on_startup,
            coordinate_space: CoordinateSpace::identity(),
            ..PipelineSettings::default()
        }
    }

    #[test]
    fn test_schedule_follows_settings() {
        let dir = TempDir::new().unwrap();
        let job = GraphRebuildJob::new(
            DataDir::new(dir.path()),
            settings(false),
            Duration::from_secs(60),
        );
        let schedule = job.schedule();
        assert!(!schedule.listens_to(HookEvent::OnStartup));
        assert!(schedule.listens_to(HookEvent::OnSourcesRefreshed));
        assert_eq!(schedule.interval(), Some(Duration::from_secs(24 * 3600)));

        let job = GraphRebuildJob::new(
            DataDir::new(dir.path()),
            settings(true),
            Duration::from_secs(60),
        );
        assert!(job.schedule().listens_to(HookEvent::OnStartup));
    }

    #[tokio::test]
    async fn test_execute_publishes_graph() {
        let dir = TempDir::new().unwrap();
        let data_dir = DataDir::new(dir.path());
        std::fs::write(
            data_dir.genre_map_path(),
            r##"{"ambient": {"x": 10.0, "y": 20.0, "color": "#00aaff"}}"##,
        )
        .unwrap();
        let artist = SourceArtist {
            genres: vec!["ambient".to_string()],
            ..SourceArtist::named("Grouper")
        };
        save_snapshot(&data_dir, SourceKind::ListeningHistory, &[artist.clone()]).unwrap();
        save_snapshot(&data_dir, SourceKind::Catalog, &[artist]).unwrap();

        let store: Arc<dyn GraphStore> = Arc::new(SqliteGraphStore::in_memory().unwrap());
        let (hook_sender, _hook_receiver) = mpsc::channel(1);
        let ctx = JobContext::new(
            CancellationToken::new(),
            Arc::clone(&store),
            Arc::new(InMemoryCacheStore::new()),
            tokio::runtime::Handle::current(),
            hook_sender,
        );
        let job = GraphRebuildJob::new(data_dir, settings(true), Duration::from_secs(60));

        let result = tokio::task::spawn_blocking(move || job.execute(&ctx))
            .await
            .unwrap();

        assert!(result.is_ok());
        assert!(store.current_sync_token().unwrap().is_some());
    }
}
