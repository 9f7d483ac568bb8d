//! Batch stages that turn source snapshots into a published graph.
//!
//! `refresh_sources` fetches the three sources into snapshot files;
//! `rebuild_graph` reconciles those snapshots and publishes the result.
//! Both check their cancellation token between stages and publish nothing
//! once cancelled.

mod rebuild;
mod refresh;

pub use rebuild::{rebuild_graph, RebuildReport};
pub use refresh::{fetch_snapshots, refresh_sources, RefreshReport, SourceClients};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline cancelled before {stage}")]
    Cancelled { stage: &'static str },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}

fn check_cancelled(
    cancel: &tokio_util::sync::CancellationToken,
    stage: &'static str,
) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled { stage });
    }
    Ok(())
}

fn status_label<T>(result: &Result<T, PipelineError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(PipelineError::Cancelled { .. }) => "cancelled",
        Err(PipelineError::Failed(_)) => "failed",
    }
}
