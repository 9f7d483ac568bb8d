//! Bounded-concurrency fan-out of per-artist lookups.

use super::error::SourceError;
use super::models::{SourceArtist, SourceKind};
use super::retry::RetryPolicy;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A source that can describe one artist by name.
#[async_trait]
pub trait ArtistLookup: Send + Sync {
    fn source(&self) -> SourceKind;

    /// Look the artist up. `Ok(None)` means the source has no match.
    async fn lookup(&self, name: &str) -> Result<Option<SourceArtist>, SourceError>;
}

/// Counters for one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub requested: usize,
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Look up every name with at most `concurrency` requests in flight.
///
/// Results keep the order of `names`. Failed lookups are retried per
/// `retry`, then logged and skipped. Cancellation stops issuing new lookups;
/// whatever completed before is still returned.
pub async fn lookup_all(
    lookup: &dyn ArtistLookup,
    names: &[String],
    concurrency: usize,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
    progress: Option<&ProgressBar>,
) -> (Vec<SourceArtist>, FetchReport) {
    let source = lookup.source();
    let mut report = FetchReport {
        requested: names.len(),
        ..Default::default()
    };

    let results: Vec<(&String, Result<Option<SourceArtist>, SourceError>)> = stream::iter(names)
        .map(|name| async move {
            let label = format!("{} lookup for '{}'", source, name);
            let result = retry.run(&label, move || lookup.lookup(name)).await;
            if let Some(pb) = progress {
                pb.inc(1);
            }
            (name, result)
        })
        .buffered(concurrency.max(1))
        .take_until(cancel.cancelled())
        .collect()
        .await;

    let mut artists = Vec::with_capacity(results.len());
    for (name, result) in results {
        match result {
            Ok(Some(artist)) => {
                report.found += 1;
                artists.push(artist);
            }
            Ok(None) => {
                report.not_found += 1;
                debug!("{}: no match for '{}'", source, name);
            }
            Err(e) => {
                report.failed += 1;
                warn!("{}: skipping '{}': {}", source, name, e);
            }
        }
    }

    report.cancelled = cancel.is_cancelled();
    info!(
        "{}: {} requested, {} found, {} not found, {} failed{}",
        source,
        report.requested,
        report.found,
        report.not_found,
        report.failed,
        if report.cancelled { " (cancelled)" } else { "" }
    );

    (artists, report)
}
