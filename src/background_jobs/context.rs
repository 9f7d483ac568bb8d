use super::job::HookEvent;
use crate::cache::CacheStore;
use crate::graph_store::GraphStore;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Context provided to jobs during execution.
///
/// Contains references to shared resources and a cancellation token
/// for graceful shutdown handling.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for cancellation/shutdown requests.
    pub cancellation_token: CancellationToken,

    /// The authoritative graph store.
    pub graph_store: Arc<dyn GraphStore>,

    /// The shared query cache.
    pub cache_store: Arc<dyn CacheStore>,

    /// Runtime for jobs that drive async clients from their blocking thread.
    pub runtime: Handle,

    hook_sender: mpsc::Sender<HookEvent>,
}

impl JobContext {
    /// Create a new job context with the given dependencies.
    pub fn new(
        cancellation_token: CancellationToken,
        graph_store: Arc<dyn GraphStore>,
        cache_store: Arc<dyn CacheStore>,
        runtime: Handle,
        hook_sender: mpsc::Sender<HookEvent>,
    ) -> Self {
        Self {
            cancellation_token,
            graph_store,
            cache_store,
            runtime,
            hook_sender,
        }
    }

    /// Same resources, different cancellation token.
    pub fn with_cancellation_token(&self, cancellation_token: CancellationToken) -> Self {
        Self {
            cancellation_token,
            ..self.clone()
        }
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Notify the scheduler of a hook event without blocking.
    pub fn fire_hook(&self, event: HookEvent) {
        if let Err(e) = self.hook_sender.try_send(event) {
            warn!("Failed to fire hook {}: {}", event, e);
        }
    }
}
