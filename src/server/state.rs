use axum::extract::FromRef;

use crate::background_jobs::SchedulerHandle;
use crate::query::GraphQueryService;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedQueryService = Arc<GraphQueryService>;
pub type OptionalSchedulerHandle = Option<SchedulerHandle>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub query_service: GuardedQueryService,
    pub scheduler_handle: OptionalSchedulerHandle,
    pub hash: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        query_service: GuardedQueryService,
        scheduler_handle: OptionalSchedulerHandle,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            query_service,
            scheduler_handle,
            hash: env!("GIT_HASH").to_string(),
        }
    }
}

impl FromRef<ServerState> for GuardedQueryService {
    fn from_ref(input: &ServerState) -> Self {
        input.query_service.clone()
    }
}

impl FromRef<ServerState> for OptionalSchedulerHandle {
    fn from_ref(input: &ServerState) -> Self {
        input.scheduler_handle.clone()
    }
}
