use axum::extract::FromRef;

use crate::media_service::{MediaService, ReconcileLog};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::ServerConfig;

pub type GuardedMediaService = Arc<MediaService>;
pub type GuardedReconcileLog = Arc<ReconcileLog>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub service: GuardedMediaService,
    pub reconcile_log: GuardedReconcileLog,
    /// Server-wide shutdown token. Handlers derive per-request tokens from
    /// it so in-flight synchronous work stops when the server does.
    pub shutdown: CancellationToken,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedMediaService {
    fn from_ref(input: &ServerState) -> Self {
        input.service.clone()
    }
}

impl FromRef<ServerState> for GuardedReconcileLog {
    fn from_ref(input: &ServerState) -> Self {
        input.reconcile_log.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
