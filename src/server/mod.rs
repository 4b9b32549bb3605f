//! HTTP Surface
//!
//! Builds the Axum router of a broker node: the service-up check, the
//! broadcast route (only when peers are configured) and the middleware stack
//! that gives every request its id, identity headers and optional basic auth.

pub mod handlers;
pub mod middleware;

use crate::broadcast::dispatcher::BroadcastDispatcher;
use crate::broadcast::handlers::handle_broadcast_start_task;
use crate::broadcast::protocol::ENDPOINT_BROADCAST_START_TASK;
use crate::broadcast::types::{ClusterId, Credentials};
use crate::config::BrokerConfig;

use axum::routing::{get, post};
use axum::{Extension, Router};

/// Everything the router needs, resolved from configuration once at startup.
#[derive(Clone)]
pub struct NodeContext {
    pub cluster_id: ClusterId,
    pub basic_auth: Option<Credentials>,
    pub dispatcher: BroadcastDispatcher,
}

impl NodeContext {
    pub fn from_config(config: &BrokerConfig) -> anyhow::Result<Self> {
        let peers = config.broadcast_targets();
        let dispatcher = match config.broadcast_timeout() {
            Some(timeout) => BroadcastDispatcher::with_timeout(peers, timeout)?,
            None => BroadcastDispatcher::new(peers),
        };

        Ok(Self {
            cluster_id: config.resolve_cluster_id(),
            basic_auth: config.basic_auth(),
            dispatcher,
        })
    }
}

pub fn build_router(context: NodeContext) -> Router {
    let mut router = Router::new().route("/", get(handlers::handle_service_up));

    if !context.dispatcher.peers().is_empty() {
        router = router.route(
            ENDPOINT_BROADCAST_START_TASK,
            post(handle_broadcast_start_task),
        );
    }

    router = router
        .layer(Extension(context.dispatcher))
        .layer(Extension(context.cluster_id.clone()));

    if let Some(credentials) = context.basic_auth {
        router = router.layer(axum::middleware::from_fn_with_state(
            credentials,
            middleware::require_basic_auth,
        ));
    }

    router
        .layer(axum::middleware::from_fn_with_state(
            context.cluster_id,
            middleware::set_node_headers,
        ))
        .layer(axum::middleware::from_fn(middleware::attach_request_id))
}
