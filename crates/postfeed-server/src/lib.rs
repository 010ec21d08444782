//! postfeed server library.
//!
//! This crate hosts the collaborators around the pub/sub engine: an
//! in-memory blog store, the mutation executor that notifies subscribers
//! after each write, and the HTTP/WebSocket surface.

pub mod config;
pub mod error;
pub mod mutation;
pub mod routes;
pub mod store;

pub use config::{Args, ServerConfig};
pub use error::{AppError, Error};
pub use mutation::{blog_dispatcher, MutationExecutor};
pub use store::BlogStore;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use postfeed_core::{new_shared_metrics, SharedPubSubMetrics, TopicRegistry};
use postfeed_proto::Resource;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Blog datastore.
    pub store: Arc<BlogStore>,
    /// Write path; notifies subscribers.
    pub executor: Arc<MutationExecutor>,
    /// Topic registry subscription handlers open channels on.
    pub registry: TopicRegistry<Resource>,
    /// Server configuration.
    pub config: ServerConfig,
}

impl AppState {
    /// Build the store, registry, dispatcher and executor for `config`.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(if config.seed {
            BlogStore::seeded()
        } else {
            BlogStore::new()
        });
        let registry = TopicRegistry::with_metrics(config.pubsub(), new_shared_metrics());
        let dispatcher = Arc::new(blog_dispatcher(registry.clone(), config.scoped_comments));
        let executor = Arc::new(MutationExecutor::new(store.clone(), dispatcher));

        Self {
            store,
            executor,
            registry,
            config,
        }
    }

    /// Pub/sub counters.
    pub fn metrics(&self) -> &SharedPubSubMetrics {
        self.registry.metrics()
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::users::routes())
        .merge(routes::posts::routes())
        .merge(routes::comments::routes())
        .merge(routes::subscriptions::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API until `shutdown` resolves.
///
/// On shutdown the topic registry is closed first so open subscription
/// streams end and their connections can drain.
pub async fn serve(
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Error> {
    let addr: SocketAddr = state.config.listen_addr.parse().map_err(|e| {
        Error::Config(format!(
            "invalid listen address {}: {}",
            state.config.listen_addr, e
        ))
    })?;

    let registry = state.registry.clone();
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(listen = %addr, "server ready, accepting connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            registry.shutdown();
        })
        .await?;

    Ok(())
}
