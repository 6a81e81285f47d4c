//! Lockwork server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use lockwork_api::{AppState, ops_router, router as api_router};
use lockwork_common::Config;
use lockwork_core::{
    DoorService, KeyService, PermissionChangePublisherService, PermissionService, SessionService,
    UserService,
};
use lockwork_db::repositories::{
    AccessKeyRepository, DoorRepository, PermissionRepository, UserRepository,
};
use lockwork_dispatch::{
    DoorCommandDispatcher, HttpCommandTransport, RetryConfig, spawn_reconciler,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Resolves on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("SIGINT received, shutting down");
        },
        () = terminate => {
            info!("SIGTERM received, shutting down");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is normal outside development.
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .init();

    info!(environment = %config.environment, "Starting lockwork");

    let db = lockwork_db::init(&config).await?;
    info!("Database pool ready");

    lockwork_db::migrate(&db).await?;
    info!("Schema migrations applied");

    let db = Arc::new(db);
    let door_repo = DoorRepository::new(Arc::clone(&db));
    let key_repo = AccessKeyRepository::new(Arc::clone(&db));
    let user_repo = UserRepository::new(Arc::clone(&db));
    let permission_repo = PermissionRepository::new(Arc::clone(&db));

    let door_service = DoorService::new(door_repo.clone());
    let mut key_service = KeyService::new(
        key_repo.clone(),
        user_repo.clone(),
        permission_repo.clone(),
    );
    let user_service = UserService::new(user_repo);
    let mut permission_service =
        PermissionService::new(permission_repo, key_repo, door_repo.clone());
    let session_service = SessionService::new(config.auth.clone());

    // One serialized worker per door over a shared HTTP transport.
    let transport = Arc::new(HttpCommandTransport::from_config(&config.device));
    let dispatcher = DoorCommandDispatcher::new(
        transport,
        Arc::new(permission_service.clone()),
        door_repo,
        RetryConfig::from(&config.device),
    );

    // Permission writes publish their affected doors into the engine.
    let (reconciler, _engine) = spawn_reconciler(Arc::new(dispatcher.clone()), &config.reconciler);
    let publisher: PermissionChangePublisherService = Arc::new(reconciler);
    permission_service.set_publisher(publisher.clone());
    key_service.set_publisher(publisher);
    info!("Reconciliation engine running");

    let state = AppState {
        door_service,
        key_service,
        user_service,
        permission_service,
        session_service,
        dispatcher,
    };

    // Console API under /api, probes and metrics at the root.
    let app = Router::new()
        .nest("/api", api_router())
        .merge(ops_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            lockwork_api::middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(
            lockwork_api::middleware::track_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}
