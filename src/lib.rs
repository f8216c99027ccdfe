pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod email;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use api::create_api_router;
use auth::AuthState;
use axum::{middleware, Router};
use db::Database;
use email::Mailer;
use jwt::TokenCodec;
use service::AuthService;
use tokio::net::TcpListener;
use url::Url;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Decoded HMAC-SHA256 signing secret
    pub signing_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
    /// Public origin embedded in password reset links
    pub public_origin: Url,
    /// Outbound mail transport
    pub mailer: Arc<dyn Mailer>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let codec = Arc::new(TokenCodec::new(
        &config.signing_secret,
        config.access_ttl_secs,
    ));

    let service = AuthService::new(
        config.db.clone(),
        codec.clone(),
        config.mailer.clone(),
        config.public_origin.clone(),
        config.refresh_ttl_secs,
    );

    // The authentication layer wraps the whole app so it sees full
    // request paths; it establishes identity but never rejects.
    Router::new()
        .nest("/api", create_api_router(service))
        .layer(middleware::from_fn_with_state(
            AuthState { codec },
            auth::authenticate,
        ))
}

/// Run cleanup tasks and spawn the background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    // Run cleanup tasks on startup
    init_cleanup(&config.db).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
