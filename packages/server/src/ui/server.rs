//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    usecase::{GetSpaceDetailUseCase, GetSpacesUseCase, JoinSpaceUseCase},
};

use super::{
    handler::{get_space_detail, get_spaces, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Space session server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(join_space_usecase, get_spaces_usecase, get_space_detail_usecase, config);
/// server.run().await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(
        join_space_usecase: Arc<JoinSpaceUseCase>,
        get_spaces_usecase: Arc<GetSpacesUseCase>,
        get_space_detail_usecase: Arc<GetSpaceDetailUseCase>,
        config: ServerConfig,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                join_space_usecase,
                get_spaces_usecase,
                get_space_detail_usecase,
                config,
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/spaces", get(get_spaces))
            .route("/api/spaces/{space_id}", get(get_space_detail))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind to the configured address and serve until Ctrl+C / SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or serving fails.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = self.state.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Space session server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}
