//! Gateway service lifecycle: bind, serve, graceful shutdown.

use crate::config::GatewayConfig;
use crate::routes::build_router;
use crate::state::AppState;
use std::net::SocketAddr;
use tracing::{error, info};

/// The HTTP server wrapper.
pub struct GatewayService {
    state: AppState,
}

impl GatewayService {
    /// Validate configuration and build the service.
    pub fn new(state: AppState) -> Result<Self, String> {
        state.config.validate()?;
        Ok(Self { state })
    }

    /// Serve until the shutdown future resolves.
    pub async fn serve(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = self.state.config.listen_addr();
        let router = build_router(self.state);

        info!(addr = %addr, "Starting HTTP server");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        if let Err(e) = &result {
            error!(error = %e, "HTTP server error");
        } else {
            info!("HTTP server stopped");
        }
        result
    }
}
