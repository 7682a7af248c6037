//! Application startup and lifecycle management.

use std::sync::Arc;

use axum::Router;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::services::PgPaymentStore;
use crate::{router, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to PostgreSQL, apply migrations when enabled and bind the
    /// HTTP listener. Port 0 picks a random port.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let store = PgPaymentStore::connect(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        if config.database.run_migrations {
            store.run_migrations().await?;
        } else {
            tracing::info!("Skipping database migrations");
        }

        let state = AppState::new(Arc::new(store));

        let address = config.common.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(service = %config.service_name, "HTTP listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
