use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use events::EventPublisher;
use log::*;
use sea_orm::DatabaseConnection;
use service::config::{Config, PublishFailurePolicy};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use ws::Manager;

mod controller;
mod error;
pub(crate) mod router;
pub(crate) mod socket;

pub use self::error::{Error, Result};

/// Web-layer state: the service infrastructure plus the handles that connect
/// HTTP handlers to websocket delivery.
#[derive(Clone)]
pub struct AppState {
    pub service_state: service::AppState,
    pub event_publisher: Arc<EventPublisher>,
    pub ws_manager: Arc<Manager>,
}

impl AppState {
    pub fn new(
        service_state: service::AppState,
        event_publisher: Arc<EventPublisher>,
        ws_manager: Arc<Manager>,
    ) -> Self {
        Self {
            service_state,
            event_publisher,
            ws_manager,
        }
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.service_state.db_conn_ref()
    }

    pub fn config(&self) -> &Config {
        &self.service_state.config
    }

    pub fn publish_failure_policy(&self) -> PublishFailurePolicy {
        self.service_state.config.publish_failure_policy
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let config = app_state.config().clone();
    let interface = config.interface.as_deref().unwrap_or("127.0.0.1");
    let host = format!("{interface}:{}", config.port);

    info!("Server starting... listening for connections on http://{host}");

    let listener = TcpListener::bind(&host).await?;

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(allowed_origins(&config.allowed_origins));

    axum::serve(
        listener,
        router::define_routes(app_state).layer(cors_layer),
    )
    .await
}

fn allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_origins_skips_values_that_are_not_valid_headers() {
        let origins = vec![
            "http://localhost:3000".to_owned(),
            "bad\norigin".to_owned(),
        ];

        assert_eq!(
            allowed_origins(&origins),
            vec![HeaderValue::from_static("http://localhost:3000")]
        );
    }
}
