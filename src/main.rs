use events::EventPublisher;
use log::{error, info};
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use ws::{Manager, WsDomainEventHandler};

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
        std::process::exit(1);
    }

    info!(
        "Starting up [{}] with publish failure policy [{}]...",
        config.runtime_env(),
        config.publish_failure_policy
    );

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let ws_manager = Arc::new(Manager::new());

    // Fan-out runs on its own task so request handlers never wait on subscribers.
    let (event_publisher, dispatcher) = EventPublisher::channel();
    dispatcher
        .with_handler(Arc::new(WsDomainEventHandler::new(ws_manager.clone())))
        .spawn();

    let app_state = web::AppState::new(
        service::AppState::new(config, &db),
        Arc::new(event_publisher),
        ws_manager,
    );

    if let Err(e) = web::init_server(app_state).await {
        error!("Server terminated: {e}");
        std::process::exit(1);
    }
}
