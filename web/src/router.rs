use crate::{
    controller::{health_check_controller, product_controller},
    socket::handler,
    AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Product Notify API"
        ),
        paths(
            health_check_controller::health_check,
            product_controller::create,
        ),
        components(
            schemas(
                domain::products::Model,
            )
        ),
        tags(
            (name = "product_notify", description = "Product creation with live websocket notifications")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(product_routes(app_state.clone()))
        .merge(websocket_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn product_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/products/create/", post(product_controller::create))
        .with_state(app_state)
}

fn websocket_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws/products/", get(handler::product_notifications))
        .route("/ws/groups/:group", get(handler::group_notifications))
        .with_state(app_state)
}
