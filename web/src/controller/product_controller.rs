use crate::controller::ApiResponse;
use crate::{AppState, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::product as ProductApi;
use domain::products::Model;

use log::*;

/// POST create a new Product and notify `product_group` subscribers
#[utoipa::path(
    post,
    path = "/products/create/",
    request_body = Model,
    responses(
        (status = 201, description = "Successfully Created a New Product", body = Model),
        (status = 400, description = "Invalid product fields, keyed by field name"),
        (status = 405, description = "Method not allowed"),
        (status = 415, description = "Request body is not JSON"),
        (status = 422, description = "Request body is missing required fields"),
        (status = 503, description = "Product saved but its notification could not be published")
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(product_model): Json<Model>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a New Product from: {product_model:?}");

    let product = ProductApi::create(
        app_state.db_conn_ref(),
        app_state.event_publisher.as_ref(),
        app_state.publish_failure_policy(),
        product_model,
    )
    .await?;

    info!("Created Product {}", product.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), product)),
    ))
}
