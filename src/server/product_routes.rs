use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{error, warn};

use super::collection_routes::error_response;
use super::metrics::record_upstream_request;
use super::state::{OptionalProductCatalog, ServerState};
use crate::upstream::ACCESS_TOKEN_HEADER;

/// Passes the upstream product listing through unchanged, authenticated with
/// the caller's own access token.
async fn list_products(
    State(product_catalog): State<OptionalProductCatalog>,
    headers: HeaderMap,
) -> Response {
    let Some(access_token) = headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
    else {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    };

    let Some(product_catalog) = product_catalog else {
        warn!("Product listing requested but no shop is configured");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Product catalog is not configured",
        );
    };

    match product_catalog.list_products(access_token).await {
        Ok(products) => {
            record_upstream_request("success");
            Json(products).into_response()
        }
        Err(err) => {
            error!("Upstream product listing failed: {:#}", err);
            record_upstream_request("error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub(super) fn make_product_routes(state: ServerState) -> Router {
    Router::new()
        .route("/products", get(list_products))
        .with_state(state)
}
