//! `/collections` endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::metrics::{
    dec_collections_count, inc_collections_count, record_collection_operation,
};
use super::state::{GuardedQueryService, GuardedSynchronizer, ServerState};
use crate::collection_store::Collection;
use crate::collections::{CollectionError, CreateCollectionRequest, DeleteCollectionRequest};

#[derive(Serialize)]
pub(super) struct ErrorResponse {
    pub error: String,
}

pub(super) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for CollectionError {
    fn into_response(self) -> Response {
        match self {
            CollectionError::Validation(message) => {
                error_response(StatusCode::BAD_REQUEST, message)
            }
            CollectionError::NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
            CollectionError::Timeout(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Request timed out")
            }
            CollectionError::Internal(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

#[derive(Serialize)]
struct CollectionsResponse {
    success: bool,
    collections: Vec<Collection>,
}

#[derive(Serialize)]
struct CollectionResponse {
    success: bool,
    collection: Collection,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

/// Parses a JSON body without requiring a content type. An empty body reads
/// as an empty request so the field checks produce the error message.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, CollectionError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        warn!("Malformed collection request body: {}", err);
        CollectionError::validation(format!("malformed JSON body ({})", err))
    })
}

async fn list_collections(State(queries): State<GuardedQueryService>) -> Response {
    match queries.list().await {
        Ok(collections) => Json(CollectionsResponse {
            success: true,
            collections,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn create_collection(
    State(synchronizer): State<GuardedSynchronizer>,
    body: Bytes,
) -> Response {
    let result = match parse_body::<CreateCollectionRequest>(&body) {
        Ok(request) => synchronizer.create(request).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(collection) => {
            record_collection_operation("create", "success");
            inc_collections_count();
            (
                StatusCode::CREATED,
                Json(CollectionResponse {
                    success: true,
                    collection,
                }),
            )
                .into_response()
        }
        Err(err) => {
            record_collection_operation("create", err.kind());
            err.into_response()
        }
    }
}

async fn delete_collection(
    State(synchronizer): State<GuardedSynchronizer>,
    body: Bytes,
) -> Response {
    let result = match parse_body::<DeleteCollectionRequest>(&body) {
        Ok(request) => synchronizer.delete(request).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(_) => {
            record_collection_operation("delete", "success");
            dec_collections_count();
            Json(MessageResponse {
                success: true,
                message: "Collection deleted successfully".to_string(),
            })
            .into_response()
        }
        Err(err) => {
            record_collection_operation("delete", err.kind());
            err.into_response()
        }
    }
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

pub(super) fn make_collection_routes(state: ServerState) -> Router {
    Router::new()
        .route(
            "/collections",
            get(list_collections)
                .post(create_collection)
                .delete(delete_collection)
                .fallback(method_not_allowed),
        )
        .with_state(state)
}
