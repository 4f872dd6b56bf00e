use anonymizer_core::Resource;
use anonymizer_domains::{extract_user, QueryBuilder, RequestDescriptor, UserFeed};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json, Response},
};
use tracing::info;

use super::{error_response, rejection_response, stored, Operation};
use crate::routes::AppState;

pub async fn store(
    State(state): State<AppState>,
    payload: Result<Json<UserFeed>, JsonRejection>,
) -> Response {
    let Json(feed) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(Resource::User, rejection),
    };

    match feed.store(&state.pool).await {
        Ok(()) => stored(Resource::User),
        Err(e) => error_response(Resource::User, Operation::Store, &e),
    }
}

pub async fn extract(
    State(state): State<AppState>,
    payload: Result<Json<RequestDescriptor>, JsonRejection>,
) -> Response {
    let Json(descriptor) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(Resource::User, rejection),
    };
    let request = descriptor.request.as_str();
    info!(request, source_app = %descriptor.source_app, "User extraction requested");

    let composed = match QueryBuilder::build(&descriptor) {
        Ok(composed) => composed,
        Err(e) => return error_response(Resource::User, Operation::Extract(request), &e),
    };

    match extract_user(&state.pool, &composed).await {
        Ok(extraction) => Json(extraction).into_response(),
        Err(e) => error_response(Resource::User, Operation::Extract(request), &e),
    }
}
