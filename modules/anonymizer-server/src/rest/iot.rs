use anonymizer_core::Resource;
use anonymizer_domains::{IotInput, IotLookup, IotObservation};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json, Response},
};

use super::{error_response, rejection_response, stored, Operation};
use crate::routes::AppState;

const EXTRACT_REQUEST: &str = "extract observation_gep_id associated data";

pub async fn store(
    State(state): State<AppState>,
    payload: Result<Json<IotInput>, JsonRejection>,
) -> Response {
    let Json(input) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(Resource::Iot, rejection),
    };

    match IotObservation::from(&input).store(&state.pool).await {
        Ok(()) => stored(Resource::Iot),
        Err(e) => {
            if e.is_duplicate_key() {
                tracing::warn!(
                    observation_gep_id = %input.observation_gep_id,
                    "Observation already stored"
                );
            }
            error_response(Resource::Iot, Operation::Store, &e)
        }
    }
}

pub async fn extract(
    State(state): State<AppState>,
    payload: Result<Json<IotLookup>, JsonRejection>,
) -> Response {
    let Json(lookup) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(Resource::Iot, rejection),
    };

    match IotObservation::find_by_gep_id(&lookup.observation_gep_id, &state.pool).await {
        Ok(observation) => Json(observation).into_response(),
        Err(e) => error_response(Resource::Iot, Operation::Extract(EXTRACT_REQUEST), &e),
    }
}
