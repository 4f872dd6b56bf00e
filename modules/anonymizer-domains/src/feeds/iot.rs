use anonymizer_core::{AnonymizerError, AnonymizerResult, Resource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const OBSERVATION_INSERT: &str = r#"
    INSERT INTO iot_data (
        result_time, datastream, feature_of_interest, phenomenon_time,
        observation_gep_id, result_auth, value_type, position_type,
        position_lat, position_lon, response_value
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
"#;

const OBSERVATION_BY_GEP_ID: &str = r#"SELECT * FROM "iot_data" WHERE observation_gep_id = $1"#;

/// SensorThings-style entity reference (`{"@iot.id": n}`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IotReference {
    #[serde(rename = "@iot.id")]
    pub id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IotPosition {
    #[serde(rename = "type")]
    pub position_type: String,
    /// `[lat, lon]`
    pub coordinate: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IotResponse {
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IotResult {
    pub authenticity: i32,
    #[serde(rename = "valueType")]
    pub value_type: String,
    #[serde(rename = "Position")]
    pub position: IotPosition,
    pub response: IotResponse,
}

/// One observation as submitted by an IoT gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IotInput {
    #[serde(rename = "resultTime")]
    pub result_time: DateTime<Utc>,
    #[serde(rename = "Datastream")]
    pub datastream: IotReference,
    #[serde(rename = "FeatureOfInterest")]
    pub feature_of_interest: IotReference,
    #[serde(rename = "phenomenonTime")]
    pub phenomenon_time: DateTime<Utc>,
    pub result: IotResult,
    #[serde(rename = "observationGEPid")]
    pub observation_gep_id: String,
}

/// Lookup body for the IoT extraction endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IotLookup {
    #[serde(rename = "observationGEPid")]
    pub observation_gep_id: String,
}

/// Stored `iot_data` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IotObservation {
    pub result_time: DateTime<Utc>,
    pub datastream: i32,
    pub feature_of_interest: i32,
    pub phenomenon_time: DateTime<Utc>,
    pub observation_gep_id: String,
    pub result_auth: i32,
    pub value_type: String,
    pub position_type: String,
    pub position_lat: f64,
    pub position_lon: f64,
    pub response_value: f64,
}

impl From<&IotInput> for IotObservation {
    fn from(input: &IotInput) -> Self {
        let [lat, lon] = input.result.position.coordinate;
        Self {
            result_time: input.result_time,
            datastream: input.datastream.id,
            feature_of_interest: input.feature_of_interest.id,
            phenomenon_time: input.phenomenon_time,
            observation_gep_id: input.observation_gep_id.clone(),
            result_auth: input.result.authenticity,
            value_type: input.result.value_type.clone(),
            position_type: input.result.position.position_type.clone(),
            position_lat: lat,
            position_lon: lon,
            response_value: input.result.response.value,
        }
    }
}

impl IotObservation {
    /// Insert one observation. A repeated `observation_gep_id` violates the
    /// primary key and surfaces as a storage failure.
    pub async fn store(&self, pool: &PgPool) -> AnonymizerResult<()> {
        sqlx::query(OBSERVATION_INSERT)
            .bind(self.result_time)
            .bind(self.datastream)
            .bind(self.feature_of_interest)
            .bind(self.phenomenon_time)
            .bind(&self.observation_gep_id)
            .bind(self.result_auth)
            .bind(&self.value_type)
            .bind(&self.position_type)
            .bind(self.position_lat)
            .bind(self.position_lon)
            .bind(self.response_value)
            .execute(pool)
            .await
            .map_err(AnonymizerError::storage_at(Resource::Iot, OBSERVATION_INSERT))?;

        tracing::info!(observation_gep_id = %self.observation_gep_id, "Stored IoT observation");
        Ok(())
    }

    pub async fn find_by_gep_id(observation_gep_id: &str, pool: &PgPool) -> AnonymizerResult<Self> {
        sqlx::query_as::<_, Self>(OBSERVATION_BY_GEP_ID)
            .bind(observation_gep_id)
            .fetch_optional(pool)
            .await
            .map_err(AnonymizerError::storage_at(Resource::Iot, OBSERVATION_BY_GEP_ID))?
            .ok_or(AnonymizerError::NotFound {
                resource: Resource::Iot,
            })
    }
}
