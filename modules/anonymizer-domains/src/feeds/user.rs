use anonymizer_core::{
    AnonymizerError, AnonymizerResult, DetectionType, FieldViolation, MobilityType, Resource,
    TripType, Violations,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

// Keeps multi-row inserts under the Postgres bind parameter limit.
const INSERT_CHUNK: usize = 1_000;

const JOURNEY_INSERT: &str = r#"
    INSERT INTO user_data (
        journey_id, source_app, company_code, company_trip_type, distance,
        elapsed_time, end_date, id, main_type_space, main_type_time,
        start_date, start_lat, start_lon, end_lat, end_lon
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
"#;

const POSITIONS_INSERT: &str =
    "INSERT INTO user_positions (journey_id, time, authenticity, lat, lon, partial_distance) ";

const SENSORS_INSERT: &str = "INSERT INTO user_sensors (journey_id, time, name, data) ";

const BEHAVIOURS_INSERT: &str = r#"INSERT INTO user_behaviours (
    journey_id, source_app, mode, pos, type, meters, accuracy,
    start_auth, start_lat, start_lon, start_partial_distance, start_time,
    end_auth, end_lat, end_lon, end_partial_distance, end_time
) "#;

/// A GPS fix as submitted by the client app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePosition {
    pub authenticity: i32,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "partialDistance")]
    pub partial_distance: i32,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviourSegment {
    pub start: TracePosition,
    pub end: TracePosition,
    pub meters: i32,
    #[serde(rename = "type")]
    pub mobility_type: MobilityType,
    #[serde(default)]
    pub accuracy: f64,
}

/// Segment lists per detection source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Behaviour {
    #[serde(default)]
    pub user_defined: Vec<BehaviourSegment>,
    #[serde(default)]
    pub tpv_defined: Vec<BehaviourSegment>,
    #[serde(default)]
    pub app_defined: Vec<BehaviourSegment>,
}

impl Behaviour {
    pub fn segments(&self, detection: DetectionType) -> &[BehaviourSegment] {
        match detection {
            DetectionType::User => &self.user_defined,
            DetectionType::ThirdParty => &self.tpv_defined,
            DetectionType::App => &self.app_defined,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub data: serde_json::Value,
    pub name: String,
    pub time: i64,
}

/// One submitted journey with its trace, sensor samples and behaviour segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeed {
    pub source_app: String,
    pub journey_id: String,
    #[serde(default)]
    pub behaviour: Behaviour,
    pub company_code: String,
    #[serde(default)]
    pub company_trip_type: TripType,
    pub distance: i32,
    #[serde(rename = "elapsedTime")]
    pub elapsed_time: String,
    #[serde(rename = "endDate")]
    pub end_date: i64,
    pub id: String,
    /// Free text as reported by the app; not checked against [`MobilityType`].
    #[serde(rename = "mainTypeSpace")]
    pub main_type_space: String,
    #[serde(rename = "mainTypeTime")]
    pub main_type_time: String,
    #[serde(rename = "startDate")]
    pub start_date: i64,
    #[serde(default)]
    pub sensors_information: Vec<SensorSample>,
    pub trace_information: Vec<TracePosition>,
}

impl UserFeed {
    pub fn validate(&self) -> Result<(&TracePosition, &TracePosition), Violations> {
        let mut violations = Violations::new();
        if self.journey_id.is_empty() {
            violations.push(FieldViolation::new(&["journey_id"], "must not be empty"));
        }
        if self.elapsed_time.is_empty() {
            violations.push(FieldViolation::new(&["elapsedTime"], "must not be empty"));
        }
        match (self.trace_information.first(), self.trace_information.last()) {
            (Some(first), Some(last)) => violations.into_result((first, last)),
            _ => {
                violations.push(FieldViolation::new(
                    &["trace_information"],
                    "must contain at least one position",
                ));
                Err(violations)
            }
        }
    }

    /// Store the journey, its positions, sensor samples and behaviour
    /// segments in one transaction. Journey start/end coordinates come from
    /// the first and last trace positions.
    pub async fn store(&self, pool: &PgPool) -> AnonymizerResult<()> {
        let (first, last) = self.validate()?;
        let storage = AnonymizerError::storage;
        let storage_at = AnonymizerError::storage_at;

        let mut tx = pool.begin().await.map_err(storage(Resource::User))?;

        sqlx::query(JOURNEY_INSERT)
            .bind(&self.journey_id)
            .bind(&self.source_app)
            .bind(&self.company_code)
            .bind(self.company_trip_type.as_str())
            .bind(self.distance)
            .bind(&self.elapsed_time)
            .bind(self.end_date)
            .bind(&self.id)
            .bind(&self.main_type_space)
            .bind(&self.main_type_time)
            .bind(self.start_date)
            .bind(first.lat)
            .bind(first.lon)
            .bind(last.lat)
            .bind(last.lon)
            .execute(&mut *tx)
            .await
            .map_err(storage_at(Resource::User, JOURNEY_INSERT))?;

        for chunk in self.trace_information.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(POSITIONS_INSERT);
            qb.push_values(chunk, |mut b, p| {
                b.push_bind(&self.journey_id)
                    .push_bind(p.time)
                    .push_bind(p.authenticity)
                    .push_bind(p.lat)
                    .push_bind(p.lon)
                    .push_bind(p.partial_distance);
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(storage_at(Resource::User, POSITIONS_INSERT))?;
        }

        for chunk in self.sensors_information.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(SENSORS_INSERT);
            qb.push_values(chunk, |mut b, s| {
                b.push_bind(&self.journey_id)
                    .push_bind(s.time)
                    .push_bind(&s.name)
                    .push_bind(&s.data);
            });
            qb.push(" ON CONFLICT DO NOTHING");
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(storage_at(Resource::User, SENSORS_INSERT))?;
        }

        let segments: Vec<(&'static str, i32, &BehaviourSegment)> = DetectionType::ALL
            .iter()
            .flat_map(|detection| {
                self.behaviour
                    .segments(*detection)
                    .iter()
                    .enumerate()
                    .map(move |(pos, segment)| (detection.behaviour_mode(), pos as i32, segment))
            })
            .collect();

        for chunk in segments.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(BEHAVIOURS_INSERT);
            qb.push_values(chunk, |mut b, (mode, pos, segment)| {
                b.push_bind(&self.journey_id)
                    .push_bind(&self.source_app)
                    .push_bind(*mode)
                    .push_bind(*pos)
                    .push_bind(segment.mobility_type.as_str())
                    .push_bind(segment.meters)
                    .push_bind(segment.accuracy)
                    .push_bind(segment.start.authenticity)
                    .push_bind(segment.start.lat)
                    .push_bind(segment.start.lon)
                    .push_bind(segment.start.partial_distance)
                    .push_bind(segment.start.time)
                    .push_bind(f64::from(segment.end.authenticity))
                    .push_bind(segment.end.lat)
                    .push_bind(segment.end.lon)
                    .push_bind(segment.end.partial_distance)
                    .push_bind(segment.end.time);
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(storage_at(Resource::User, BEHAVIOURS_INSERT))?;
        }

        tx.commit().await.map_err(storage(Resource::User))?;

        tracing::info!(
            journey_id = %self.journey_id,
            positions = self.trace_information.len(),
            sensors = self.sensors_information.len(),
            segments = segments.len(),
            "Stored user feed"
        );
        Ok(())
    }
}
