use serde::{Deserialize, Serialize};

/// One behaviour segment joined with its journey. Partial mobility fills the
/// time, coordinate and distance columns from the journey, complete mobility
/// from the segment itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MobilityRow {
    pub journey_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub mobility_type: String,
    pub mode: String,
    pub start_time: i64,
    pub end_time: i64,
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub meters: i32,
}

/// A trace position with the segment that covers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PositionRow {
    pub journey_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub mobility_type: String,
    pub mode: String,
    pub lat: f64,
    pub lon: f64,
    pub time: i64,
    pub partial_distance: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrackCountRow {
    pub main_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AverageRow {
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub mobility_type: String,
    pub average: f64,
    pub count: i64,
}
