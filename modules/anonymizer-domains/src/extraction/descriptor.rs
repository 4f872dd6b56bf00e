use anonymizer_core::{AggregationType, DetectionType, MobilityType, RequestKind, TripType};
use serde::{Deserialize, Serialize};

/// Inbound extraction request: the kind plus the union of every filter field.
/// Times are epoch milliseconds, coordinates degrees, radii meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub request: RequestKind,
    pub source_app: String,

    pub time_window_low: Option<String>,
    pub time_window_high: Option<String>,

    pub start_time: Option<i64>,
    pub start_time_high_threshold: Option<i64>,
    pub start_lat: Option<f64>,
    pub start_lon: Option<f64>,
    pub start_radius: Option<f64>,

    pub end_time: Option<i64>,
    pub end_time_high_threshold: Option<i64>,
    pub end_lat: Option<f64>,
    pub end_lon: Option<f64>,
    pub end_radius: Option<f64>,

    pub type_detection: Option<DetectionType>,
    pub type_mobility: Option<MobilityType>,

    #[serde(default)]
    pub company_code: String,
    #[serde(default)]
    pub company_trip_type: TripType,

    pub type_aggregation: Option<AggregationType>,
    pub space_aggregation: Option<i64>,
    pub time_aggregation: Option<i64>,
}

impl RequestDescriptor {
    /// Descriptor with only the mandatory fields set.
    pub fn new(request: RequestKind, source_app: impl Into<String>) -> Self {
        Self {
            request,
            source_app: source_app.into(),
            time_window_low: None,
            time_window_high: None,
            start_time: None,
            start_time_high_threshold: None,
            start_lat: None,
            start_lon: None,
            start_radius: None,
            end_time: None,
            end_time_high_threshold: None,
            end_lat: None,
            end_lon: None,
            end_radius: None,
            type_detection: None,
            type_mobility: None,
            company_code: String::new(),
            company_trip_type: TripType::Any,
            type_aggregation: None,
            space_aggregation: None,
            time_aggregation: None,
        }
    }

    pub fn with_company(mut self, code: impl Into<String>, trip_type: TripType) -> Self {
        self.company_code = code.into();
        self.company_trip_type = trip_type;
        self
    }

    pub fn with_start_time(mut self, value: i64, threshold: i64) -> Self {
        self.start_time = Some(value);
        self.start_time_high_threshold = Some(threshold);
        self
    }

    pub fn with_end_time(mut self, value: i64, threshold: i64) -> Self {
        self.end_time = Some(value);
        self.end_time_high_threshold = Some(threshold);
        self
    }

    pub fn with_start_area(mut self, lat: f64, lon: f64, radius: f64) -> Self {
        self.start_lat = Some(lat);
        self.start_lon = Some(lon);
        self.start_radius = Some(radius);
        self
    }

    pub fn with_end_area(mut self, lat: f64, lon: f64, radius: f64) -> Self {
        self.end_lat = Some(lat);
        self.end_lon = Some(lon);
        self.end_radius = Some(radius);
        self
    }

    pub fn with_mobility(mut self, mobility: MobilityType) -> Self {
        self.type_mobility = Some(mobility);
        self
    }

    pub fn with_detection(mut self, detection: DetectionType) -> Self {
        self.type_detection = Some(detection);
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationType) -> Self {
        self.type_aggregation = Some(aggregation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_minimal_request_with_defaults() {
        let descriptor: RequestDescriptor = serde_json::from_value(json!({
            "request": "Partial_Mobility",
            "source_app": "travis",
        }))
        .unwrap();

        assert_eq!(descriptor, RequestDescriptor::new(RequestKind::PartialMobility, "travis"));
        assert_eq!(descriptor.company_code, "");
        assert_eq!(descriptor.company_trip_type, TripType::Any);
    }

    #[test]
    fn deserializes_full_request() {
        let descriptor: RequestDescriptor = serde_json::from_value(json!({
            "request": "Stats_num_tracks",
            "source_app": "travis",
            "company_code": "ACME",
            "company_trip_type": "commuting",
            "start_time": 1_600_000_000_000_i64,
            "start_time_high_threshold": 3_600_000,
            "type_detection": "third_party",
            "type_mobility": "bus",
            "type_aggregation": "time",
            "unexpected": true,
        }))
        .unwrap();

        assert_eq!(descriptor.request, RequestKind::StatsNumTracks);
        assert_eq!(descriptor.type_detection, Some(DetectionType::ThirdParty));
        assert_eq!(descriptor.type_mobility, Some(MobilityType::Bus));
        assert_eq!(descriptor.type_aggregation, Some(AggregationType::Time));
        assert_eq!(descriptor.start_time_high_threshold, Some(3_600_000));
    }

    #[test]
    fn rejects_unknown_request_kind() {
        let result = serde_json::from_value::<RequestDescriptor>(json!({
            "request": "Heat_Map",
            "source_app": "travis",
        }));
        assert!(result.is_err());
    }
}
