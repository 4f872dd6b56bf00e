use serde::{Deserialize, Serialize};
use std::fmt;

/// Analytical request kinds accepted by the extraction endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    #[serde(rename = "Partial_Mobility")]
    PartialMobility,
    #[serde(rename = "Complete_Mobility")]
    CompleteMobility,
    #[serde(rename = "All_Positions")]
    AllPositions,
    #[serde(rename = "Stats_num_tracks")]
    StatsNumTracks,
    #[serde(rename = "Stats_avg_time")]
    StatsAvgTime,
    #[serde(rename = "Stats_avg_space")]
    StatsAvgSpace,
    #[serde(rename = "Inter_modality_time")]
    InterModalityTime,
    #[serde(rename = "Inter_modality_space")]
    InterModalitySpace,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PartialMobility => "Partial_Mobility",
            Self::CompleteMobility => "Complete_Mobility",
            Self::AllPositions => "All_Positions",
            Self::StatsNumTracks => "Stats_num_tracks",
            Self::StatsAvgTime => "Stats_avg_time",
            Self::StatsAvgSpace => "Stats_avg_space",
            Self::InterModalityTime => "Inter_modality_time",
            Self::InterModalitySpace => "Inter_modality_space",
        }
    }

    /// Bucket axis for the inter-modality kinds, `None` for row-returning kinds.
    pub fn statistics_axis(&self) -> Option<AggregationType> {
        match self {
            Self::InterModalitySpace => Some(AggregationType::Space),
            Self::InterModalityTime => Some(AggregationType::Time),
            _ => None,
        }
    }

    /// Kinds whose company predicate is scoped by `source_app`.
    pub fn scopes_source_app(&self) -> bool {
        matches!(
            self,
            Self::StatsNumTracks | Self::InterModalityTime | Self::InterModalitySpace
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MobilityType {
    Escooter,
    Walk,
    Bicycle,
    Motorbike,
    Train,
    Car,
    Bus,
    Airplane,
    Boat,
}

impl MobilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escooter => "escooter",
            Self::Walk => "walk",
            Self::Bicycle => "bicycle",
            Self::Motorbike => "motorbike",
            Self::Train => "train",
            Self::Car => "car",
            Self::Bus => "bus",
            Self::Airplane => "airplane",
            Self::Boat => "boat",
        }
    }
}

impl fmt::Display for MobilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who classified a behaviour segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    User,
    App,
    ThirdParty,
}

impl DetectionType {
    pub const ALL: [DetectionType; 3] = [Self::User, Self::ThirdParty, Self::App];

    /// Value stored in `user_behaviours.mode`.
    pub fn behaviour_mode(&self) -> &'static str {
        match self {
            Self::User => "user_defined",
            Self::ThirdParty => "tpv_defined",
            Self::App => "app_defined",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    Space,
    Time,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Space => "space",
            Self::Time => "time",
        }
    }

    /// Journey-level dominant mobility column for this axis.
    pub fn main_type_column(&self) -> &'static str {
        match self {
            Self::Space => "main_type_space",
            Self::Time => "main_type_time",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Company trip classification. `Any` is the wire default `""` and adds no predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TripType {
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "commuting")]
    Commuting,
    #[serde(rename = "business trip")]
    BusinessTrip,
    #[default]
    #[serde(rename = "")]
    Any,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Commuting => "commuting",
            Self::BusinessTrip => "business trip",
            Self::Any => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_kind_uses_wire_names() {
        let kind: RequestKind = serde_json::from_str("\"Stats_num_tracks\"").unwrap();
        assert_eq!(kind, RequestKind::StatsNumTracks);
        assert_eq!(
            serde_json::to_string(&RequestKind::InterModalitySpace).unwrap(),
            "\"Inter_modality_space\""
        );
        assert!(serde_json::from_str::<RequestKind>("\"Everything\"").is_err());
    }

    #[test]
    fn inter_modality_kinds_carry_an_axis() {
        assert_eq!(
            RequestKind::InterModalityTime.statistics_axis(),
            Some(AggregationType::Time)
        );
        assert_eq!(RequestKind::PartialMobility.statistics_axis(), None);
    }

    #[test]
    fn trip_type_defaults_to_any() {
        let trip: TripType = serde_json::from_str("\"\"").unwrap();
        assert_eq!(trip, TripType::default());
        let trip: TripType = serde_json::from_str("\"business trip\"").unwrap();
        assert_eq!(trip.as_str(), "business trip");
    }

    #[test]
    fn detection_maps_to_behaviour_mode() {
        let detection: DetectionType = serde_json::from_str("\"third_party\"").unwrap();
        assert_eq!(detection.behaviour_mode(), "tpv_defined");
        assert_eq!(DetectionType::App.behaviour_mode(), "app_defined");
    }
}
