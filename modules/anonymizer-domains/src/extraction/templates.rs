//! One statement shape per request kind.
//!
//! Every template nests the journey filters inside a `user_data` subquery
//! (or reads `user_data` directly), joins on the journey id and appends the
//! behaviour-level tail: mobility type first, detection second.

use anonymizer_core::{AggregationType, DetectionType, FieldViolation, RequestKind, Violations};

use super::descriptor::RequestDescriptor;
use super::fragments::{
    write_tail, DetectionFilter, DetectionTarget, JourneyFilters, MobilityFilter, Predicate,
};
use super::sql::SqlFragment;

pub trait QueryTemplate: Sized {
    fn from_descriptor(d: &RequestDescriptor) -> Result<Self, Violations>;

    fn kind(&self) -> RequestKind;

    fn compose(&self) -> SqlFragment;
}

const PARTIAL_MOBILITY_HEAD: &str = r#"SELECT journey_id, type, mode, nested.w1 AS start_time, nested.w2 AS end_time, nested.y1 AS start_lat, nested.y2 AS start_lon, nested.y3 AS end_lat, nested.y4 AS end_lon, nested.z AS meters FROM "user_behaviours", (SELECT journey_id AS x, start_lat AS y1, start_lon AS y2, end_lat AS y3, end_lon AS y4, distance AS z, start_date AS w1, end_date AS w2 FROM "user_data" WHERE "#;

const COMPLETE_MOBILITY_HEAD: &str = r#"SELECT journey_id, type, mode, start_time, end_time, start_lat, start_lon, end_lat, end_lon, meters FROM "user_behaviours", (SELECT journey_id AS x FROM "user_data" WHERE "#;

const BEHAVIOUR_JOIN: &str = ") AS nested WHERE nested.x = journey_id";

/// Keeps each journey's rows together with detection sources in the order
/// feeds store them and segments by position, so folds see insertion order.
fn push_segment_order(sql: &mut SqlFragment) {
    sql.push(" ORDER BY journey_id, CASE mode");
    for (rank, detection) in DetectionType::ALL.iter().enumerate() {
        sql.push(format!(" WHEN '{}' THEN {rank}", detection.behaviour_mode()));
    }
    sql.push(" END, pos;");
}

const ALL_POSITIONS_HEAD: &str = r#"SELECT nested_pos.y AS journey_id, nested_behaviour.type, nested_behaviour.mode, nested_pos.lat, nested_pos.lon, nested_pos.time, nested_pos.partial_distance FROM (SELECT type, mode, journey_id, start_time, end_time FROM "user_behaviours") AS nested_behaviour, (SELECT journey_id AS y, lat, lon, time, partial_distance FROM "user_positions") AS nested_pos, (SELECT journey_id AS x FROM "user_data" WHERE "#;

const ALL_POSITIONS_JOIN: &str = ") AS nested WHERE nested.x = nested_pos.y AND nested_pos.y = nested_behaviour.journey_id AND nested_behaviour.start_time <= nested_pos.time AND nested_behaviour.end_time >= nested_pos.time";

/// Behaviour-level filters appended after the join.
#[derive(Debug, Clone, PartialEq)]
struct BehaviourTail {
    mobility: Option<MobilityFilter>,
    detection: Option<DetectionFilter>,
}

impl BehaviourTail {
    fn write(&self, sql: &mut SqlFragment) {
        write_tail(
            sql,
            &[
                self.mobility.as_ref().map(|p| p as &dyn Predicate),
                self.detection.as_ref().map(|p| p as &dyn Predicate),
            ],
        );
    }
}

/// Segment type and mode with journey-level times, coordinates and distance.
/// `type_mobility` and `type_aggregation` are a coupled pair here.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialMobility {
    filters: JourneyFilters,
    tail: BehaviourTail,
}

impl QueryTemplate for PartialMobility {
    fn from_descriptor(d: &RequestDescriptor) -> Result<Self, Violations> {
        let mut violations = Violations::new();
        let filters = JourneyFilters::from_descriptor(d, &mut violations);
        let mobility = violations
            .check(MobilityFilter::coupled_with_aggregation(d, "type"))
            .flatten();
        let detection = DetectionFilter::from_descriptor(d, DetectionTarget::Column("mode"));

        violations.into_result(Self {
            filters,
            tail: BehaviourTail {
                mobility,
                detection,
            },
        })
    }

    fn kind(&self) -> RequestKind {
        RequestKind::PartialMobility
    }

    fn compose(&self) -> SqlFragment {
        let mut sql = SqlFragment::new();
        sql.push(PARTIAL_MOBILITY_HEAD);
        self.filters.write(&mut sql);
        sql.push(BEHAVIOUR_JOIN);
        self.tail.write(&mut sql);
        push_segment_order(&mut sql);
        sql
    }
}

/// Full behaviour segments of every matching journey.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteMobility {
    filters: JourneyFilters,
    tail: BehaviourTail,
}

impl QueryTemplate for CompleteMobility {
    fn from_descriptor(d: &RequestDescriptor) -> Result<Self, Violations> {
        let mut violations = Violations::new();
        let filters = JourneyFilters::from_descriptor(d, &mut violations);

        violations.into_result(Self {
            filters,
            tail: BehaviourTail {
                mobility: MobilityFilter::from_descriptor(d, "type"),
                detection: DetectionFilter::from_descriptor(d, DetectionTarget::Column("mode")),
            },
        })
    }

    fn kind(&self) -> RequestKind {
        RequestKind::CompleteMobility
    }

    fn compose(&self) -> SqlFragment {
        let mut sql = SqlFragment::new();
        sql.push(COMPLETE_MOBILITY_HEAD);
        self.filters.write(&mut sql);
        sql.push(BEHAVIOUR_JOIN);
        self.tail.write(&mut sql);
        push_segment_order(&mut sql);
        sql
    }
}

/// Trace positions labelled with the segment whose time span covers them.
#[derive(Debug, Clone, PartialEq)]
pub struct AllPositions {
    filters: JourneyFilters,
    tail: BehaviourTail,
}

impl QueryTemplate for AllPositions {
    fn from_descriptor(d: &RequestDescriptor) -> Result<Self, Violations> {
        let mut violations = Violations::new();
        let filters = JourneyFilters::from_descriptor(d, &mut violations);

        violations.into_result(Self {
            filters,
            tail: BehaviourTail {
                mobility: MobilityFilter::from_descriptor(d, "nested_behaviour.type"),
                detection: DetectionFilter::from_descriptor(
                    d,
                    DetectionTarget::Column("nested_behaviour.mode"),
                ),
            },
        })
    }

    fn kind(&self) -> RequestKind {
        RequestKind::AllPositions
    }

    fn compose(&self) -> SqlFragment {
        let mut sql = SqlFragment::new();
        sql.push(ALL_POSITIONS_HEAD);
        self.filters.write(&mut sql);
        sql.push(ALL_POSITIONS_JOIN);
        self.tail.write(&mut sql);
        sql.push(" ORDER BY nested_pos.y, nested_pos.time;");
        sql
    }
}

/// Journey count per dominant mobility type on one axis. Reads `user_data`
/// only, so detection goes through a behaviour subquery.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsNumTracks {
    axis: AggregationType,
    filters: JourneyFilters,
    tail: BehaviourTail,
}

impl QueryTemplate for StatsNumTracks {
    fn from_descriptor(d: &RequestDescriptor) -> Result<Self, Violations> {
        let mut violations = Violations::new();
        let filters = JourneyFilters::from_descriptor(d, &mut violations);
        let Some(axis) = d.type_aggregation else {
            violations.push(FieldViolation::new(
                &["type_aggregation"],
                format!("required for {}", RequestKind::StatsNumTracks),
            ));
            return Err(violations);
        };

        violations.into_result(Self {
            axis,
            filters,
            tail: BehaviourTail {
                mobility: MobilityFilter::from_descriptor(d, axis.main_type_column()),
                detection: DetectionFilter::from_descriptor(d, DetectionTarget::BehaviourSubquery),
            },
        })
    }

    fn kind(&self) -> RequestKind {
        RequestKind::StatsNumTracks
    }

    fn compose(&self) -> SqlFragment {
        let column = self.axis.main_type_column();
        let mut sql = SqlFragment::new();
        sql.push(format!(
            r#"SELECT DISTINCT({column}) AS main_type, count(*) AS count FROM "user_data" WHERE "#
        ));
        self.filters.write(&mut sql);
        self.tail.write(&mut sql);
        sql.push(format!(" GROUP BY {column};"));
        sql
    }
}

/// Per-type segment average: meters for space, duration for time.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsAverage {
    axis: AggregationType,
    filters: JourneyFilters,
    tail: BehaviourTail,
}

impl StatsAverage {
    fn measure(&self) -> &'static str {
        match self.axis {
            AggregationType::Space => "meters",
            AggregationType::Time => "end_time - start_time",
        }
    }
}

impl QueryTemplate for StatsAverage {
    fn from_descriptor(d: &RequestDescriptor) -> Result<Self, Violations> {
        let axis = match d.request {
            RequestKind::StatsAvgSpace => AggregationType::Space,
            RequestKind::StatsAvgTime => AggregationType::Time,
            other => {
                return Err(FieldViolation::new(
                    &["request"],
                    format!("{other} is not an average statistic"),
                )
                .into())
            }
        };
        let mut violations = Violations::new();
        let filters = JourneyFilters::from_descriptor(d, &mut violations);

        violations.into_result(Self {
            axis,
            filters,
            tail: BehaviourTail {
                mobility: MobilityFilter::from_descriptor(d, "type"),
                detection: DetectionFilter::from_descriptor(d, DetectionTarget::Column("mode")),
            },
        })
    }

    fn kind(&self) -> RequestKind {
        match self.axis {
            AggregationType::Space => RequestKind::StatsAvgSpace,
            AggregationType::Time => RequestKind::StatsAvgTime,
        }
    }

    fn compose(&self) -> SqlFragment {
        let mut sql = SqlFragment::new();
        sql.push(format!(
            r#"SELECT DISTINCT(type) AS type, avg({})::float8 AS average, count(journey_id) AS count FROM "user_behaviours", (SELECT journey_id AS x FROM "user_data" WHERE "#,
            self.measure()
        ));
        self.filters.write(&mut sql);
        sql.push(") AS nested WHERE journey_id = nested.x");
        self.tail.write(&mut sql);
        sql.push(" GROUP BY type;");
        sql
    }
}

/// Composes only the `user_data` condition chain; the statistics aggregator
/// embeds it into each of its bucket statements. Behaviour-level fields are
/// not applicable and are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct InterModality {
    axis: AggregationType,
    filters: JourneyFilters,
}

impl InterModality {
    pub fn axis(&self) -> AggregationType {
        self.axis
    }
}

impl QueryTemplate for InterModality {
    fn from_descriptor(d: &RequestDescriptor) -> Result<Self, Violations> {
        let Some(axis) = d.request.statistics_axis() else {
            return Err(FieldViolation::new(
                &["request"],
                format!("{} is not an inter-modality statistic", d.request),
            )
            .into());
        };
        let mut violations = Violations::new();
        let filters = JourneyFilters::from_descriptor(d, &mut violations);
        violations.into_result(Self { axis, filters })
    }

    fn kind(&self) -> RequestKind {
        match self.axis {
            AggregationType::Space => RequestKind::InterModalitySpace,
            AggregationType::Time => RequestKind::InterModalityTime,
        }
    }

    fn compose(&self) -> SqlFragment {
        let mut sql = SqlFragment::new();
        self.filters.write(&mut sql);
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anonymizer_core::{MobilityType, TripType};

    fn base(kind: RequestKind) -> RequestDescriptor {
        RequestDescriptor::new(kind, "travis").with_company("ACME", TripType::Any)
    }

    fn loaded(kind: RequestKind) -> RequestDescriptor {
        base(kind)
            .with_start_time(1_000, 60_000)
            .with_end_time(2_000, 60_000)
            .with_start_area(45.07, 7.68, 500.0)
            .with_end_area(45.05, 7.66, 500.0)
            .with_company("ACME", TripType::Commuting)
            .with_mobility(MobilityType::Walk)
            .with_detection(DetectionType::User)
            .with_aggregation(AggregationType::Space)
    }

    fn sql_of<T: QueryTemplate>(d: &RequestDescriptor) -> String {
        T::from_descriptor(d).unwrap().compose().build().sql
    }

    fn assert_well_formed(sql: &str) {
        assert!(sql.ends_with(';'), "{sql}");
        assert_eq!(sql.matches(';').count(), 1, "{sql}");
        assert!(!sql.contains("AND )"), "{sql}");
        assert!(!sql.contains("WHERE )"), "{sql}");
        assert!(!sql.contains("AND AND"), "{sql}");
        assert!(!sql.contains("AND ;"), "{sql}");
        assert!(!sql.contains("AND GROUP"), "{sql}");
        assert!(!sql.contains("AND ORDER"), "{sql}");
    }

    #[test]
    fn partial_mobility_minimal() {
        let sql = sql_of::<PartialMobility>(&base(RequestKind::PartialMobility));
        assert_well_formed(&sql);
        assert!(sql.contains(r#"FROM "user_data" WHERE company_code = $1) AS nested WHERE nested.x = journey_id ORDER BY"#));
    }

    #[test]
    fn partial_mobility_tail_order() {
        let sql = sql_of::<PartialMobility>(&loaded(RequestKind::PartialMobility));
        assert_well_formed(&sql);
        let join = sql.find("nested.x = journey_id").unwrap();
        let mobility = sql.find("AND type = ").unwrap();
        let detection = sql.find("AND mode = ").unwrap();
        assert!(join < mobility && mobility < detection, "{sql}");
    }

    #[test]
    fn segments_follow_stored_source_order() {
        let tail = " ORDER BY journey_id, CASE mode WHEN 'user_defined' THEN 0 WHEN 'tpv_defined' THEN 1 WHEN 'app_defined' THEN 2 END, pos;";
        let sql = sql_of::<PartialMobility>(&base(RequestKind::PartialMobility));
        assert!(sql.ends_with(tail), "{sql}");
        let sql = sql_of::<CompleteMobility>(&base(RequestKind::CompleteMobility));
        assert!(sql.ends_with(tail), "{sql}");
    }

    #[test]
    fn partial_mobility_rejects_lone_mobility() {
        let d = base(RequestKind::PartialMobility).with_mobility(MobilityType::Car);
        let err = PartialMobility::from_descriptor(&d).unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn complete_mobility_accepts_detection_alone() {
        let d = base(RequestKind::CompleteMobility).with_detection(DetectionType::ThirdParty);
        let template = CompleteMobility::from_descriptor(&d).unwrap();
        let bound = template.compose().build();
        assert_well_formed(&bound.sql);
        assert!(bound.sql.contains("nested.x = journey_id AND mode = $2"));
        assert!(!bound.sql.contains("AND type ="));
        assert_eq!(bound.args.len(), 2);
    }

    #[test]
    fn complete_mobility_full() {
        let sql = sql_of::<CompleteMobility>(&loaded(RequestKind::CompleteMobility));
        assert_well_formed(&sql);
        assert!(sql.starts_with("SELECT journey_id, type, mode, start_time, end_time"));
    }

    #[test]
    fn all_positions_filters_on_nested_behaviour() {
        let sql = sql_of::<AllPositions>(&loaded(RequestKind::AllPositions));
        assert_well_formed(&sql);
        assert!(sql.contains("AND nested_behaviour.type = "));
        assert!(sql.contains("AND nested_behaviour.mode = "));

        let sql = sql_of::<AllPositions>(&base(RequestKind::AllPositions));
        assert_well_formed(&sql);
        assert!(sql.contains("nested_behaviour.end_time >= nested_pos.time ORDER BY"));
    }

    #[test]
    fn stats_num_tracks_minimal() {
        let d = RequestDescriptor::new(RequestKind::StatsNumTracks, "travis")
            .with_aggregation(AggregationType::Space);
        let bound = StatsNumTracks::from_descriptor(&d).unwrap().compose().build();
        assert_well_formed(&bound.sql);
        assert_eq!(
            bound.sql,
            r#"SELECT DISTINCT(main_type_space) AS main_type, count(*) AS count FROM "user_data" WHERE source_app = $1 AND company_code = $2 GROUP BY main_type_space;"#
        );
    }

    #[test]
    fn stats_num_tracks_requires_aggregation() {
        let d = base(RequestKind::StatsNumTracks).with_mobility(MobilityType::Bus);
        let err = StatsNumTracks::from_descriptor(&d).unwrap_err();
        assert!(err.iter().any(|v| v.fields == vec!["type_aggregation"]));
    }

    #[test]
    fn stats_num_tracks_full() {
        let mut d = loaded(RequestKind::StatsNumTracks);
        d.type_aggregation = Some(AggregationType::Time);
        let sql = sql_of::<StatsNumTracks>(&d);
        assert_well_formed(&sql);
        assert!(sql.contains("AND main_type_time = "));
        assert!(sql.contains(r#"AND journey_id IN (SELECT journey_id FROM "user_behaviours" WHERE mode = "#));
        assert!(sql.ends_with("GROUP BY main_type_time;"));
    }

    #[test]
    fn stats_average_measures_per_axis() {
        let space = sql_of::<StatsAverage>(&base(RequestKind::StatsAvgSpace));
        assert_well_formed(&space);
        assert!(space.contains("avg(meters)::float8"));
        assert!(space.ends_with("GROUP BY type;"));

        let time = sql_of::<StatsAverage>(&loaded(RequestKind::StatsAvgTime));
        assert_well_formed(&time);
        assert!(time.contains("avg(end_time - start_time)::float8"));
        assert!(time.contains("AND type = "));
    }

    #[test]
    fn stats_average_rejects_other_kinds() {
        assert!(StatsAverage::from_descriptor(&base(RequestKind::AllPositions)).is_err());
    }

    #[test]
    fn inter_modality_composes_condition_chain() {
        let template = InterModality::from_descriptor(&loaded(RequestKind::InterModalityTime)).unwrap();
        assert_eq!(template.axis(), AggregationType::Time);
        let sql = template.compose().build().sql;
        assert!(sql.starts_with("source_app = $1 AND company_code = $2 AND company_trip_type = $3"));
        assert!(!sql.contains(';'));
        assert!(!sql.contains(" type = "));
        assert!(!sql.contains("mode = "));
    }

    #[test]
    fn every_kind_reports_its_own_kind() {
        let d = loaded(RequestKind::StatsAvgTime);
        assert_eq!(StatsAverage::from_descriptor(&d).unwrap().kind(), RequestKind::StatsAvgTime);
        let d = base(RequestKind::InterModalitySpace);
        assert_eq!(
            InterModality::from_descriptor(&d).unwrap().kind(),
            RequestKind::InterModalitySpace
        );
    }
}
