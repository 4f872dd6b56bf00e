//! Optional filter pieces shared by the extraction templates.
//!
//! Each fragment validates its own input fields and, once built, writes at
//! most one predicate. Coupled fields must be supplied together or not at all.

use anonymizer_core::{
    AggregationType, DetectionType, FieldViolation, MobilityType, TripType, Violations,
};

use super::descriptor::RequestDescriptor;
use super::sql::SqlFragment;
use crate::geo::BoundingBox;

/// Something that renders as a single SQL boolean expression.
pub trait Predicate {
    fn write(&self, sql: &mut SqlFragment);
}

/// `Ok(true)` when every field is present, `Ok(false)` when none is.
fn coupled(fields: &[&str], present: &[bool]) -> Result<bool, FieldViolation> {
    let count = present.iter().filter(|p| **p).count();
    if count == 0 {
        Ok(false)
    } else if count == present.len() {
        Ok(true)
    } else {
        Err(FieldViolation::new(fields, "must be provided together"))
    }
}

/// Which end of a journey a time or coordinate filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

impl Endpoint {
    fn date_column(&self) -> &'static str {
        match self {
            Self::Start => "start_date",
            Self::End => "end_date",
        }
    }

    fn lat_column(&self) -> &'static str {
        match self {
            Self::Start => "start_lat",
            Self::End => "end_lat",
        }
    }

    fn lon_column(&self) -> &'static str {
        match self {
            Self::Start => "start_lon",
            Self::End => "end_lon",
        }
    }

    fn time_fields(&self) -> [&'static str; 2] {
        match self {
            Self::Start => ["start_time", "start_time_high_threshold"],
            Self::End => ["end_time", "end_time_high_threshold"],
        }
    }

    fn area_fields(&self) -> [&'static str; 3] {
        match self {
            Self::Start => ["start_lat", "start_lon", "start_radius"],
            Self::End => ["end_lat", "end_lon", "end_radius"],
        }
    }
}

/// Accepted and validated, never rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    pub low: String,
    pub high: String,
}

impl TimeWindow {
    pub fn from_descriptor(d: &RequestDescriptor) -> Result<Option<Self>, FieldViolation> {
        match (&d.time_window_low, &d.time_window_high) {
            (Some(low), Some(high)) => Ok(Some(Self {
                low: low.clone(),
                high: high.clone(),
            })),
            (None, None) => Ok(None),
            _ => Err(FieldViolation::new(
                &["time_window_low", "time_window_high"],
                "must be provided together",
            )),
        }
    }
}

/// `<endpoint>_date BETWEEN value AND value + threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRange {
    endpoint: Endpoint,
    low: i64,
    high: i64,
}

impl TimeRange {
    pub fn from_descriptor(
        d: &RequestDescriptor,
        endpoint: Endpoint,
    ) -> Result<Option<Self>, FieldViolation> {
        let (value, threshold) = match endpoint {
            Endpoint::Start => (d.start_time, d.start_time_high_threshold),
            Endpoint::End => (d.end_time, d.end_time_high_threshold),
        };
        let fields = endpoint.time_fields();
        match (value, threshold) {
            (Some(low), Some(threshold)) => {
                let high = low
                    .checked_add(threshold)
                    .ok_or_else(|| FieldViolation::new(&fields, "time range overflows"))?;
                Ok(Some(Self {
                    endpoint,
                    low,
                    high,
                }))
            }
            (None, None) => Ok(None),
            _ => Err(FieldViolation::new(&fields, "must be provided together")),
        }
    }
}

impl Predicate for TimeRange {
    fn write(&self, sql: &mut SqlFragment) {
        sql.push(format!("{} BETWEEN ", self.endpoint.date_column()))
            .push_bind(self.low)
            .push(" AND ")
            .push_bind(self.high);
    }
}

/// Bounding box around a journey endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateArea {
    endpoint: Endpoint,
    bbox: BoundingBox,
}

impl CoordinateArea {
    pub fn from_descriptor(
        d: &RequestDescriptor,
        endpoint: Endpoint,
    ) -> Result<Option<Self>, FieldViolation> {
        let (lat, lon, radius) = match endpoint {
            Endpoint::Start => (d.start_lat, d.start_lon, d.start_radius),
            Endpoint::End => (d.end_lat, d.end_lon, d.end_radius),
        };
        let fields = endpoint.area_fields();
        if !coupled(&fields, &[lat.is_some(), lon.is_some(), radius.is_some()])? {
            return Ok(None);
        }
        let (Some(lat), Some(lon), Some(radius)) = (lat, lon, radius) else {
            return Ok(None);
        };
        let bbox = BoundingBox::around(lat, lon, radius)
            .map_err(|e| FieldViolation::new(&fields, e.to_string()))?;
        Ok(Some(Self { endpoint, bbox }))
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }
}

impl Predicate for CoordinateArea {
    fn write(&self, sql: &mut SqlFragment) {
        sql.push(format!("{} BETWEEN ", self.endpoint.lat_column()))
            .push_bind(self.bbox.lat_min)
            .push(" AND ")
            .push_bind(self.bbox.lat_max)
            .push(format!(" AND {} BETWEEN ", self.endpoint.lon_column()))
            .push_bind(self.bbox.lon_min)
            .push(" AND ")
            .push_bind(self.bbox.lon_max);
    }
}

/// Company scope. Always rendered; `source_app` prefixes it for the
/// kinds that read journeys of a single app.
#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    source_app: Option<String>,
    code: String,
    trip_type: TripType,
}

impl Company {
    pub fn from_descriptor(d: &RequestDescriptor) -> Self {
        Self {
            source_app: d
                .request
                .scopes_source_app()
                .then(|| d.source_app.clone()),
            code: d.company_code.clone(),
            trip_type: d.company_trip_type,
        }
    }
}

impl Predicate for Company {
    fn write(&self, sql: &mut SqlFragment) {
        if let Some(app) = &self.source_app {
            sql.push("source_app = ").push_bind(app.as_str()).push(" AND ");
        }
        sql.push("company_code = ").push_bind(self.code.as_str());
        if self.trip_type != TripType::Any {
            sql.push(" AND company_trip_type = ")
                .push_bind(self.trip_type.as_str());
        }
    }
}

/// How a detection filter reaches the behaviour `mode` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionTarget {
    /// The statement already reads `user_behaviours`
    Column(&'static str),
    /// The statement reads `user_data` only
    BehaviourSubquery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFilter {
    detection: DetectionType,
    target: DetectionTarget,
}

impl DetectionFilter {
    pub fn new(detection: DetectionType, target: DetectionTarget) -> Self {
        Self { detection, target }
    }

    pub fn from_descriptor(d: &RequestDescriptor, target: DetectionTarget) -> Option<Self> {
        d.type_detection.map(|detection| Self::new(detection, target))
    }
}

impl Predicate for DetectionFilter {
    fn write(&self, sql: &mut SqlFragment) {
        match self.target {
            DetectionTarget::Column(column) => {
                sql.push(format!("{column} = "));
            }
            DetectionTarget::BehaviourSubquery => {
                sql.push(r#"journey_id IN (SELECT journey_id FROM "user_behaviours" WHERE mode = "#);
            }
        }
        sql.push_bind(self.detection.behaviour_mode());
        if self.target == DetectionTarget::BehaviourSubquery {
            sql.push(")");
        }
    }
}

/// Mobility type equality against a behaviour or journey-level column.
#[derive(Debug, Clone, PartialEq)]
pub struct MobilityFilter {
    mobility: MobilityType,
    column: &'static str,
}

impl MobilityFilter {
    pub fn new(mobility: MobilityType, column: &'static str) -> Self {
        Self { mobility, column }
    }

    pub fn from_descriptor(d: &RequestDescriptor, column: &'static str) -> Option<Self> {
        d.type_mobility.map(|mobility| Self::new(mobility, column))
    }

    /// `type_mobility` and `type_aggregation` as a coupled pair.
    pub fn coupled_with_aggregation(
        d: &RequestDescriptor,
        column: &'static str,
    ) -> Result<Option<Self>, FieldViolation> {
        match (d.type_mobility, d.type_aggregation) {
            (Some(mobility), Some(_)) => Ok(Some(Self::new(mobility, column))),
            (None, None) => Ok(None),
            _ => Err(FieldViolation::new(
                &["type_mobility", "type_aggregation"],
                "must be provided together",
            )),
        }
    }
}

impl Predicate for MobilityFilter {
    fn write(&self, sql: &mut SqlFragment) {
        sql.push(format!("{} = ", self.column))
            .push_bind(self.mobility.as_str());
    }
}

/// `space_aggregation` / `time_aggregation` only make sense on their own axis.
pub fn check_aggregation_scope(d: &RequestDescriptor, violations: &mut Violations) {
    let axes = [
        (d.space_aggregation, AggregationType::Space, "space_aggregation"),
        (d.time_aggregation, AggregationType::Time, "time_aggregation"),
    ];
    for (value, axis, field) in axes {
        if value.is_some() && d.type_aggregation != Some(axis) {
            violations.push(FieldViolation::new(
                &[field, "type_aggregation"],
                format!("requires type_aggregation = {axis}"),
            ));
        }
    }
}

/// Journey-level filters read from `user_data`, in their fixed order:
/// company, start time, end time, start area, end area.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyFilters {
    pub time_window: Option<TimeWindow>,
    company: Company,
    start_time: Option<TimeRange>,
    end_time: Option<TimeRange>,
    start_area: Option<CoordinateArea>,
    end_area: Option<CoordinateArea>,
}

impl JourneyFilters {
    /// Fragments that fail validation are left out and recorded in `violations`.
    pub fn from_descriptor(d: &RequestDescriptor, violations: &mut Violations) -> Self {
        let time_window = violations.check(TimeWindow::from_descriptor(d)).flatten();
        let start_time = violations
            .check(TimeRange::from_descriptor(d, Endpoint::Start))
            .flatten();
        let end_time = violations
            .check(TimeRange::from_descriptor(d, Endpoint::End))
            .flatten();
        let start_area = violations
            .check(CoordinateArea::from_descriptor(d, Endpoint::Start))
            .flatten();
        let end_area = violations
            .check(CoordinateArea::from_descriptor(d, Endpoint::End))
            .flatten();
        check_aggregation_scope(d, violations);

        Self {
            time_window,
            company: Company::from_descriptor(d),
            start_time,
            end_time,
            start_area,
            end_area,
        }
    }
}

impl Predicate for JourneyFilters {
    fn write(&self, sql: &mut SqlFragment) {
        self.company.write(sql);
        let rest: [Option<&dyn Predicate>; 4] = [
            self.start_time.as_ref().map(|p| p as &dyn Predicate),
            self.end_time.as_ref().map(|p| p as &dyn Predicate),
            self.start_area.as_ref().map(|p| p as &dyn Predicate),
            self.end_area.as_ref().map(|p| p as &dyn Predicate),
        ];
        for predicate in rest.into_iter().flatten() {
            sql.push(" AND ");
            predicate.write(sql);
        }
    }
}

/// Append ` AND <predicate>` for every present filter, in order.
pub fn write_tail(sql: &mut SqlFragment, filters: &[Option<&dyn Predicate>]) {
    for predicate in filters.iter().flatten() {
        sql.push(" AND ");
        predicate.write(sql);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::sql::SqlArg;
    use anonymizer_core::RequestKind;

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::new(RequestKind::PartialMobility, "travis").with_company("ACME", TripType::Any)
    }

    fn render(predicate: &dyn Predicate) -> String {
        let mut sql = SqlFragment::new();
        predicate.write(&mut sql);
        sql.build().sql
    }

    #[test]
    fn time_pair_must_be_complete() {
        for (value, threshold) in [(Some(10), None), (None, Some(10))] {
            let mut d = descriptor();
            d.start_time = value;
            d.start_time_high_threshold = threshold;
            let err = TimeRange::from_descriptor(&d, Endpoint::Start).unwrap_err();
            assert_eq!(err.fields, vec!["start_time", "start_time_high_threshold"]);
        }
        assert_eq!(TimeRange::from_descriptor(&descriptor(), Endpoint::Start), Ok(None));
    }

    #[test]
    fn time_range_adds_threshold() {
        let d = descriptor().with_end_time(1_000, 500);
        let range = TimeRange::from_descriptor(&d, Endpoint::End).unwrap().unwrap();
        let mut sql = SqlFragment::new();
        range.write(&mut sql);
        let bound = sql.build();
        assert_eq!(bound.sql, "end_date BETWEEN $1 AND $2");
        assert_eq!(bound.args, vec![SqlArg::BigInt(1_000), SqlArg::BigInt(1_500)]);
    }

    #[test]
    fn time_range_overflow_is_a_violation() {
        let d = descriptor().with_start_time(i64::MAX, 1);
        let err = TimeRange::from_descriptor(&d, Endpoint::Start).unwrap_err();
        assert_eq!(err.message, "time range overflows");
    }

    #[test]
    fn coordinate_triple_must_be_complete() {
        let partials = [
            (Some(45.0), None, None),
            (None, Some(7.0), None),
            (None, None, Some(500.0)),
            (Some(45.0), Some(7.0), None),
            (Some(45.0), None, Some(500.0)),
            (None, Some(7.0), Some(500.0)),
        ];
        for (lat, lon, radius) in partials {
            let mut d = descriptor();
            d.end_lat = lat;
            d.end_lon = lon;
            d.end_radius = radius;
            let err = CoordinateArea::from_descriptor(&d, Endpoint::End).unwrap_err();
            assert_eq!(err.fields, vec!["end_lat", "end_lon", "end_radius"]);
        }
    }

    #[test]
    fn coordinate_radius_below_minimum_fails() {
        let d = descriptor().with_start_area(45.0, 7.0, 50.0);
        assert!(CoordinateArea::from_descriptor(&d, Endpoint::Start).is_err());
    }

    #[test]
    fn coordinate_area_renders_bracketing_box() {
        let d = descriptor().with_start_area(45.07, 7.68, 500.0);
        let area = CoordinateArea::from_descriptor(&d, Endpoint::Start)
            .unwrap()
            .unwrap();
        assert!(area.bbox().contains(45.07, 7.68));
        assert_eq!(
            render(&area),
            "start_lat BETWEEN $1 AND $2 AND start_lon BETWEEN $3 AND $4"
        );
    }

    #[test]
    fn time_window_pair_is_validated() {
        let mut d = descriptor();
        d.time_window_low = Some("08:00".into());
        assert!(TimeWindow::from_descriptor(&d).is_err());
        d.time_window_high = Some("10:00".into());
        assert!(TimeWindow::from_descriptor(&d).unwrap().is_some());
    }

    #[test]
    fn company_adds_trip_type_only_when_set() {
        let d = descriptor();
        assert_eq!(render(&Company::from_descriptor(&d)), "company_code = $1");

        let d = descriptor().with_company("ACME", TripType::BusinessTrip);
        let company = Company::from_descriptor(&d);
        let mut sql = SqlFragment::new();
        company.write(&mut sql);
        let bound = sql.build();
        assert_eq!(bound.sql, "company_code = $1 AND company_trip_type = $2");
        assert_eq!(bound.args[1], SqlArg::from("business trip"));
    }

    #[test]
    fn company_is_scoped_by_source_app_for_journey_statistics() {
        let mut d = descriptor();
        d.request = RequestKind::StatsNumTracks;
        let company = Company::from_descriptor(&d);
        let mut sql = SqlFragment::new();
        company.write(&mut sql);
        let bound = sql.build();
        assert_eq!(bound.sql, "source_app = $1 AND company_code = $2");
        assert_eq!(bound.args[0], SqlArg::from("travis"));
    }

    #[test]
    fn detection_renders_per_target() {
        let column = DetectionFilter::new(DetectionType::User, DetectionTarget::Column("mode"));
        assert_eq!(render(&column), "mode = $1");

        let subquery = DetectionFilter::new(DetectionType::App, DetectionTarget::BehaviourSubquery);
        assert_eq!(
            render(&subquery),
            r#"journey_id IN (SELECT journey_id FROM "user_behaviours" WHERE mode = $1)"#
        );
    }

    #[test]
    fn mobility_and_aggregation_are_coupled() {
        let d = descriptor().with_mobility(MobilityType::Walk);
        assert!(MobilityFilter::coupled_with_aggregation(&d, "type").is_err());

        let d = descriptor().with_aggregation(AggregationType::Space);
        assert!(MobilityFilter::coupled_with_aggregation(&d, "type").is_err());

        let d = descriptor()
            .with_mobility(MobilityType::Walk)
            .with_aggregation(AggregationType::Space);
        let filter = MobilityFilter::coupled_with_aggregation(&d, "type")
            .unwrap()
            .unwrap();
        assert_eq!(render(&filter), "type = $1");

        assert_eq!(MobilityFilter::coupled_with_aggregation(&descriptor(), "type"), Ok(None));
    }

    #[test]
    fn aggregation_amount_needs_matching_axis() {
        let mut d = descriptor().with_aggregation(AggregationType::Time);
        d.space_aggregation = Some(5);
        let mut violations = Violations::new();
        check_aggregation_scope(&d, &mut violations);
        assert_eq!(violations.len(), 1);

        d.space_aggregation = None;
        d.time_aggregation = Some(5);
        let mut violations = Violations::new();
        check_aggregation_scope(&d, &mut violations);
        assert!(violations.is_empty());
    }

    #[test]
    fn journey_filters_follow_fixed_order() {
        let d = descriptor()
            .with_end_area(45.0, 7.0, 200.0)
            .with_start_area(45.1, 7.1, 200.0)
            .with_end_time(2_000, 10)
            .with_start_time(1_000, 10);
        let mut violations = Violations::new();
        let filters = JourneyFilters::from_descriptor(&d, &mut violations);
        assert!(violations.is_empty());

        let sql = render(&filters);
        let positions: Vec<usize> = ["company_code", "start_date", "end_date", "start_lat", "end_lat"]
            .iter()
            .map(|needle| sql.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{sql}");
    }

    #[test]
    fn journey_filters_report_all_violations() {
        let mut d = descriptor();
        d.start_time = Some(1);
        d.end_lat = Some(45.0);
        d.time_window_high = Some("10:00".into());
        let mut violations = Violations::new();
        JourneyFilters::from_descriptor(&d, &mut violations);
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn journey_filters_with_nothing_optional_is_company_only() {
        let mut violations = Violations::new();
        let filters = JourneyFilters::from_descriptor(&descriptor(), &mut violations);
        assert_eq!(render(&filters), "company_code = $1");
    }
}
