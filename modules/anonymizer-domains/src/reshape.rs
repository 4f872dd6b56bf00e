//! Folds flat joined rows back into per-journey records.

use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::extraction::rows::{MobilityRow, PositionRow};

/// A row that carries a journey identifier the folds can rewrite.
pub trait JourneyRow {
    fn journey_id(&self) -> &str;
    fn set_journey_id(&mut self, id: String);
}

impl JourneyRow for MobilityRow {
    fn journey_id(&self) -> &str {
        &self.journey_id
    }

    fn set_journey_id(&mut self, id: String) {
        self.journey_id = id;
    }
}

impl JourneyRow for PositionRow {
    fn journey_id(&self) -> &str {
        &self.journey_id
    }

    fn set_journey_id(&mut self, id: String) {
        self.journey_id = id;
    }
}

/// Partial-mobility record: journey scalars of the first row of a run plus
/// the segment types of every row in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialMobilityRecord {
    pub journey_id: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub mode: String,
    pub start_time: i64,
    pub end_time: i64,
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub meters: i32,
}

impl From<MobilityRow> for PartialMobilityRecord {
    fn from(row: MobilityRow) -> Self {
        Self {
            journey_id: row.journey_id,
            types: vec![row.mobility_type],
            mode: row.mode,
            start_time: row.start_time,
            end_time: row.end_time,
            start_lat: row.start_lat,
            start_lon: row.start_lon,
            end_lat: row.end_lat,
            end_lon: row.end_lon,
            meters: row.meters,
        }
    }
}

/// Merge runs of adjacent rows sharing a journey id. Non-adjacent rows of the
/// same journey start a new record.
pub fn fold_partial_mobility(rows: Vec<MobilityRow>) -> Vec<PartialMobilityRecord> {
    let mut records: Vec<PartialMobilityRecord> = Vec::new();
    for row in rows {
        match records.last_mut() {
            Some(last) if last.journey_id == row.journey_id => {
                last.types.push(row.mobility_type);
            }
            _ => records.push(row.into()),
        }
    }
    records
}

/// A row under a freshly generated entry id. Only the row is serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyEntry<R> {
    #[serde(skip)]
    pub entry_id: Uuid,
    #[serde(flatten)]
    pub row: R,
}

/// Give every row its own entry id and replace journey ids with generated
/// ones. The first row of a journey takes its own entry id as journey id;
/// later rows of the same journey take that first entry id.
pub fn fold_journey_entries<R: JourneyRow>(rows: Vec<R>) -> Vec<JourneyEntry<R>> {
    let mut assigned: HashMap<String, Uuid> = HashMap::new();
    let mut entries = Vec::with_capacity(rows.len());

    for mut row in rows {
        let entry_id = Uuid::new_v4();
        match assigned.get(row.journey_id()) {
            Some(first) => row.set_journey_id(first.to_string()),
            None => {
                assigned.insert(row.journey_id().to_string(), entry_id);
                row.set_journey_id(entry_id.to_string());
            }
        }
        entries.push(JourneyEntry { entry_id, row });
    }

    entries
}
