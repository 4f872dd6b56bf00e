//! Runs a composed extraction against storage and shapes the response.

use anonymizer_core::{AggregationType, AnonymizerError, AnonymizerResult, RequestKind, Resource};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use crate::extraction::rows::{AverageRow, MobilityRow, PositionRow, TrackCountRow};
use crate::extraction::{BoundQuery, ComposedQuery};
use crate::reshape::{fold_journey_entries, fold_partial_mobility, JourneyEntry, PartialMobilityRecord};
use crate::statistics::{StatisticsAggregator, StatisticsBucket};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extraction {
    PartialMobility(Vec<PartialMobilityRecord>),
    CompleteMobility(Vec<JourneyEntry<MobilityRow>>),
    AllPositions(Vec<JourneyEntry<PositionRow>>),
    TrackCounts(Vec<TrackCountRow>),
    Averages(Vec<AverageRow>),
    Statistics([StatisticsBucket; 3]),
}

impl Extraction {
    pub fn len(&self) -> usize {
        match self {
            Self::PartialMobility(rows) => rows.len(),
            Self::CompleteMobility(rows) => rows.len(),
            Self::AllPositions(rows) => rows.len(),
            Self::TrackCounts(rows) => rows.len(),
            Self::Averages(rows) => rows.len(),
            Self::Statistics(buckets) => buckets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetch every row of `query`; no rows is `NotFound`.
async fn fetch_rows<R>(pool: &PgPool, query: &BoundQuery) -> AnonymizerResult<Vec<R>>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let rows = query
        .query_as::<R>()
        .fetch_all(pool)
        .await
        .map_err(AnonymizerError::storage_at(Resource::User, &query.sql))?;

    if rows.is_empty() {
        return Err(AnonymizerError::NotFound {
            resource: Resource::User,
        });
    }
    Ok(rows)
}

/// Execute `composed` and shape its result for the request kind.
pub async fn extract_user(pool: &PgPool, composed: &ComposedQuery) -> AnonymizerResult<Extraction> {
    let kind = composed.kind;
    let query = composed.bound();

    let extraction = match kind {
        RequestKind::PartialMobility => {
            Extraction::PartialMobility(fold_partial_mobility(fetch_rows(pool, &query).await?))
        }
        RequestKind::CompleteMobility => Extraction::CompleteMobility(fold_journey_entries(
            fetch_rows::<MobilityRow>(pool, &query).await?,
        )),
        RequestKind::AllPositions => Extraction::AllPositions(fold_journey_entries(
            fetch_rows::<PositionRow>(pool, &query).await?,
        )),
        RequestKind::StatsNumTracks => Extraction::TrackCounts(fetch_rows(pool, &query).await?),
        RequestKind::StatsAvgSpace | RequestKind::StatsAvgTime => {
            Extraction::Averages(fetch_rows(pool, &query).await?)
        }
        RequestKind::InterModalitySpace => Extraction::Statistics(
            StatisticsAggregator::extract_with_pool(pool, AggregationType::Space, &composed.statement)
                .await?,
        ),
        RequestKind::InterModalityTime => Extraction::Statistics(
            StatisticsAggregator::extract_with_pool(pool, AggregationType::Time, &composed.statement)
                .await?,
        ),
    };

    tracing::info!(request = %kind, records = extraction.len(), "Extraction complete");
    Ok(extraction)
}
