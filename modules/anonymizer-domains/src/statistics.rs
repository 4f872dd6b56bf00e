//! Inter-modality statistics: three fixed journey buckets per axis, each with
//! the average segment count per journey and the per-type share of segments.

use anonymizer_core::{AggregationType, AnonymizerError, AnonymizerResult, Resource};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::extraction::sql::{BoundQuery, SqlFragment};

/// Label and `user_data` predicate of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRange {
    pub label: &'static str,
    pub predicate: &'static str,
}

// The middle space bound is reversed; Postgres evaluates it as always false.
const SPACE_BUCKETS: [BucketRange; 3] = [
    BucketRange {
        label: "< 5 Km",
        predicate: "distance < 5000",
    },
    BucketRange {
        label: "5 Km - 10 Km",
        predicate: "distance BETWEEN 10000 AND 5000",
    },
    BucketRange {
        label: "> 10 Km",
        predicate: "distance > 10000",
    },
];

const TIME_BUCKETS: [BucketRange; 3] = [
    BucketRange {
        label: "< 15 min",
        predicate: "elapsed_time::interval < '15 minutes'::interval",
    },
    BucketRange {
        label: "15 - 30 min",
        predicate: "elapsed_time::interval <= '30 minutes'::interval AND elapsed_time::interval >= '15 minutes'::interval",
    },
    BucketRange {
        label: "> 30 min",
        predicate: "elapsed_time::interval > '30 minutes'::interval",
    },
];

pub fn bucket_ranges(axis: AggregationType) -> &'static [BucketRange; 3] {
    match axis {
        AggregationType::Space => &SPACE_BUCKETS,
        AggregationType::Time => &TIME_BUCKETS,
    }
}

/// Serialized as `{"distance": label}` or `{"time": label}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketLabel {
    Distance(&'static str),
    Time(&'static str),
}

impl BucketLabel {
    fn new(axis: AggregationType, label: &'static str) -> Self {
        match axis {
            AggregationType::Space => Self::Distance(label),
            AggregationType::Time => Self::Time(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TypeShare {
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub mobility_type: String,
    pub perc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsBucket {
    #[serde(flatten)]
    pub label: BucketLabel,
    pub mob_type_per_journey: f64,
    pub mob_type: Vec<TypeShare>,
}

/// Average and total segments per journey within one bucket. Both are null
/// when the bucket holds no journey.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct BucketTotals {
    pub average: Option<f64>,
    pub total: Option<i64>,
}

/// Storage seam for the aggregator's two statement shapes.
#[async_trait]
pub trait StatisticsStore: Send {
    async fn bucket_totals(&mut self, query: &BoundQuery) -> Result<BucketTotals, sqlx::Error>;

    async fn type_shares(&mut self, query: &BoundQuery) -> Result<Vec<TypeShare>, sqlx::Error>;
}

#[async_trait]
impl StatisticsStore for PgConnection {
    async fn bucket_totals(&mut self, query: &BoundQuery) -> Result<BucketTotals, sqlx::Error> {
        query.query_as::<BucketTotals>().fetch_one(&mut *self).await
    }

    async fn type_shares(&mut self, query: &BoundQuery) -> Result<Vec<TypeShare>, sqlx::Error> {
        query.query_as::<TypeShare>().fetch_all(&mut *self).await
    }
}

fn journeys_in_bucket(range: &BucketRange, conditions: &SqlFragment) -> SqlFragment {
    let mut sql = SqlFragment::new();
    sql.push(r#"FROM "user_behaviours", (SELECT journey_id AS x FROM "user_data" WHERE "#)
        .push(range.predicate)
        .push(" AND ")
        .append(conditions)
        .push(") AS nested WHERE journey_id = nested.x");
    sql
}

pub fn totals_query(range: &BucketRange, conditions: &SqlFragment) -> BoundQuery {
    let mut sql = SqlFragment::new();
    sql.push("SELECT avg(aggregated.n_mobility_type)::float8 AS average, sum(aggregated.n_mobility_type)::bigint AS total FROM (SELECT count(journey_id) AS n_mobility_type ")
        .append(&journeys_in_bucket(range, conditions))
        .push(" GROUP BY journey_id) AS aggregated;");
    sql.build()
}

pub fn shares_query(range: &BucketRange, conditions: &SqlFragment, total: i64) -> BoundQuery {
    let mut sql = SqlFragment::new();
    sql.push("SELECT DISTINCT(aggregated.type) AS type, (sum(aggregated.n_mobility_type) * 100 / ")
        .push_bind(total)
        .push(")::float8 AS perc FROM (SELECT count(journey_id) AS n_mobility_type, type ")
        .append(&journeys_in_bucket(range, conditions))
        .push(" GROUP BY type) AS aggregated GROUP BY aggregated.type ORDER BY aggregated.type;");
    sql.build()
}

pub struct StatisticsAggregator;

impl StatisticsAggregator {
    /// Run the bucket statements on `store` and assemble the three buckets in
    /// fixed order. Empty buckets report zero and no shares. A failing
    /// statement is logged with its SQL.
    pub async fn extract<S>(
        store: &mut S,
        axis: AggregationType,
        conditions: &SqlFragment,
    ) -> AnonymizerResult<[StatisticsBucket; 3]>
    where
        S: StatisticsStore + ?Sized,
    {
        let [first, second, third] = bucket_ranges(axis);
        Ok([
            Self::fill_bucket(store, axis, first, conditions).await?,
            Self::fill_bucket(store, axis, second, conditions).await?,
            Self::fill_bucket(store, axis, third, conditions).await?,
        ])
    }

    async fn fill_bucket<S>(
        store: &mut S,
        axis: AggregationType,
        range: &BucketRange,
        conditions: &SqlFragment,
    ) -> AnonymizerResult<StatisticsBucket>
    where
        S: StatisticsStore + ?Sized,
    {
        let label = BucketLabel::new(axis, range.label);
        let totals_sql = totals_query(range, conditions);
        let totals = store
            .bucket_totals(&totals_sql)
            .await
            .map_err(AnonymizerError::storage_at(Resource::User, &totals_sql.sql))?;
        let Some(total) = totals.total.filter(|t| *t > 0) else {
            return Ok(StatisticsBucket {
                label,
                mob_type_per_journey: 0.0,
                mob_type: Vec::new(),
            });
        };

        let shares_sql = shares_query(range, conditions, total);
        let shares = store
            .type_shares(&shares_sql)
            .await
            .map_err(AnonymizerError::storage_at(Resource::User, &shares_sql.sql))?;
        Ok(StatisticsBucket {
            label,
            mob_type_per_journey: totals.average.unwrap_or(0.0),
            mob_type: shares,
        })
    }

    /// Same as [`extract`](Self::extract) on one pooled connection held for
    /// every statement of the request.
    pub async fn extract_with_pool(
        pool: &PgPool,
        axis: AggregationType,
        conditions: &SqlFragment,
    ) -> AnonymizerResult<[StatisticsBucket; 3]> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(AnonymizerError::storage(Resource::User))?;

        let buckets = Self::extract(&mut *conn, axis, conditions).await?;
        tracing::debug!(axis = %axis, "Statistics buckets assembled");
        Ok(buckets)
    }
}
