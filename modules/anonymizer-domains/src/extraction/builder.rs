use anonymizer_core::{AggregationType, AnonymizerResult, RequestKind, Violations};

use super::descriptor::RequestDescriptor;
use super::sql::{BoundQuery, SqlFragment};
use super::templates::{
    AllPositions, CompleteMobility, InterModality, PartialMobility, QueryTemplate, StatsAverage,
    StatsNumTracks,
};

/// A validated request turned into SQL, tagged with its kind.
///
/// For the inter-modality kinds `statement` is the journey condition chain,
/// not a runnable statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub kind: RequestKind,
    pub statement: SqlFragment,
}

impl ComposedQuery {
    pub fn bound(&self) -> BoundQuery {
        self.statement.build()
    }

    pub fn statistics_axis(&self) -> Option<AggregationType> {
        self.kind.statistics_axis()
    }
}

pub struct QueryBuilder;

impl QueryBuilder {
    /// Validate `descriptor` and compose its query. Fails with
    /// `MalformedRequest` carrying every violation found.
    pub fn build(descriptor: &RequestDescriptor) -> AnonymizerResult<ComposedQuery> {
        let composed = match descriptor.request {
            RequestKind::PartialMobility => compose::<PartialMobility>(descriptor)?,
            RequestKind::CompleteMobility => compose::<CompleteMobility>(descriptor)?,
            RequestKind::AllPositions => compose::<AllPositions>(descriptor)?,
            RequestKind::StatsNumTracks => compose::<StatsNumTracks>(descriptor)?,
            RequestKind::StatsAvgSpace | RequestKind::StatsAvgTime => {
                compose::<StatsAverage>(descriptor)?
            }
            RequestKind::InterModalitySpace | RequestKind::InterModalityTime => {
                compose::<InterModality>(descriptor)?
            }
        };
        tracing::debug!(kind = %composed.kind, "Composed extraction query");
        Ok(composed)
    }
}

fn compose<T: QueryTemplate>(
    descriptor: &RequestDescriptor,
) -> Result<ComposedQuery, Violations> {
    let template = T::from_descriptor(descriptor)?;
    Ok(ComposedQuery {
        kind: template.kind(),
        statement: template.compose(),
    })
}
