pub mod extract;
pub mod extraction;
pub mod feeds;
pub mod geo;
pub mod reshape;
pub mod statistics;

pub use extract::{extract_user, Extraction};
pub use extraction::{ComposedQuery, QueryBuilder, RequestDescriptor};
pub use feeds::{IotInput, IotLookup, IotObservation, UserFeed};
pub use statistics::{StatisticsAggregator, StatisticsBucket, StatisticsStore};
