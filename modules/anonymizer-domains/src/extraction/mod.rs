pub mod builder;
pub mod descriptor;
pub mod fragments;
pub mod rows;
pub mod sql;
pub mod templates;

pub use builder::{ComposedQuery, QueryBuilder};
pub use descriptor::RequestDescriptor;
pub use rows::{AverageRow, MobilityRow, PositionRow, TrackCountRow};
pub use sql::{BoundQuery, SqlArg, SqlFragment};
