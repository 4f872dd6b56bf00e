pub mod iot;
pub mod user;

pub use iot::{IotInput, IotLookup, IotObservation};
pub use user::{Behaviour, BehaviourSegment, SensorSample, TracePosition, UserFeed};
