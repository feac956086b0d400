pub mod aggregate;
pub mod config;
pub mod job;
pub mod metrics_push;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, Pipeline};
