#![deny(unreachable_pub)]
pub mod api;
pub mod config;
mod errors;
pub mod filters;
pub mod metrics;
pub mod runner;

pub use errors::{FilterError, FilterResult};
pub use filters::{
    ChangeOutcome, FilterHandle, FilterSnapshot, FilterState, FilterStateManager, QueryParams,
};
pub use metrics::{DerivedMetrics, RawMetrics};
