//! Run configuration, validated once at startup and immutable afterwards.
//!
//! Anything invalid in here is fatal: it is reported before
//! a single vote request is generated.

mod duration;
mod error;
mod params;
mod scenario;

pub use self::{
    duration::parse_duration,
    error::ConfigError,
    params::{RunParameters, parse_participante_ids},
    scenario::ScenarioConfig,
};
