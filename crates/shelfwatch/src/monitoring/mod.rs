//! Monitoring core - turns observations into monitoring results
//!
//! This module is responsible for:
//! - Fetching product fields through an observation source
//! - Diffing each snapshot against the previous recorded result
//! - Classifying the outcome into a result status

pub mod classify;
pub mod diff;
pub mod executor;
pub mod source;
pub mod types;

pub use classify::classify;
pub use diff::compare;
pub use executor::MonitoringExecutor;
pub use source::{GatedSource, HumanGate, JsonEndpointSource, ObservationSource, StdinGate};
pub use types::{ChangeDescriptor, MonitoringResult, ResultStatus};
