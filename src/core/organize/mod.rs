//! Date/location organization.
//!
//! [`MovePlanner`] turns classified records into a collision-free plan;
//! [`MoveExecutor`] applies or simulates it.

mod destination;
mod executor;
mod planner;
mod types;

pub use destination::{normalize_path, same_location, suffixed_file_name, DestinationAllocator};
pub use executor::MoveExecutor;
pub use planner::{MovePlanner, PlanDecision};
pub use types::*;
