//! Execution engine for schemactl
//!
//! The engine orchestrates:
//! 1. Planning - Build schema property resources from config
//! 2. Diffing - Compare the service's schema with the config
//! 3. Executing - Apply changes in parallel, serialised per user type

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute};
pub use planner::build_plan;
