//! Execution engine for hvfiles
//!
//! The engine orchestrates:
//! 1. Planning - Refresh recorded resources and classify each key
//! 2. Diffing - Show what apply would change
//! 3. Executing - Apply changes in parallel and record the results

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute};
pub use planner::{Action, ExecutionPlan, plan};
