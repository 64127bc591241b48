//! Scenario setup: world resources, starting fleet and initial passengers.

mod build;

pub use build::{build_scenario, spawn_passenger, spawn_request, spawn_taxi};
