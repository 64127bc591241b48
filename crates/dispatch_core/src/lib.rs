pub mod clock;
pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
pub mod grid;
pub mod lifecycle;
pub mod matching;
pub mod motion;
pub mod runner;
pub mod scenario;
pub mod simulation;
pub mod spawner;
pub mod systems;
pub mod telemetry;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use config::DispatchConfig;
pub use error::DispatchError;
pub use simulation::DispatchSimulation;
