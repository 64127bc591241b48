use std::collections::VecDeque;
use std::fmt;

use bevy_ecs::prelude::{Component, Resource};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::grid::GridPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxiId(pub u32);

impl fmt::Display for TaxiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "taxi-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PassengerId(pub u64);

impl fmt::Display for PassengerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "passenger-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxiState {
    Idle,
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct Taxi {
    pub id: TaxiId,
    pub state: TaxiState,
    pub capacity: u32,
    pub current_load: u32,
    /// Pickup while in Pickup, dropoff while in Dropoff, `None` while idle.
    pub target: Option<GridPosition>,
    /// Passenger being served; set on assignment, cleared on dropoff.
    pub assigned_passenger: Option<PassengerId>,
}

impl Taxi {
    pub fn new(id: TaxiId, capacity: u32) -> Self {
        Self {
            id,
            state: TaxiState::Idle,
            capacity,
            current_load: 0,
            target: None,
            assigned_passenger: None,
        }
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.current_load)
    }

    pub fn is_idle(&self) -> bool {
        self.state == TaxiState::Idle
    }
}

/// Logical lattice position of a taxi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Position(pub GridPosition);

/// Remaining nodes to the current target, excluding the node the taxi stands on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Component)]
pub struct Route {
    nodes: VecDeque<GridPosition>,
}

impl Route {
    /// Replaces the route with `path`, dropping its first node (the current position).
    pub fn replace(&mut self, path: Vec<GridPosition>) {
        self.nodes = path.into_iter().skip(1).collect();
    }

    pub fn next_node(&mut self) -> Option<GridPosition> {
        self.nodes.pop_front()
    }

    pub fn peek(&self) -> Option<GridPosition> {
        self.nodes.front().copied()
    }

    pub fn remaining(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GridPosition> {
        self.nodes.iter()
    }
}

/// Random-walk memory for idle taxis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Component)]
pub struct Patrol {
    pub previous: Option<GridPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerableCategory {
    Disabled,
    Elderly,
    Pregnant,
    Child,
}

impl VulnerableCategory {
    pub const ALL: [VulnerableCategory; 4] = [
        VulnerableCategory::Disabled,
        VulnerableCategory::Elderly,
        VulnerableCategory::Pregnant,
        VulnerableCategory::Child,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "taxi", rename_all = "snake_case")]
pub enum PassengerStatus {
    Waiting,
    Assigned(TaxiId),
    Riding(TaxiId),
}

#[derive(Debug, Clone, PartialEq, Component)]
pub struct Passenger {
    pub id: PassengerId,
    pub pickup: GridPosition,
    pub dropoff: GridPosition,
    /// Accrues while waiting, frozen once a taxi is assigned.
    pub wait_time_ms: u64,
    pub vulnerable: Option<VulnerableCategory>,
    pub search_radius_multiplier: f64,
    /// Riders travelling together; all board and alight at once.
    pub party_size: u32,
    pub status: PassengerStatus,
    /// Simulation time the passenger appeared.
    pub spawned_at: u64,
    /// Simulation time a taxi was assigned.
    pub matched_at: Option<u64>,
    /// Simulation time the assigned taxi reached the pickup.
    pub picked_up_at: Option<u64>,
}

impl Passenger {
    pub fn new(
        id: PassengerId,
        pickup: GridPosition,
        dropoff: GridPosition,
        vulnerable: Option<VulnerableCategory>,
        spawned_at: u64,
    ) -> Self {
        Self {
            id,
            pickup,
            dropoff,
            wait_time_ms: 0,
            vulnerable,
            search_radius_multiplier: 1.0,
            party_size: 1,
            status: PassengerStatus::Waiting,
            spawned_at,
            matched_at: None,
            picked_up_at: None,
        }
    }

    pub fn with_party_size(mut self, party_size: u32) -> Self {
        self.party_size = party_size;
        self
    }

    pub fn is_waiting(&self) -> bool {
        self.status == PassengerStatus::Waiting
    }

    pub fn is_vulnerable(&self) -> bool {
        self.vulnerable.is_some()
    }

    pub fn wait_time_secs(&self) -> f64 {
        self.wait_time_ms as f64 / 1000.0
    }

    pub fn trip_distance(&self) -> u32 {
        self.pickup.manhattan(self.dropoff)
    }
}

/// Monotonic id source for taxis and passengers.
#[derive(Debug, Default, Resource)]
pub struct EntityIds {
    next_taxi: u32,
    next_passenger: u64,
}

impl EntityIds {
    pub fn next_taxi(&mut self) -> TaxiId {
        let id = TaxiId(self.next_taxi);
        self.next_taxi += 1;
        id
    }

    pub fn next_passenger(&mut self) -> PassengerId {
        let id = PassengerId(self.next_passenger);
        self.next_passenger += 1;
        id
    }
}

/// Seeded RNG shared by spawning, patrol and random taxi placement.
#[derive(Debug, Resource)]
pub struct DispatchRng(pub StdRng);

impl DispatchRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_replace_skips_current_node() {
        let mut route = Route::default();
        route.replace(vec![
            GridPosition::new(0, 0),
            GridPosition::new(1, 0),
            GridPosition::new(1, 1),
        ]);
        assert_eq!(route.remaining(), 2);
        assert_eq!(route.next_node(), Some(GridPosition::new(1, 0)));
        assert_eq!(route.peek(), Some(GridPosition::new(1, 1)));
    }

    #[test]
    fn ids_are_monotonic_per_kind() {
        let mut ids = EntityIds::default();
        assert_eq!(ids.next_taxi(), TaxiId(0));
        assert_eq!(ids.next_taxi(), TaxiId(1));
        assert_eq!(ids.next_passenger(), PassengerId(0));
        assert_eq!(ids.next_taxi(), TaxiId(2));
    }

    #[test]
    fn new_passenger_is_waiting_with_unit_multiplier() {
        let passenger = Passenger::new(
            PassengerId(3),
            GridPosition::new(0, 0),
            GridPosition::new(2, 2),
            None,
            500,
        );
        assert!(passenger.is_waiting());
        assert!(!passenger.is_vulnerable());
        assert_eq!(passenger.search_radius_multiplier, 1.0);
        assert_eq!(passenger.party_size, 1);
        assert_eq!(passenger.trip_distance(), 4);
    }
}
