//! Telemetry: completed trips, dispatch counters and read-only snapshots.

use bevy_ecs::prelude::{Resource, World};
use serde::{Deserialize, Serialize};

use crate::clock::SimulationClock;
use crate::ecs::{
    Passenger, PassengerId, PassengerStatus, Position, Taxi, TaxiId, TaxiState, VulnerableCategory,
};
use crate::events::OutboundEvents;
use crate::grid::{GridNetwork, GridPosition};

/// One completed trip, recorded when the taxi reaches the dropoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTripRecord {
    pub passenger: PassengerId,
    pub taxi: TaxiId,
    pub vulnerable: Option<VulnerableCategory>,
    pub party_size: u32,
    pub spawned_at: u64,
    pub matched_at: u64,
    pub picked_up_at: u64,
    pub dropped_off_at: u64,
    /// Accrued wait at the moment of assignment.
    pub wait_time_ms: u64,
    pub trip_distance: u32,
}

impl CompletedTripRecord {
    /// Time from spawn to assignment.
    pub fn time_to_match(&self) -> u64 {
        self.matched_at.saturating_sub(self.spawned_at)
    }

    /// Time from assignment to pickup.
    pub fn time_to_pickup(&self) -> u64 {
        self.picked_up_at.saturating_sub(self.matched_at)
    }

    /// Time on board.
    pub fn trip_duration(&self) -> u64 {
        self.dropped_off_at.saturating_sub(self.picked_up_at)
    }
}

#[derive(Debug, Default, Clone, Resource)]
pub struct DispatchTelemetry {
    pub completed_trips: Vec<CompletedTripRecord>,
    pub solver_runs: u64,
    pub fallback_runs: u64,
    pub assignments_applied: u64,
    pub assignments_aborted: u64,
    pub passengers_spawned: u64,
    pub spawns_skipped: u64,
}

impl DispatchTelemetry {
    pub fn mean_wait_ms(&self) -> Option<f64> {
        if self.completed_trips.is_empty() {
            return None;
        }
        let total: u64 = self.completed_trips.iter().map(|t| t.wait_time_ms).sum();
        Some(total as f64 / self.completed_trips.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxiSnapshot {
    pub id: TaxiId,
    pub position: GridPosition,
    pub world: (f64, f64),
    pub state: TaxiState,
    pub current_load: u32,
    pub capacity: u32,
    pub target: Option<GridPosition>,
    pub assigned_passenger: Option<PassengerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerSnapshot {
    pub id: PassengerId,
    pub pickup: GridPosition,
    pub dropoff: GridPosition,
    pub wait_time_ms: u64,
    pub vulnerable: Option<VulnerableCategory>,
    pub search_radius_multiplier: f64,
    pub party_size: u32,
    pub status: PassengerStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounts {
    pub taxis_idle: usize,
    pub taxis_pickup: usize,
    pub taxis_dropoff: usize,
    pub passengers_waiting: usize,
    pub passengers_assigned: usize,
    pub passengers_riding: usize,
    pub trips_completed: usize,
    /// Outbound events discarded because the queue was full.
    pub events_dropped: u64,
}

/// Read-only view of the world, sorted by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub timestamp_ms: u64,
    pub counts: DispatchCounts,
    pub taxis: Vec<TaxiSnapshot>,
    pub passengers: Vec<PassengerSnapshot>,
}

pub fn capture_snapshot(world: &mut World) -> SimulationSnapshot {
    let timestamp_ms = world
        .get_resource::<SimulationClock>()
        .map_or(0, SimulationClock::now);
    let grid = world
        .get_resource::<GridNetwork>()
        .cloned()
        .unwrap_or_default();
    let trips_completed = world
        .get_resource::<DispatchTelemetry>()
        .map_or(0, |t| t.completed_trips.len());
    let events_dropped = world
        .get_resource::<OutboundEvents>()
        .map_or(0, OutboundEvents::dropped);

    let mut taxis: Vec<TaxiSnapshot> = world
        .query::<(&Taxi, &Position)>()
        .iter(world)
        .map(|(taxi, position)| TaxiSnapshot {
            id: taxi.id,
            position: position.0,
            world: grid.to_world(position.0),
            state: taxi.state,
            current_load: taxi.current_load,
            capacity: taxi.capacity,
            target: taxi.target,
            assigned_passenger: taxi.assigned_passenger,
        })
        .collect();
    taxis.sort_by_key(|t| t.id);

    let mut passengers: Vec<PassengerSnapshot> = world
        .query::<&Passenger>()
        .iter(world)
        .map(|p| PassengerSnapshot {
            id: p.id,
            pickup: p.pickup,
            dropoff: p.dropoff,
            wait_time_ms: p.wait_time_ms,
            vulnerable: p.vulnerable,
            search_radius_multiplier: p.search_radius_multiplier,
            party_size: p.party_size,
            status: p.status,
        })
        .collect();
    passengers.sort_by_key(|p| p.id);

    let mut counts = DispatchCounts {
        trips_completed,
        events_dropped,
        ..DispatchCounts::default()
    };
    for taxi in &taxis {
        match taxi.state {
            TaxiState::Idle => counts.taxis_idle += 1,
            TaxiState::Pickup => counts.taxis_pickup += 1,
            TaxiState::Dropoff => counts.taxis_dropoff += 1,
        }
    }
    for passenger in &passengers {
        match passenger.status {
            PassengerStatus::Waiting => counts.passengers_waiting += 1,
            PassengerStatus::Assigned(_) => counts.passengers_assigned += 1,
            PassengerStatus::Riding(_) => counts.passengers_riding += 1,
        }
    }

    SimulationSnapshot {
        timestamp_ms,
        counts,
        taxis,
        passengers,
    }
}
