use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

pub const ONE_SEC_MS: u64 = 1000;

/// Event kinds. Declaration order is the processing order for events that
/// share a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    SimulationStarted,
    SpawnPassenger,
    MovementTick,
    PatrolStep,
    AssignmentTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    /// Insertion counter; keeps same-time same-kind events FIFO.
    seq: u64,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the earliest event first.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.kind.cmp(&self.kind))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event currently being processed by the schedule.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_seq: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind) {
        debug_assert!(
            timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            timestamp: timestamp.max(self.now),
            kind,
            seq,
        });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind) {
        self.schedule_at(self.now.saturating_add(delay_ms), kind);
    }

    pub fn schedule_in_secs(&mut self, delay_secs: u64, kind: EventKind) {
        self.schedule_in(delay_secs.saturating_mul(ONE_SEC_MS), kind);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|event| event.timestamp)
    }

    pub fn pending(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|event| event.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(10, EventKind::MovementTick);
        clock.schedule_at(5, EventKind::MovementTick);
        clock.schedule_at(20, EventKind::MovementTick);

        let first = clock.pop_next().expect("first event");
        assert_eq!(first.timestamp, 5);
        assert_eq!(clock.now(), 5);

        let second = clock.pop_next().expect("second event");
        assert_eq!(second.timestamp, 10);
        assert_eq!(clock.now(), 10);

        let third = clock.pop_next().expect("third event");
        assert_eq!(third.timestamp, 20);
        assert_eq!(clock.now(), 20);

        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn same_timestamp_orders_by_kind_then_insertion() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(1000, EventKind::AssignmentTick);
        clock.schedule_at(1000, EventKind::PatrolStep);
        clock.schedule_at(1000, EventKind::MovementTick);
        clock.schedule_at(1000, EventKind::SpawnPassenger);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| clock.pop_next())
            .map(|event| event.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::SpawnPassenger,
                EventKind::MovementTick,
                EventKind::PatrolStep,
                EventKind::AssignmentTick,
            ]
        );
    }

    #[test]
    fn same_kind_same_time_is_fifo() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(50, EventKind::SpawnPassenger);
        clock.schedule_at(50, EventKind::SpawnPassenger);
        let first = clock.pop_next().expect("first");
        let second = clock.pop_next().expect("second");
        assert!(first.seq < second.seq);
    }

    #[test]
    fn schedule_in_is_relative_to_now() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(2_000, EventKind::MovementTick);
        clock.pop_next();
        clock.schedule_in_secs(3, EventKind::PatrolStep);
        assert_eq!(clock.next_event_time(), Some(5_000));
        assert_eq!(clock.pending(EventKind::PatrolStep), 1);
    }
}
