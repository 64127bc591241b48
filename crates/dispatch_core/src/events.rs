//! Outbound dispatch events for a transport or rendering collaborator.
//!
//! Systems push events as they happen; the host drains them after stepping.
//! The queue is bounded: once full, each push evicts the oldest event and
//! counts it as dropped. A disabled queue records nothing.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::config::EventsConfig;
use crate::ecs::{PassengerId, TaxiId, VulnerableCategory};
use crate::grid::GridPosition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    TaxiMoved {
        taxi: TaxiId,
        from: GridPosition,
        to: GridPosition,
    },
    PassengerSpawned {
        passenger: PassengerId,
        pickup: GridPosition,
        dropoff: GridPosition,
        vulnerable: Option<VulnerableCategory>,
        party_size: u32,
    },
    PassengerAssigned {
        passenger: PassengerId,
        taxi: TaxiId,
    },
    PassengerPickedUp {
        passenger: PassengerId,
        taxi: TaxiId,
    },
    PassengerDroppedOff {
        passenger: PassengerId,
        taxi: TaxiId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: DispatchEvent,
}

#[derive(Debug, Resource)]
pub struct OutboundEvents {
    events: VecDeque<TimedEvent>,
    capacity: usize,
    enabled: bool,
    dropped: u64,
}

impl OutboundEvents {
    pub fn new(config: &EventsConfig) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: config.capacity,
            enabled: config.enabled,
            dropped: 0,
        }
    }

    pub fn push(&mut self, at_ms: u64, event: DispatchEvent) {
        if !self.enabled || self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(TimedEvent { at_ms, event });
    }

    pub fn drain(&mut self) -> Vec<TimedEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &TimedEvent> {
        self.events.iter()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events evicted since the queue was built.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for OutboundEvents {
    fn default() -> Self {
        Self::new(&EventsConfig::default())
    }
}
