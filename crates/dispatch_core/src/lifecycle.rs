//! Waiting-passenger bookkeeping: wait accrual and search radius growth.

use crate::config::PassengerConfig;
use crate::ecs::Passenger;

/// `1 + floor(wait / growth_interval) * growth_step`, optionally capped.
pub fn search_radius_multiplier(wait_time_ms: u64, config: &PassengerConfig) -> f64 {
    let steps = wait_time_ms
        .checked_div(config.radius_growth_interval_ms)
        .unwrap_or(0);
    let multiplier = 1.0 + steps as f64 * config.radius_growth_step;
    match config.max_search_radius_multiplier {
        Some(cap) => multiplier.min(cap),
        None => multiplier,
    }
}

/// Adds one tick of waiting to an unmatched passenger. Returns false (and
/// changes nothing) once the passenger has been assigned or picked up.
pub fn accrue_wait(passenger: &mut Passenger, tick_ms: u64, config: &PassengerConfig) -> bool {
    if !passenger.is_waiting() {
        return false;
    }
    passenger.wait_time_ms = passenger.wait_time_ms.saturating_add(tick_ms);
    passenger.search_radius_multiplier = search_radius_multiplier(passenger.wait_time_ms, config);
    true
}
