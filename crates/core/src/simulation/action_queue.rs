//! Control action queue
//!
//! Hosts that drive the simulation from another thread (UI, network, FFI
//! callbacks) submit [`ControlAction`]s through a [`ControlHandle`]. The
//! controller drains the queue at the start of each tick, so parameter
//! changes never land halfway through a step.

use crate::core_types::units::{MillimetersPerDay, MillimetersPerHour};
use crate::solver::WaterPulse;
use std::sync::{Arc, Mutex, PoisonError};

/// One queued change to the running simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// Set the rainfall rate
    SetRainfall(MillimetersPerHour),
    /// Set the rainfall rate from a 24-hour total
    SetRainfallPerDay(MillimetersPerDay),
    /// Set the drainage rate
    SetDrainage(MillimetersPerHour),
    /// Set the flow coefficient (1/s)
    SetFlowCoefficient(f32),
    /// Set the speed multiplier
    SetSpeed(f32),
    /// Inject a localized pulse of water
    AddPulse(WaterPulse),
    /// Dry the grid and zero statistics
    Reset,
}

/// Actions waiting for the next tick, in submission order
#[derive(Debug, Default)]
pub struct ActionQueue {
    pending: Vec<ControlAction>,
}

impl ActionQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an action for the next tick
    pub fn submit(&mut self, action: ControlAction) {
        self.pending.push(action);
    }

    /// Actions not yet applied
    pub fn pending(&self) -> &[ControlAction] {
        &self.pending
    }

    /// Hand over everything pending, leaving the queue empty
    pub fn take(&mut self) -> Vec<ControlAction> {
        std::mem::take(&mut self.pending)
    }
}

/// Cloneable, thread-safe handle for queueing control actions
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    queue: Arc<Mutex<ActionQueue>>,
}

impl ControlHandle {
    pub(crate) fn new(queue: Arc<Mutex<ActionQueue>>) -> Self {
        Self { queue }
    }

    /// Queue `action` for the next tick
    pub fn submit(&self, action: ControlAction) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .submit(action);
    }

    /// Queue a rainfall change
    pub fn set_rainfall_rate(&self, rate: MillimetersPerHour) {
        self.submit(ControlAction::SetRainfall(rate));
    }

    /// Queue a rainfall change given as a 24-hour total
    pub fn set_rainfall_per_day(&self, total: MillimetersPerDay) {
        self.submit(ControlAction::SetRainfallPerDay(total));
    }

    /// Queue a drainage change
    pub fn set_drainage_rate(&self, rate: MillimetersPerHour) {
        self.submit(ControlAction::SetDrainage(rate));
    }

    /// Queue a water pulse
    pub fn add_localized_pulse(&self, pulse: WaterPulse) {
        self.submit(ControlAction::AddPulse(pulse));
    }

    /// Number of actions waiting
    pub fn pending_len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::geo::GeoPoint;

    #[test]
    fn test_take_hands_over_pending_in_order() {
        let mut queue = ActionQueue::new();
        queue.submit(ControlAction::SetSpeed(2.0));
        queue.submit(ControlAction::Reset);
        assert_eq!(queue.pending().len(), 2);

        let taken = queue.take();
        assert_eq!(taken, vec![ControlAction::SetSpeed(2.0), ControlAction::Reset]);
        assert!(queue.pending().is_empty());
        assert!(queue.take().is_empty());
    }

    #[test]
    fn test_handle_is_shared_across_threads() {
        let handle = ControlHandle::default();
        let worker = handle.clone();
        std::thread::spawn(move || {
            worker.add_localized_pulse(WaterPulse::new(GeoPoint::new(0.0, 0.0), 10.0, 1.0));
            worker.set_drainage_rate(MillimetersPerHour::new(3.0));
        })
        .join()
        .unwrap();
        assert_eq!(handle.pending_len(), 2);
    }
}
