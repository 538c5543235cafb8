//! Per-iteration progress reporting.
//!
//! The optimizer pushes one [`IterationEvent`] per solver iteration into a
//! [`FitObserver`]. Observers replace ad-hoc "print every step" flags: attach
//! a [`TracingObserver`] to see the trail in the log, or a
//! [`RecordingObserver`] to inspect it afterwards.

use std::sync::{Arc, Mutex};

use argmin::core::observers::Observe;
use argmin::core::{Error, KV, State};

/// Snapshot of the solver after one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationEvent {
    pub iteration: u64,
    /// Chi-square at the current point.
    pub cost: f64,
    /// Lowest chi-square seen so far.
    pub best_cost: f64,
    pub best_params: Vec<f64>,
}

pub trait FitObserver: Send + Sync {
    fn on_iteration(&self, event: &IterationEvent);
}

/// Emits each iteration as a `trace` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FitObserver for TracingObserver {
    fn on_iteration(&self, event: &IterationEvent) {
        tracing::trace!(
            iteration = event.iteration,
            cost = event.cost,
            best_cost = event.best_cost,
            best_params = ?event.best_params,
            "solver iteration"
        );
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<IterationEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IterationEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FitObserver for RecordingObserver {
    fn on_iteration(&self, event: &IterationEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Adapts a [`FitObserver`] to argmin's observer interface.
pub(crate) struct ArgminBridge {
    observer: Arc<dyn FitObserver>,
}

impl ArgminBridge {
    pub(crate) fn new(observer: Arc<dyn FitObserver>) -> Self {
        Self { observer }
    }
}

impl<I> Observe<I> for ArgminBridge
where
    I: State<Param = Vec<f64>, Float = f64>,
{
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        let event = IterationEvent {
            iteration: state.get_iter(),
            cost: state.get_cost(),
            best_cost: state.get_best_cost(),
            best_params: state.get_best_param().cloned().unwrap_or_default(),
        };
        self.observer.on_iteration(&event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_observer_keeps_events_in_order() {
        let obs = RecordingObserver::new();
        assert!(obs.is_empty());
        for i in 0..3 {
            obs.on_iteration(&IterationEvent {
                iteration: i,
                cost: 10.0 - i as f64,
                best_cost: 10.0 - i as f64,
                best_params: vec![i as f64],
            });
        }
        let events = obs.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].iteration, 2);
        assert_eq!(events[2].best_params, vec![2.0]);
    }
}
