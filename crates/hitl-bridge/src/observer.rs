// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dispatch observability.
//!
//! The dispatcher reports every attempt through [`DispatchObserver`].
//! Exporters plug in here; the bridge ships a tracing observer and in-process
//! counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use crate::dispatcher::SignalStatus;

/// One dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    /// Target workflow ID (empty if none could be read).
    pub workflow_id: String,
    /// Signal channel.
    pub signal_name: String,
    /// Outcome.
    pub status: SignalStatus,
    /// Time spent, validation included.
    pub elapsed: Duration,
}

/// Receives one event per dispatch attempt.
pub trait DispatchObserver: Send + Sync {
    /// Called after the attempt's outcome is known.
    fn on_dispatch(&self, event: &DispatchEvent);
}

/// Logs each dispatch as a structured event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn on_dispatch(&self, event: &DispatchEvent) {
        let elapsed_ms = event.elapsed.as_millis() as u64;
        match event.status {
            SignalStatus::Delivered => info!(
                workflow_id = %event.workflow_id,
                signal_name = %event.signal_name,
                status = event.status.as_str(),
                elapsed_ms,
                "Signal dispatched"
            ),
            _ => warn!(
                workflow_id = %event.workflow_id,
                signal_name = %event.signal_name,
                status = event.status.as_str(),
                elapsed_ms,
                "Signal not delivered"
            ),
        }
    }
}

/// Per-status dispatch counters.
#[derive(Debug, Default)]
pub struct DispatchCounters {
    delivered: AtomicU64,
    not_found: AtomicU64,
    already_completed: AtomicU64,
    invalid_signal: AtomicU64,
    engine_unavailable: AtomicU64,
}

/// Point-in-time copy of [`DispatchCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub delivered: u64,
    pub not_found: u64,
    pub already_completed: u64,
    pub invalid_signal: u64,
    pub engine_unavailable: u64,
}

impl CounterSnapshot {
    /// Dispatch attempts of any outcome.
    pub fn total(&self) -> u64 {
        self.delivered
            + self.not_found
            + self.already_completed
            + self.invalid_signal
            + self.engine_unavailable
    }
}

impl DispatchCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, status: SignalStatus) -> &AtomicU64 {
        match status {
            SignalStatus::Delivered => &self.delivered,
            SignalStatus::NotFound => &self.not_found,
            SignalStatus::AlreadyCompleted => &self.already_completed,
            SignalStatus::InvalidSignal => &self.invalid_signal,
            SignalStatus::EngineUnavailable => &self.engine_unavailable,
        }
    }

    /// Count for one status.
    pub fn get(&self, status: SignalStatus) -> u64 {
        self.counter(status).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            delivered: self.get(SignalStatus::Delivered),
            not_found: self.get(SignalStatus::NotFound),
            already_completed: self.get(SignalStatus::AlreadyCompleted),
            invalid_signal: self.get(SignalStatus::InvalidSignal),
            engine_unavailable: self.get(SignalStatus::EngineUnavailable),
        }
    }
}

impl DispatchObserver for DispatchCounters {
    fn on_dispatch(&self, event: &DispatchEvent) {
        self.counter(event.status).fetch_add(1, Ordering::Relaxed);
    }
}

/// Forwards each event to several observers in order.
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn DispatchObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer.
    pub fn with(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl DispatchObserver for FanoutObserver {
    fn on_dispatch(&self, event: &DispatchEvent) {
        for observer in &self.observers {
            observer.on_dispatch(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(status: SignalStatus) -> DispatchEvent {
        DispatchEvent {
            workflow_id: "wf-1".to_string(),
            signal_name: "decision".to_string(),
            status,
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_counters_track_each_status() {
        let counters = DispatchCounters::new();
        counters.on_dispatch(&event(SignalStatus::Delivered));
        counters.on_dispatch(&event(SignalStatus::Delivered));
        counters.on_dispatch(&event(SignalStatus::EngineUnavailable));

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.delivered, 2);
        assert_eq!(snapshot.engine_unavailable, 1);
        assert_eq!(snapshot.not_found, 0);
        assert_eq!(snapshot.total(), 3);
    }

    #[test]
    fn test_fanout_reaches_every_observer() {
        let a = Arc::new(DispatchCounters::new());
        let b = Arc::new(DispatchCounters::new());
        let fanout = FanoutObserver::new()
            .with(a.clone())
            .with(Arc::new(TracingObserver))
            .with(b.clone());

        fanout.on_dispatch(&event(SignalStatus::NotFound));

        assert_eq!(a.get(SignalStatus::NotFound), 1);
        assert_eq!(b.get(SignalStatus::NotFound), 1);
    }
}
