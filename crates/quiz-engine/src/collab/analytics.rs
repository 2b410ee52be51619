use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Fire-and-forget event sink. Implementations must not block or fail the caller.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, payload: Value);
}

/// Writes events to the `quiz::analytics` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn track(&self, event: &str, payload: Value) {
        info!(target: "quiz::analytics", event, %payload, "analytics event");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub name: String,
    pub payload: Value,
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct MemoryAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemoryAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| event.name == name)
            .count()
    }
}

impl AnalyticsSink for MemoryAnalytics {
    fn track(&self, event: &str, payload: Value) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(AnalyticsEvent {
                name: event.to_string(),
                payload,
            });
    }
}
