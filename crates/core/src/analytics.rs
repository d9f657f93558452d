//! # Analytics
//!
//! Fire-and-forget notifications about pipeline activity. Sinks must not
//! block; the orchestrator logs and discards any error they return.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Event reported to an [`AnalyticsSink`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// One `generate` batch finished
    IdeaGeneration { topic: String, count: usize },
    /// One iteration finished
    IdeaIteration {
        idea_id: String,
        iteration_type: String,
    },
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::IdeaGeneration { .. } => "idea_generation",
            Self::IdeaIteration { .. } => "idea_iteration",
        }
    }

    /// Payload without the event name
    pub fn payload(&self) -> Value {
        match self {
            Self::IdeaGeneration { topic, count } => json!({"topic": topic, "count": count}),
            Self::IdeaIteration {
                idea_id,
                iteration_type,
            } => json!({"idea_id": idea_id, "iteration_type": iteration_type}),
        }
    }
}

/// Receiver of analytics events.
pub trait AnalyticsSink: Send + Sync {
    fn notify(&self, event: &AnalyticsEvent) -> anyhow::Result<()>;
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn notify(&self, _event: &AnalyticsEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Forwards events into a bounded channel; a full channel drops the event.
pub struct ChannelAnalytics {
    tx: mpsc::Sender<(DateTime<Utc>, AnalyticsEvent)>,
}

impl ChannelAnalytics {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<(DateTime<Utc>, AnalyticsEvent)>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl AnalyticsSink for ChannelAnalytics {
    fn notify(&self, event: &AnalyticsEvent) -> anyhow::Result<()> {
        self.tx
            .try_send((Utc::now(), event.clone()))
            .map_err(|e| anyhow::anyhow!("analytics event {} dropped: {}", event.name(), e))
    }
}

/// Running counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsMetrics {
    pub total_generations: u64,
    pub total_ideas: u64,
    pub total_iterations: u64,
    pub generations_by_topic: HashMap<String, u64>,
    pub iterations_by_type: HashMap<String, u64>,
}

#[derive(Default)]
struct Recorded {
    events: Vec<(DateTime<Utc>, AnalyticsEvent)>,
    metrics: AnalyticsMetrics,
}

/// Keeps every event and aggregates metrics in memory
#[derive(Default)]
pub struct InMemoryAnalytics {
    inner: Mutex<Recorded>,
}

impl InMemoryAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn metrics(&self) -> AnalyticsMetrics {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .metrics
            .clone()
    }
}

impl AnalyticsSink for InMemoryAnalytics {
    fn notify(&self, event: &AnalyticsEvent) -> anyhow::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| anyhow::anyhow!("analytics lock poisoned: {}", e))?;

        match event {
            AnalyticsEvent::IdeaGeneration { topic, count } => {
                inner.metrics.total_generations += 1;
                inner.metrics.total_ideas += *count as u64;
                *inner
                    .metrics
                    .generations_by_topic
                    .entry(topic.clone())
                    .or_default() += 1;
            }
            AnalyticsEvent::IdeaIteration { iteration_type, .. } => {
                inner.metrics.total_iterations += 1;
                *inner
                    .metrics
                    .iterations_by_type
                    .entry(iteration_type.clone())
                    .or_default() += 1;
            }
        }
        inner.events.push((Utc::now(), event.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation(topic: &str, count: usize) -> AnalyticsEvent {
        AnalyticsEvent::IdeaGeneration {
            topic: topic.into(),
            count,
        }
    }

    #[test]
    fn test_event_names_and_payloads() {
        let event = AnalyticsEvent::IdeaIteration {
            idea_id: "abc".into(),
            iteration_type: "refinement".into(),
        };
        assert_eq!(event.name(), "idea_iteration");
        assert_eq!(event.payload()["iteration_type"], "refinement");
        assert_eq!(generation("pets", 2).payload()["count"], 2);

        let tagged = serde_json::to_value(generation("pets", 2)).unwrap();
        assert_eq!(tagged["event"], "idea_generation");
    }

    #[test]
    fn test_in_memory_metrics() {
        let sink = InMemoryAnalytics::new();
        sink.notify(&generation("pets", 2)).unwrap();
        sink.notify(&generation("pets", 3)).unwrap();
        sink.notify(&AnalyticsEvent::IdeaIteration {
            idea_id: "a".into(),
            iteration_type: "critique".into(),
        })
        .unwrap();

        let metrics = sink.metrics();
        assert_eq!(metrics.total_generations, 2);
        assert_eq!(metrics.total_ideas, 5);
        assert_eq!(metrics.generations_by_topic["pets"], 2);
        assert_eq!(metrics.iterations_by_type["critique"], 1);
        assert_eq!(sink.events().len(), 3);
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (sink, mut rx) = ChannelAnalytics::new(1);
        assert!(sink.notify(&generation("a", 1)).is_ok());
        assert!(sink.notify(&generation("b", 1)).is_err());
        let (_, first) = rx.try_recv().unwrap();
        assert_eq!(first, generation("a", 1));
    }
}
