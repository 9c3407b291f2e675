//! Step Timeline
//!
//! Tracks step start/end times within one pipeline run so that the
//! pipeline can report how long each step took.

use std::time::{Duration, Instant};

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Step started executing
    Started,
    /// Step completed successfully
    Completed,
    /// Step failed
    Failed,
}

/// A single event in the timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    pub step: String,
    pub event_type: EventType,
    pub timestamp: Instant,
}

/// Timeline of one pipeline run.
#[derive(Debug, Clone)]
pub struct StepTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
}

impl StepTimeline {
    /// Creates a new timeline starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Records an event for a step.
    pub fn add_event(&mut self, step: &str, event_type: EventType) {
        self.events.push(TimelineEvent {
            step: step.to_string(),
            event_type,
            timestamp: Instant::now(),
        });
    }

    /// Returns the total elapsed time since timeline creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns `(step, duration, succeeded)` for every finished step, in
    /// the order the steps started.
    pub fn durations(&self) -> Vec<(String, Duration, bool)> {
        let mut finished = Vec::new();
        let mut pending: Vec<(&str, Instant)> = Vec::new();

        for event in &self.events {
            match event.event_type {
                EventType::Started => pending.push((event.step.as_str(), event.timestamp)),
                EventType::Completed | EventType::Failed => {
                    if let Some(index) = pending.iter().position(|(step, _)| *step == event.step) {
                        let (step, started) = pending.remove(index);
                        finished.push((
                            step.to_string(),
                            event.timestamp.duration_since(started),
                            event.event_type == EventType::Completed,
                        ));
                    }
                }
            }
        }

        finished
    }

    /// One line per finished step plus the total.
    pub fn summary(&self) -> String {
        let mut output = String::new();
        for (step, duration, succeeded) in self.durations() {
            let marker = if succeeded { "ok" } else { "FAILED" };
            output.push_str(&format!("  {:24} {:.2?} {}\n", step, duration, marker));
        }
        output.push_str(&format!("  total {:.2?}", self.elapsed()));
        output
    }
}

impl Default for StepTimeline {
    fn default() -> Self {
        Self::new()
    }
}
