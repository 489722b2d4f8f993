//! Run Timeline
//!
//! Records when each action of a run starts, completes, fails, or is
//! skipped. One timeline exists per run; the scheduler records events from
//! whichever worker thread drives the node, so the event list sits behind
//! a lock.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Action passed its guard and began executing
    Started,
    /// Action finished executing
    Completed,
    /// Action panicked during guard or execute
    Failed,
    /// Action's guard reported false
    Skipped,
}

/// A single recorded event.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// Label of the node the event belongs to
    pub label: String,
    /// What happened
    pub kind: EventKind,
    /// When it happened
    pub at: Instant,
}

/// Per-run event recorder.
#[derive(Debug)]
pub struct RunTimeline {
    origin: Instant,
    events: Mutex<Vec<TimelineEvent>>,
}

impl RunTimeline {
    /// Creates a timeline whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Records an event for a node.
    pub fn record(&self, label: &str, kind: EventKind) {
        let event = TimelineEvent {
            label: label.to_string(),
            kind,
            at: Instant::now(),
        };
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    /// Returns a snapshot of all recorded events.
    pub fn events(&self) -> Vec<TimelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns the elapsed time since the timeline origin.
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Renders a plain-text report of per-action timing.
    ///
    /// Each started action is shown with its offset from the run origin
    /// and, once finished, its duration and outcome.
    pub fn render(&self) -> String {
        let events = self.events();
        let mut output = String::from("\nRun timeline:\n");

        for event in events.iter().filter(|e| e.kind != EventKind::Completed) {
            let offset = event.at.duration_since(self.origin).as_millis();
            match event.kind {
                EventKind::Started => {
                    let end = events.iter().find(|e| {
                        e.label == event.label
                            && matches!(e.kind, EventKind::Completed | EventKind::Failed)
                    });
                    match end {
                        Some(end) => {
                            let duration = end.at.duration_since(event.at).as_millis();
                            let outcome = if end.kind == EventKind::Failed {
                                " FAILED"
                            } else {
                                ""
                            };
                            output.push_str(&format!(
                                "  {:12} +{:>5} ms  ({} ms){}\n",
                                event.label, offset, duration, outcome
                            ));
                        }
                        None => {
                            output.push_str(&format!(
                                "  {:12} +{:>5} ms  (unfinished)\n",
                                event.label, offset
                            ));
                        }
                    }
                }
                EventKind::Skipped => {
                    output.push_str(&format!("  {:12} +{:>5} ms  skipped\n", event.label, offset));
                }
                _ => {}
            }
        }

        output
    }
}

impl Default for RunTimeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_events_recorded_in_order() {
        let timeline = RunTimeline::new();
        timeline.record("a", EventKind::Started);
        timeline.record("a", EventKind::Completed);
        timeline.record("b", EventKind::Skipped);

        let events = timeline.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].label, "a");
        assert_eq!(events[0].kind, EventKind::Started);
        assert_eq!(events[2].kind, EventKind::Skipped);
        assert!(events[0].at <= events[1].at);
    }

    #[test]
    fn test_concurrent_recording() {
        let timeline = std::sync::Arc::new(RunTimeline::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let timeline = std::sync::Arc::clone(&timeline);
                thread::spawn(move || {
                    let label = format!("n{}", i);
                    timeline.record(&label, EventKind::Started);
                    timeline.record(&label, EventKind::Completed);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(timeline.events().len(), 16);
    }

    #[test]
    fn test_render_shows_durations_and_outcomes() {
        let timeline = RunTimeline::new();
        timeline.record("fetch", EventKind::Started);
        thread::sleep(Duration::from_millis(10));
        timeline.record("fetch", EventKind::Completed);
        timeline.record("upload", EventKind::Started);
        timeline.record("upload", EventKind::Failed);
        timeline.record("cleanup", EventKind::Skipped);

        let report = timeline.render();
        assert!(report.contains("fetch"));
        assert!(report.contains("upload"));
        assert!(report.contains("FAILED"));
        assert!(report.contains("skipped"));
    }

    #[test]
    fn test_render_marks_unfinished_actions() {
        let timeline = RunTimeline::new();
        timeline.record("stuck", EventKind::Started);
        assert!(timeline.render().contains("unfinished"));
    }
}
