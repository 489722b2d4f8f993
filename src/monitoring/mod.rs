//! Run Monitoring
//!
//! Per-run observability: a timeline of action events used for timing
//! reports.

pub mod timeline;

pub use timeline::{EventKind, RunTimeline, TimelineEvent};
