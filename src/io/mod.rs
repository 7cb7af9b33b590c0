//! IO modules - edges of the engine
//!
//! - `sink` - Notification and duty-log outlets
//! - `manifest` - Passenger chart (JSON) and session script (JSONL) loading

pub mod manifest;
pub mod sink;

// Re-export commonly used types
pub use manifest::{load_passengers, load_script};
pub use sink::{LogKind, MemorySink, NoticeSeverity, SessionSink, TracingSink};
