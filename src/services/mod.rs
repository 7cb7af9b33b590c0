//! Services - onboard business logic
//!
//! This module contains the core services, leaves first:
//! - `registry` - Passenger chart and its mutations
//! - `fraud` - Fraud and anomaly rule engine
//! - `rac_allocator` - RAC to confirmed seat allocation
//! - `station_progressor` - Station arrival views and segment proximity
//! - `handover` - TT-to-TT duty handover state machine
//! - `session` - Session state container and event reducer

pub mod fraud;
pub mod handover;
pub mod rac_allocator;
pub mod registry;
pub mod session;
pub mod station_progressor;

// Re-export commonly used types
pub use fraud::{Blacklist, FraudRuleEngine};
pub use handover::{HandoverCoordinator, HandoverPhase, HandoverSummary, TtIdentity};
pub use registry::PassengerRegistry;
pub use session::{Engine, Outcome, Session, SessionEvent, SessionState};
