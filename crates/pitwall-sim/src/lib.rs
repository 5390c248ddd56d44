//! ---
//! rig_section: "02-signal-generation"
//! rig_subsection: "01-bootstrap"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Signal generator module exports and shared types."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
//! Synthetic telemetry generation for the Pitwall rig.

pub mod generator;
pub mod reading;

pub use generator::SignalGenerator;
pub use reading::{HealthStatus, TelemetryReading};
