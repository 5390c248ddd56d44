//! ---
//! rig_section: "03-networking-external-interfaces"
//! rig_subsection: "module"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Transport and sender loop exports."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
//! Delivery of telemetry readings to the pit wall endpoint.

pub mod error;
pub mod sender;
pub mod sink;

pub use error::TransportError;
pub use sender::{IterationReport, RunSummary, SenderLoop};
pub use sink::{Delivery, HttpSink, TelemetrySink};
