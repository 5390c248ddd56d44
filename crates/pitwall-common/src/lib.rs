//! ---
//! rig_section: "01-core-functionality"
//! rig_subsection: "module"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Shared primitives for the Pitwall telemetry rig."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
//! Shared configuration and logging primitives for the Pitwall rig workspace.

pub mod config;
pub mod logging;

pub use config::{LoadedRigConfig, LoggingConfig, RigConfig, RigSection, SignalProfile};
pub use logging::{init_tracing, LogFormat, TracingGuard};
