//! ---
//! rig_section: "02-signal-generation"
//! rig_subsection: "module"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Telemetry reading payload and health classification."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
use std::fmt;

use pitwall_common::SignalProfile;
use serde::{Deserialize, Serialize};

/// One synthetic sensor sample, serialized as the outbound JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    /// Vibration in Hz.
    pub vibration: f64,
    /// Temperature in °C.
    pub temperature: f64,
    /// Aerodynamic load in N.
    pub aero_load: f64,
    /// Seconds since the Unix epoch, fractional.
    pub timestamp: f64,
}

impl TelemetryReading {
    pub fn health(&self, profile: &SignalProfile) -> HealthStatus {
        HealthStatus::classify(self.vibration, profile)
    }
}

/// Vibration health bands used by the pit wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Nominal,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn classify(vibration: f64, profile: &SignalProfile) -> Self {
        if vibration > profile.critical_threshold {
            HealthStatus::Critical
        } else if vibration > profile.warning_threshold {
            HealthStatus::Warning
        } else {
            HealthStatus::Nominal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Nominal => "nominal",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
