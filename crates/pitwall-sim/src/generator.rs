//! ---
//! rig_section: "02-signal-generation"
//! rig_subsection: "module"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Step-indexed synthetic signal generator with scripted anomaly."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
use chrono::Utc;
use pitwall_common::SignalProfile;
use rand::prelude::*;
use tracing::{debug, warn};

use crate::reading::TelemetryReading;

/// Maps a step index to a [`TelemetryReading`] following a [`SignalProfile`].
///
/// Before `crash_start_frame` the vibration oscillates around the baseline with
/// small uniform jitter. From the crash frame on it follows a capped linear ramp:
/// `min(spike_onset + spike_ramp_rate * (step - crash_start_frame), spike_cap)`
/// above the baseline, plus `spike_jitter` noise.
#[derive(Debug)]
pub struct SignalGenerator {
    profile: SignalProfile,
    rng: StdRng,
    last_timestamp: f64,
}

impl SignalGenerator {
    pub fn new(profile: SignalProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
            last_timestamp: f64::MIN,
        }
    }

    /// Build a generator seeded from OS entropy.
    pub fn from_entropy(profile: SignalProfile) -> Self {
        Self {
            profile,
            rng: StdRng::from_entropy(),
            last_timestamp: f64::MIN,
        }
    }

    pub fn profile(&self) -> &SignalProfile {
        &self.profile
    }

    pub fn is_crash_frame(&self, step: u64) -> bool {
        step >= self.profile.crash_start_frame
    }

    /// Generate the reading for `step`, stamped with the current wall-clock time.
    pub fn reading(&mut self, step: u64) -> TelemetryReading {
        self.reading_at(step, unix_seconds_now())
    }

    /// Generate the reading for `step` with an explicit timestamp.
    ///
    /// Timestamps never go backwards across calls; an earlier clock value is
    /// raised to the previous one.
    pub fn reading_at(&mut self, step: u64, timestamp: f64) -> TelemetryReading {
        let timestamp = timestamp.max(self.last_timestamp);
        self.last_timestamp = timestamp;

        let vibration = self.vibration(step);
        let x = step as f64;
        let profile = &self.profile;
        let temperature = profile.temperature_baseline + x * profile.temperature_slope;
        let aero_load =
            profile.aero_baseline + (x * profile.aero_frequency).sin() * profile.aero_amplitude;

        TelemetryReading {
            vibration,
            temperature,
            aero_load,
            timestamp,
        }
    }

    fn vibration(&mut self, step: u64) -> f64 {
        let baseline = self.profile.vibration_baseline;
        if !self.is_crash_frame(step) {
            let oscillation = (step as f64 * self.profile.vibration_frequency).sin()
                * self.profile.vibration_amplitude;
            let jitter = self.jitter(self.profile.vibration_jitter);
            return baseline + oscillation + jitter;
        }

        if step == self.profile.crash_start_frame {
            warn!(step, "injecting anomaly");
        } else {
            debug!(step, "anomaly active");
        }
        let offset = self.profile.spike_offset(step);
        let jitter = self.jitter(self.profile.spike_jitter);
        baseline + offset + jitter
    }

    fn jitter(&mut self, bound: f64) -> f64 {
        if bound > 0.0 {
            self.rng.gen_range(-bound..bound)
        } else {
            0.0
        }
    }
}

fn unix_seconds_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
