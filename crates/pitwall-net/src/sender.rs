//! ---
//! rig_section: "03-networking-external-interfaces"
//! rig_subsection: "module"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Fixed-cadence sender loop with cooperative shutdown."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
use std::time::Duration;

use pitwall_sim::{HealthStatus, SignalGenerator, TelemetryReading};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, warn};

use crate::error::TransportError;
use crate::sink::{Delivery, TelemetrySink};

/// Result of a single generate-and-send iteration.
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub step: u64,
    pub reading: TelemetryReading,
    pub health: HealthStatus,
    pub outcome: Result<Delivery, TransportError>,
}

/// Counters accumulated over a run, returned once the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Iterations attempted.
    pub steps: u64,
    /// Responses with a 2xx status.
    pub delivered: u64,
    /// Responses with any other status.
    pub rejected: u64,
    pub transport_failures: u64,
}

impl RunSummary {
    fn record(&mut self, report: &IterationReport) {
        self.steps += 1;
        match &report.outcome {
            Ok(delivery) if delivery.is_success() => self.delivered += 1,
            Ok(_) => self.rejected += 1,
            Err(_) => self.transport_failures += 1,
        }
    }
}

/// Drives a [`SignalGenerator`] into a [`TelemetrySink`] at a fixed interval.
///
/// Each iteration awaits its delivery to completion before the inter-iteration wait
/// starts, so sends never overlap. Only the wait is interruptible.
pub struct SenderLoop<S> {
    generator: SignalGenerator,
    sink: S,
    interval: Duration,
    step: u64,
}

impl<S: TelemetrySink> SenderLoop<S> {
    pub fn new(generator: SignalGenerator, sink: S, interval: Duration) -> Self {
        Self {
            generator,
            sink,
            interval,
            step: 0,
        }
    }

    /// Step index the next iteration will use.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Generate, send, and log one reading, then advance the step counter.
    ///
    /// Transport failures are logged and returned in the report, never propagated.
    pub async fn step_once(&mut self) -> IterationReport {
        let step = self.step;
        let reading = self.generator.reading(step);
        let health = reading.health(self.generator.profile());
        let outcome = self.sink.deliver(&reading).await;

        match &outcome {
            Ok(delivery) if delivery.is_success() => info!(
                step,
                vibration = reading.vibration,
                status = delivery.status.as_u16(),
                health = %health,
                "Frame {}: Vib={:.2}Hz -> {}",
                step,
                reading.vibration,
                delivery.status.as_u16()
            ),
            Ok(delivery) => warn!(
                step,
                vibration = reading.vibration,
                status = delivery.status.as_u16(),
                health = %health,
                "Frame {}: Vib={:.2}Hz -> {} (rejected by endpoint)",
                step,
                reading.vibration,
                delivery.status.as_u16()
            ),
            Err(err) => error!(
                step,
                vibration = reading.vibration,
                kind = err.kind(),
                error = %err,
                "Frame {}: connection error",
                step
            ),
        }

        self.step += 1;
        IterationReport {
            step,
            reading,
            health,
            outcome,
        }
    }

    /// Run until `shutdown` becomes `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let profile = self.generator.profile();
        let crash_eta = self.interval.saturating_mul(
            u32::try_from(profile.crash_start_frame).unwrap_or(u32::MAX),
        );
        info!(
            target_url = %self.sink.target(),
            interval_ms = self.interval.as_millis() as u64,
            crash_start_frame = profile.crash_start_frame,
            "telemetry rig starting; crash scheduled for frame {} (T+{:.1}s)",
            profile.crash_start_frame,
            crash_eta.as_secs_f64()
        );

        let mut summary = RunSummary::default();
        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.step_once().await;
            summary.record(&report);

            if wait_or_shutdown(self.interval, &mut shutdown).await {
                break;
            }
        }

        info!(
            steps = summary.steps,
            delivered = summary.delivered,
            rejected = summary.rejected,
            transport_failures = summary.transport_failures,
            "telemetry rig stopped"
        );
        summary
    }
}

/// Sleep for `interval`, returning `true` early if shutdown is requested.
///
/// Watch updates that leave the flag `false` do not shorten the wait.
async fn wait_or_shutdown(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = sleep_until(Instant::now() + interval);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}
