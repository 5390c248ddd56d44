//! ---
//! rig_section: "01-core-functionality"
//! rig_subsection: "module"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Rig configuration model, loading, and validation."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_send_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_vibration_baseline() -> f64 {
    50.0
}

fn default_vibration_amplitude() -> f64 {
    1.5
}

fn default_vibration_frequency() -> f64 {
    0.2
}

fn default_vibration_jitter() -> f64 {
    0.5
}

fn default_crash_start_frame() -> u64 {
    15
}

fn default_spike_onset() -> f64 {
    4.0
}

fn default_spike_ramp_rate() -> f64 {
    2.0
}

fn default_spike_cap() -> f64 {
    45.0
}

fn default_spike_jitter() -> f64 {
    1.0
}

fn default_temperature_baseline() -> f64 {
    85.0
}

fn default_temperature_slope() -> f64 {
    0.05
}

fn default_aero_baseline() -> f64 {
    1500.0
}

fn default_aero_amplitude() -> f64 {
    10.0
}

fn default_aero_frequency() -> f64 {
    0.1
}

fn default_warning_threshold() -> f64 {
    52.0
}

fn default_critical_threshold() -> f64 {
    60.0
}

/// Top-level configuration for the telemetry rig.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default)]
    pub rig: RigSection,
    #[serde(default)]
    pub signal: SignalProfile,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`RigConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedRigConfig {
    pub config: RigConfig,
    /// `None` when no file was found and built-in defaults are in effect.
    pub source: Option<PathBuf>,
}

impl RigConfig {
    pub const ENV_CONFIG_PATH: &str = "PITWALL_CONFIG";

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `PITWALL_CONFIG` path must exist. Candidate paths are tried in
    /// order and skipped when absent; if none exist the defaults are returned.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedRigConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedRigConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedRigConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!("no configuration file found; using built-in defaults");
        Ok(LoadedRigConfig {
            config: Self::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<RigConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.rig.validate()?;
        self.signal.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for RigConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: RigConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Transport and cadence settings for the sender loop.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigSection {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_send_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub send_interval: Duration,
    /// Per-request timeout. `None` keeps the HTTP client's default.
    #[serde(default)]
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub request_timeout: Option<Duration>,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for RigSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            send_interval: default_send_interval(),
            request_timeout: None,
            random_seed: None,
        }
    }
}

impl RigSection {
    /// Parse the configured endpoint, failing when it is absent or not http(s).
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                anyhow!("no endpoint configured; pass --endpoint or set PITWALL_ENDPOINT")
            })?;
        parse_endpoint(raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.send_interval.is_zero() {
            return Err(anyhow!("rig.send_interval must be greater than zero"));
        }
        if let Some(timeout) = self.request_timeout {
            if timeout.is_zero() {
                return Err(anyhow!("rig.request_timeout must be greater than zero"));
            }
        }
        if self.endpoint.is_some() {
            self.endpoint_url()?;
        }
        Ok(())
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid endpoint url '{raw}'"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!(
            "endpoint '{}' uses unsupported scheme '{}'",
            raw,
            other
        )),
    }
}

/// Constants shaping the synthetic sensor signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalProfile {
    #[serde(default = "default_vibration_baseline")]
    pub vibration_baseline: f64,
    #[serde(default = "default_vibration_amplitude")]
    pub vibration_amplitude: f64,
    #[serde(default = "default_vibration_frequency")]
    pub vibration_frequency: f64,
    #[serde(default = "default_vibration_jitter")]
    pub vibration_jitter: f64,
    #[serde(default = "default_crash_start_frame")]
    pub crash_start_frame: u64,
    /// Offset added to the baseline on the first crash frame.
    #[serde(default = "default_spike_onset")]
    pub spike_onset: f64,
    /// Additional offset per frame after the crash starts.
    #[serde(default = "default_spike_ramp_rate")]
    pub spike_ramp_rate: f64,
    /// Upper bound on the spike offset.
    #[serde(default = "default_spike_cap")]
    pub spike_cap: f64,
    #[serde(default = "default_spike_jitter")]
    pub spike_jitter: f64,
    #[serde(default = "default_temperature_baseline")]
    pub temperature_baseline: f64,
    #[serde(default = "default_temperature_slope")]
    pub temperature_slope: f64,
    #[serde(default = "default_aero_baseline")]
    pub aero_baseline: f64,
    #[serde(default = "default_aero_amplitude")]
    pub aero_amplitude: f64,
    #[serde(default = "default_aero_frequency")]
    pub aero_frequency: f64,
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,
}

impl Default for SignalProfile {
    fn default() -> Self {
        Self {
            vibration_baseline: default_vibration_baseline(),
            vibration_amplitude: default_vibration_amplitude(),
            vibration_frequency: default_vibration_frequency(),
            vibration_jitter: default_vibration_jitter(),
            crash_start_frame: default_crash_start_frame(),
            spike_onset: default_spike_onset(),
            spike_ramp_rate: default_spike_ramp_rate(),
            spike_cap: default_spike_cap(),
            spike_jitter: default_spike_jitter(),
            temperature_baseline: default_temperature_baseline(),
            temperature_slope: default_temperature_slope(),
            aero_baseline: default_aero_baseline(),
            aero_amplitude: default_aero_amplitude(),
            aero_frequency: default_aero_frequency(),
            warning_threshold: default_warning_threshold(),
            critical_threshold: default_critical_threshold(),
        }
    }
}

impl SignalProfile {
    /// Largest deviation from the vibration baseline before the crash frame.
    pub fn normal_half_width(&self) -> f64 {
        self.vibration_amplitude + self.vibration_jitter
    }

    /// Inclusive range `[low, high]` the vibration stays within before the crash.
    pub fn normal_band(&self) -> (f64, f64) {
        let half = self.normal_half_width();
        (
            self.vibration_baseline - half,
            self.vibration_baseline + half,
        )
    }

    /// Spike offset for a step, zero before the crash frame.
    pub fn spike_offset(&self, step: u64) -> f64 {
        if step < self.crash_start_frame {
            return 0.0;
        }
        let frames = (step - self.crash_start_frame) as f64;
        (self.spike_onset + self.spike_ramp_rate * frames).min(self.spike_cap)
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("vibration_baseline", self.vibration_baseline),
            ("vibration_amplitude", self.vibration_amplitude),
            ("vibration_frequency", self.vibration_frequency),
            ("vibration_jitter", self.vibration_jitter),
            ("spike_onset", self.spike_onset),
            ("spike_ramp_rate", self.spike_ramp_rate),
            ("spike_cap", self.spike_cap),
            ("spike_jitter", self.spike_jitter),
            ("temperature_baseline", self.temperature_baseline),
            ("temperature_slope", self.temperature_slope),
            ("aero_baseline", self.aero_baseline),
            ("aero_amplitude", self.aero_amplitude),
            ("aero_frequency", self.aero_frequency),
            ("warning_threshold", self.warning_threshold),
            ("critical_threshold", self.critical_threshold),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(anyhow!("signal.{} must be a finite number", name));
            }
        }
        for (name, value) in [
            ("vibration_amplitude", self.vibration_amplitude),
            ("vibration_jitter", self.vibration_jitter),
            ("spike_ramp_rate", self.spike_ramp_rate),
            ("spike_jitter", self.spike_jitter),
            ("aero_amplitude", self.aero_amplitude),
        ] {
            if value < 0.0 {
                return Err(anyhow!("signal.{} must not be negative", name));
            }
        }
        for (name, value) in [
            ("vibration_jitter", self.vibration_jitter),
            ("spike_jitter", self.spike_jitter),
        ] {
            // Jitter is sampled from (-bound, bound); the span must stay finite.
            if !(2.0 * value).is_finite() {
                return Err(anyhow!("signal.{} is too large to sample", name));
            }
        }
        if self.temperature_slope <= 0.0 {
            return Err(anyhow!("signal.temperature_slope must be positive"));
        }
        if self.spike_cap < self.spike_onset {
            return Err(anyhow!(
                "signal.spike_cap ({}) must be at least signal.spike_onset ({})",
                self.spike_cap,
                self.spike_onset
            ));
        }
        let floor = self.spike_onset - self.spike_jitter;
        if floor <= self.normal_half_width() {
            return Err(anyhow!(
                "spike floor {:.2} Hz (onset minus jitter) must exceed the normal band half-width {:.2} Hz",
                floor,
                self.normal_half_width()
            ));
        }
        if self.critical_threshold < self.warning_threshold {
            return Err(anyhow!(
                "signal.critical_threshold must not be below signal.warning_threshold"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling JSON log file. Console-only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[rig]
endpoint = "http://127.0.0.1:9000/telemetry"
send_interval = 1000
request_timeout = 2500
random_seed = 7

[signal]
crash_start_frame = 40

[logging]
format = "structured-json"
"#;

    #[test]
    fn parses_sample_configuration() {
        let config: RigConfig = SAMPLE.parse().unwrap();
        assert_eq!(config.rig.send_interval, Duration::from_secs(1));
        assert_eq!(config.rig.request_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.rig.random_seed, Some(7));
        assert_eq!(config.signal.crash_start_frame, 40);
        assert_eq!(config.signal.vibration_baseline, 50.0);
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        let url = config.rig.endpoint_url().unwrap();
        assert_eq!(url.path(), "/telemetry");
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config: RigConfig = "".parse().unwrap();
        assert_eq!(config.rig.send_interval, Duration::from_millis(500));
        assert!(config.rig.request_timeout.is_none());
        assert_eq!(config.signal, SignalProfile::default());
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn missing_endpoint_is_reported_on_use() {
        let config = RigConfig::default();
        config.validate().unwrap();
        let err = config.rig.endpoint_url().unwrap_err();
        assert!(err.to_string().contains("no endpoint configured"));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let mut section = RigSection::default();
        section.endpoint = Some("ftp://pitwall.invalid/upload".into());
        assert!(section.validate().is_err());
        section.endpoint = Some("not a url".into());
        assert!(section.validate().is_err());
        section.endpoint = Some("https://pitwall.invalid/x1/hook".into());
        section.validate().unwrap();
    }

    #[test]
    fn rejects_zero_interval() {
        let err = "[rig]\nsend_interval = 0\n".parse::<RigConfig>().unwrap_err();
        assert!(err.to_string().contains("send_interval"));
    }

    #[test]
    fn rejects_spike_that_overlaps_normal_band() {
        let mut profile = SignalProfile::default();
        profile.spike_onset = 2.5;
        assert!(profile.validate().is_err());

        let mut profile = SignalProfile::default();
        profile.spike_cap = 1.0;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut profile = SignalProfile::default();
        profile.aero_frequency = f64::NAN;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn rejects_jitter_that_overflows_sampling_range() {
        let mut profile = SignalProfile::default();
        profile.vibration_jitter = 1e308;
        profile.spike_onset = 1.5e308;
        profile.spike_cap = 1.5e308;
        assert!(profile.validate().is_err());

        let mut profile = SignalProfile::default();
        profile.spike_jitter = f64::MAX;
        profile.spike_onset = f64::MAX;
        profile.spike_cap = f64::MAX;
        assert!(profile.validate().is_err());

        let mut profile = SignalProfile::default();
        profile.vibration_jitter = 1e300;
        profile.spike_onset = 1e301;
        profile.spike_cap = 1e301;
        profile.validate().unwrap();
    }

    #[test]
    fn spike_offset_ramps_then_caps() {
        let profile = SignalProfile::default();
        assert_eq!(profile.spike_offset(0), 0.0);
        assert_eq!(profile.spike_offset(14), 0.0);
        assert_eq!(profile.spike_offset(15), 4.0);
        assert_eq!(profile.spike_offset(16), 6.0);
        assert_eq!(profile.spike_offset(40), 45.0);
        assert_eq!(profile.spike_offset(10_000), 45.0);
    }

    #[test]
    fn normal_band_matches_defaults() {
        let (low, high) = SignalProfile::default().normal_band();
        assert_eq!(low, 48.0);
        assert_eq!(high, 52.0);
    }

    #[test]
    fn loads_first_existing_candidate() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(SAMPLE.as_bytes())?;
        file.flush()?;
        let missing = PathBuf::from("/nonexistent/pitwall.toml");
        let loaded =
            RigConfig::load_with_source(&[missing, file.path().to_path_buf()])?;
        assert_eq!(loaded.source.as_deref(), Some(file.path()));
        assert_eq!(loaded.config.signal.crash_start_frame, 40);
        Ok(())
    }

    #[test]
    fn falls_back_to_defaults_without_candidates() -> Result<()> {
        let loaded = RigConfig::load_with_source(&[PathBuf::from("/nonexistent/pitwall.toml")])?;
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.rig.send_interval, Duration::from_millis(500));
        Ok(())
    }
}
