//! ---
//! rig_section: "03-networking-external-interfaces"
//! rig_subsection: "module"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Telemetry sinks and the HTTP POST transport."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use pitwall_sim::TelemetryReading;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

/// A response received from the endpoint, whatever its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub status: StatusCode,
}

impl Delivery {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Destination for telemetry readings.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Human-readable destination used in banners and logs.
    fn target(&self) -> &str;

    /// Make a single delivery attempt. Implementations must not retry.
    async fn deliver(&self, reading: &TelemetryReading) -> Result<Delivery, TransportError>;
}

/// Posts each reading as a JSON body to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    endpoint: Url,
}

impl HttpSink {
    /// Build a sink for `endpoint`. `request_timeout` of `None` keeps reqwest's default.
    pub fn new(endpoint: Url, request_timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TelemetrySink for HttpSink {
    fn target(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn deliver(&self, reading: &TelemetryReading) -> Result<Delivery, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(reading)
            .send()
            .await?;
        let status = response.status();
        debug!(status = status.as_u16(), endpoint = %self.endpoint, "telemetry posted");
        Ok(Delivery { status })
    }
}
