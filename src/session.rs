//! Client-facing command dispatcher.
//!
//! A [`DeviceSession`] is the operation set a higher-level caller uses
//! against one bound instrument: `get(property)`, `set(property, value)` and
//! the raw `send_dialogue` escape hatch. It renders outgoing commands from
//! the device definition's templates, appends the interface's request
//! terminator, bounds every read with a timeout and parses responses back
//! into typed values. Whether the far end is the simulator or real hardware
//! is decided entirely by the [`Transport`](crate::transport::Transport)
//! behind it.

use crate::catalog::device::{DeviceDefinition, EomConvention};
use crate::catalog::format::Value;
use crate::error::{SimError, SimResult};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One open session against a bound resource.
///
/// The transport sits behind an internal mutex: commands issued through one
/// session are processed strictly in order, matching the half-duplex
/// request-then-response discipline of the instrument bus. Independent
/// sessions proceed concurrently.
pub struct DeviceSession {
    address: String,
    definition: Arc<DeviceDefinition>,
    eom: EomConvention,
    transport: Mutex<Box<dyn Transport>>,
    timeout: Duration,
}

impl DeviceSession {
    /// Assemble a session. Normally done by
    /// [`ResourceRegistry::open`](crate::registry::ResourceRegistry::open).
    pub fn new(
        address: impl Into<String>,
        definition: Arc<DeviceDefinition>,
        eom: EomConvention,
        transport: Box<dyn Transport>,
        timeout: Duration,
    ) -> Self {
        let address = address.into();
        log::info!("Opened session to {address} ({})", definition.name);
        Self {
            address,
            definition,
            eom,
            transport: Mutex::new(transport),
            timeout,
        }
    }

    /// Resource address this session is bound to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The shared device definition.
    pub fn definition(&self) -> &Arc<DeviceDefinition> {
        &self.definition
    }

    /// Per-read timeout bound.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Change the per-read timeout bound.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Query a property's current value.
    ///
    /// Renders the getter query, sends it, awaits the response within the
    /// timeout and parses it per the getter format. Side-effect-free with
    /// respect to device state. Errors: [`SimError::UnknownProperty`],
    /// [`SimError::NoGetter`], [`SimError::Transport`],
    /// [`SimError::Timeout`], [`SimError::Parse`],
    /// [`SimError::DeviceReported`].
    pub async fn get(&self, property: &str) -> SimResult<Value> {
        let prop = self
            .definition
            .property(property)
            .ok_or_else(|| SimError::UnknownProperty(property.to_string()))?;
        let getter = prop
            .getter
            .as_ref()
            .ok_or_else(|| SimError::NoGetter(property.to_string()))?;

        let line = self.round_trip(&getter.query).await?;
        if self.definition.error_token.as_deref() == Some(line.as_str()) {
            return Err(SimError::DeviceReported(line));
        }
        getter.response.parse(&line)
    }

    /// Write a property. Fire-and-forget: no response is awaited.
    ///
    /// Errors: [`SimError::UnknownProperty`], [`SimError::NoSetter`],
    /// [`SimError::Format`], [`SimError::Transport`].
    pub async fn set(&self, property: &str, value: impl Into<Value>) -> SimResult<()> {
        let prop = self
            .definition
            .property(property)
            .ok_or_else(|| SimError::UnknownProperty(property.to_string()))?;
        let setter = prop
            .setter
            .as_ref()
            .ok_or_else(|| SimError::NoSetter(property.to_string()))?;

        let command = setter.render(&value.into())?;
        log::debug!("{}: tx {command:?}", self.address);
        let mut transport = self.transport.lock().await;
        transport
            .write(&format!("{command}{}", self.eom.request))
            .await
    }

    /// Send a raw unconditional dialogue such as `*IDN?` or `*RST`.
    ///
    /// A response is awaited only when the definition declares one for this
    /// query (or it is the error-status query); unknown queries are written
    /// without awaiting, so a conforming device's silence does not cost a
    /// timeout.
    pub async fn send_dialogue(&self, query: &str) -> SimResult<Option<String>> {
        let expects_response = match self.definition.find_dialogue(query) {
            Some(dialogue) => dialogue.response.is_some(),
            None => self
                .definition
                .status
                .as_ref()
                .is_some_and(|s| s.query == query),
        };

        if expects_response {
            Ok(Some(self.round_trip(query).await?))
        } else {
            log::debug!("{}: tx {query:?} (no reply expected)", self.address);
            let mut transport = self.transport.lock().await;
            transport
                .write(&format!("{query}{}", self.eom.request))
                .await?;
            Ok(None)
        }
    }

    /// Discard any buffered late responses, e.g. after a timeout.
    ///
    /// Returns the number of lines dropped. The session is fully usable
    /// afterwards.
    pub async fn drain(&self) -> SimResult<usize> {
        let mut transport = self.transport.lock().await;
        let mut dropped = 0;
        loop {
            match transport.read_line(Duration::ZERO).await {
                Ok(line) => {
                    log::debug!("{}: drained stale response {line:?}", self.address);
                    dropped += 1;
                }
                Err(SimError::Timeout(_)) => return Ok(dropped),
                Err(err) => return Err(err),
            }
        }
    }

    /// JSON description of the session: address, device type and the
    /// property names it exposes.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "address": self.address,
            "device": self.definition.name,
            "timeout_ms": self.timeout.as_millis() as u64,
            "properties": self.definition.properties.keys().collect::<Vec<_>>(),
        })
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> SimResult<()> {
        log::info!("Closing session to {}", self.address);
        let mut transport = self.transport.lock().await;
        transport.close().await
    }

    /// Send one terminated query and return the terminator-stripped reply.
    async fn round_trip(&self, query: &str) -> SimResult<String> {
        let mut transport = self.transport.lock().await;
        log::debug!("{}: tx {query:?}", self.address);
        transport
            .write(&format!("{query}{}", self.eom.request))
            .await?;
        let raw = transport.read_line(self.timeout).await?;
        drop(transport);
        log::debug!("{}: rx {raw:?}", self.address);
        let line = raw
            .strip_suffix(self.eom.response.as_str())
            .unwrap_or(raw.as_str());
        Ok(line.to_string())
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("address", &self.address)
            .field("device", &self.definition.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
