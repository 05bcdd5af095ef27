//! Transport seam between the dispatcher and an instrument.
//!
//! The dispatcher only ever talks through the [`Transport`] trait, so the
//! same `get`/`set`/dialogue code paths drive simulated and real hardware
//! alike. This crate ships the simulator backend ([`SimTransport`]); real
//! backends (serial, TCP, GPIB) live with their hardware crates.

use crate::catalog::device::EomConvention;
use crate::engine::SimulatedDevice;
use crate::error::{SimError, SimResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One logical half-duplex channel to an instrument.
#[async_trait]
pub trait Transport: Send {
    /// Write one terminated request to the channel.
    async fn write(&mut self, data: &str) -> SimResult<()>;

    /// Read one terminated response, waiting at most `timeout`.
    ///
    /// Returns [`SimError::Timeout`] when nothing arrives in time; the
    /// channel must remain usable afterwards.
    async fn read_line(&mut self, timeout: Duration) -> SimResult<String>;

    /// Close the channel. Further operations fail with
    /// [`SimError::Transport`].
    async fn close(&mut self) -> SimResult<()>;
}

/// In-process transport backed by a [`SimulatedDevice`].
///
/// Writes are delivered to the engine synchronously; replies queue up and
/// are consumed by subsequent reads, preserving the request-then-response
/// discipline of the real bus. The engine sits behind `Arc<Mutex<_>>` so a
/// shared bus can be modeled by handing the same engine to two transports.
pub struct SimTransport {
    device: Arc<Mutex<SimulatedDevice>>,
    eom: EomConvention,
    pending: VecDeque<String>,
    open: bool,
}

impl SimTransport {
    /// Wrap a fresh engine instance.
    pub fn new(device: SimulatedDevice, eom: EomConvention) -> Self {
        Self::with_shared(Arc::new(Mutex::new(device)), eom)
    }

    /// Attach to an existing (possibly shared) engine instance.
    pub fn with_shared(device: Arc<Mutex<SimulatedDevice>>, eom: EomConvention) -> Self {
        Self {
            device,
            eom,
            pending: VecDeque::new(),
            open: true,
        }
    }

    /// Handle to the backing engine, e.g. to inspect state in tests.
    pub fn device(&self) -> Arc<Mutex<SimulatedDevice>> {
        Arc::clone(&self.device)
    }

    fn ensure_open(&self) -> SimResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(SimError::Transport("transport is closed".to_string()))
        }
    }
}

#[async_trait]
impl Transport for SimTransport {
    async fn write(&mut self, data: &str) -> SimResult<()> {
        self.ensure_open()?;
        let command = data.strip_suffix(self.eom.request.as_str()).ok_or_else(|| {
            SimError::Transport(format!(
                "request {data:?} does not end with terminator {:?}",
                self.eom.request
            ))
        })?;
        log::trace!("sim tx: {command:?}");
        let mut device = self.device.lock().await;
        if let Some(response) = device.handle(command) {
            self.pending
                .push_back(format!("{response}{}", self.eom.response));
        }
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> SimResult<String> {
        self.ensure_open()?;
        if let Some(line) = self.pending.pop_front() {
            log::trace!("sim rx: {line:?}");
            return Ok(line);
        }
        // Nothing buffered: a reply can only appear through another write on
        // a shared engine, so waiting out the timeout is faithful to the
        // half-duplex bus.
        tokio::time::sleep(timeout).await;
        match self.pending.pop_front() {
            Some(line) => Ok(line),
            None => Err(SimError::Timeout(timeout)),
        }
    }

    async fn close(&mut self) -> SimResult<()> {
        self.open = false;
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    const CATALOG: &str = r#"
devices:
  dev:
    eom:
      GPIB INSTR: {q: "\r\n", r: "\n"}
    dialogues:
      - {q: "*IDN?", r: "softlab, dev"}
    properties:
      level:
        default: 0.0
        getter: {q: "LEV?", r: "{:.4f}"}
        setter: {q: "LEV {:.4f}"}
"#;

    fn transport() -> SimTransport {
        let catalog = Catalog::from_yaml(CATALOG).unwrap();
        let definition = catalog.device("dev").unwrap().clone();
        let eom = definition.eom_for("GPIB INSTR").unwrap().clone();
        SimTransport::new(SimulatedDevice::new(definition), eom)
    }

    #[tokio::test]
    async fn query_round_trip_keeps_terminators() {
        let mut t = transport();
        t.write("*IDN?\r\n").await.unwrap();
        let line = t.read_line(Duration::from_millis(10)).await.unwrap();
        assert_eq!(line, "softlab, dev\n");
    }

    #[tokio::test]
    async fn write_without_terminator_is_a_transport_error() {
        let mut t = transport();
        let err = t.write("*IDN?").await.unwrap_err();
        assert!(matches!(err, SimError::Transport(_)));
    }

    #[tokio::test]
    async fn read_with_nothing_pending_times_out() {
        let mut t = transport();
        // A setter produces no reply.
        t.write("LEV 1.0000\r\n").await.unwrap();
        let err = t.read_line(Duration::from_millis(5)).await.unwrap_err();
        assert!(matches!(err, SimError::Timeout(_)));
        // The channel stays usable.
        t.write("LEV?\r\n").await.unwrap();
        assert_eq!(
            t.read_line(Duration::from_millis(5)).await.unwrap(),
            "1.0000\n"
        );
    }

    #[tokio::test]
    async fn closed_transport_rejects_io() {
        let mut t = transport();
        t.write("*IDN?\r\n").await.unwrap();
        t.close().await.unwrap();
        assert!(t.write("*IDN?\r\n").await.is_err());
        assert!(t.read_line(Duration::from_millis(1)).await.is_err());
    }

    #[tokio::test]
    async fn shared_engine_models_a_shared_bus() {
        let catalog = Catalog::from_yaml(CATALOG).unwrap();
        let definition = catalog.device("dev").unwrap().clone();
        let eom = definition.eom_for("GPIB INSTR").unwrap().clone();
        let engine = Arc::new(Mutex::new(SimulatedDevice::new(definition)));

        let mut a = SimTransport::with_shared(Arc::clone(&engine), eom.clone());
        let mut b = SimTransport::with_shared(engine, eom);

        a.write("LEV 2.5000\r\n").await.unwrap();
        b.write("LEV?\r\n").await.unwrap();
        assert_eq!(
            b.read_line(Duration::from_millis(5)).await.unwrap(),
            "2.5000\n"
        );
    }
}
