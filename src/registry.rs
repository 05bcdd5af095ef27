//! Resource registry: addresses to live sessions.
//!
//! The registry owns the validated [`Catalog`] and turns a resource address
//! into an open [`DeviceSession`]. For simulated resources each `open` seeds
//! a fresh engine instance from the definition's defaults; for real hardware
//! the caller supplies the transport and the registry contributes the
//! definition and terminator convention.

use crate::catalog::loader::Catalog;
use crate::config::Settings;
use crate::engine::SimulatedDevice;
use crate::error::{SimError, SimResult};
use crate::session::DeviceSession;
use crate::transport::{SimTransport, Transport};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Maps resource addresses to device definitions and opens sessions.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    catalog: Catalog,
    default_timeout: Duration,
}

impl ResourceRegistry {
    /// Build a registry over an already-loaded catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            default_timeout: Duration::from_millis(1000),
        }
    }

    /// Build a registry from [`Settings`]: loads the catalog file and applies
    /// the configured query timeout.
    pub fn from_settings(settings: &Settings) -> SimResult<Self> {
        let catalog = Catalog::from_path(Path::new(&settings.catalog))?;
        Ok(Self::new(catalog).with_timeout(settings.query_timeout()))
    }

    /// Override the default per-read timeout handed to new sessions.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// The catalog backing this registry.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// All bound resource addresses.
    pub fn addresses(&self) -> Vec<&str> {
        self.catalog.addresses().collect()
    }

    /// All known device type names.
    pub fn device_names(&self) -> Vec<&str> {
        self.catalog.device_names().collect()
    }

    /// Open a simulated session on a bound address.
    ///
    /// Each call seeds a fresh [`SimulatedDevice`] from the definition's
    /// defaults; the state lives exactly as long as the session.
    pub fn open(&self, address: &str) -> SimResult<DeviceSession> {
        let (definition, eom) = self.lookup(address)?;
        let engine = SimulatedDevice::new(Arc::clone(&definition));
        let transport = SimTransport::new(engine, eom.clone());
        Ok(DeviceSession::new(
            address,
            definition,
            eom,
            Box::new(transport),
            self.default_timeout,
        ))
    }

    /// Open a session over a caller-supplied transport (real hardware).
    pub fn open_with(
        &self,
        address: &str,
        transport: Box<dyn Transport>,
    ) -> SimResult<DeviceSession> {
        let (definition, eom) = self.lookup(address)?;
        Ok(DeviceSession::new(
            address,
            definition,
            eom,
            transport,
            self.default_timeout,
        ))
    }

    fn lookup(
        &self,
        address: &str,
    ) -> SimResult<(Arc<crate::catalog::DeviceDefinition>, crate::catalog::EomConvention)> {
        let binding = self
            .catalog
            .binding(address)
            .ok_or_else(|| SimError::UnknownResource(address.to_string()))?;
        let definition = self.catalog.device(&binding.device).ok_or_else(|| {
            SimError::Catalog(format!(
                "binding '{address}' references missing device '{}'",
                binding.device
            ))
        })?;
        let eom = definition
            .eom_for(&binding.interface)
            .ok_or_else(|| {
                SimError::Catalog(format!(
                    "device '{}' lost its EOM entry for '{}'",
                    binding.device, binding.interface
                ))
            })?
            .clone();
        Ok((Arc::clone(definition), eom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
devices:
  dev:
    eom:
      GPIB INSTR: {q: "\n", r: "\n"}
    dialogues:
      - {q: "*IDN?", r: "softlab, dev"}
resources:
  GPIB0::8::INSTR:
    device: dev
"#;

    fn registry() -> ResourceRegistry {
        ResourceRegistry::new(Catalog::from_yaml(CATALOG).unwrap())
    }

    #[test]
    fn lists_addresses_and_devices() {
        let reg = registry();
        assert_eq!(reg.addresses(), vec!["GPIB0::8::INSTR"]);
        assert_eq!(reg.device_names(), vec!["dev"]);
    }

    #[tokio::test]
    async fn opens_a_simulated_session() {
        let reg = registry().with_timeout(Duration::from_millis(50));
        let session = reg.open("GPIB0::8::INSTR").unwrap();
        assert_eq!(session.address(), "GPIB0::8::INSTR");
        assert_eq!(session.timeout(), Duration::from_millis(50));
        assert_eq!(
            session.send_dialogue("*IDN?").await.unwrap().as_deref(),
            Some("softlab, dev")
        );
    }

    #[test]
    fn unknown_address_is_reported() {
        let err = registry().open("GPIB0::99::INSTR").unwrap_err();
        assert!(matches!(err, SimError::UnknownResource(_)));
    }
}
