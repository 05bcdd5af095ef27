//! Catalog loading and fail-fast validation.
//!
//! The catalog is declarative startup configuration: device types under
//! `devices:` and address bindings under `resources:`. Everything that can
//! make the configuration unusable — duplicate dialogue queries, malformed
//! directives, bindings to unknown devices, addresses whose interface kind
//! has no end-of-message entry — fails here, never per command.

use crate::catalog::device::DeviceDefinition;
use crate::catalog::schema::CatalogFile;
use crate::error::{SimError, SimResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Binds one resource address to a device type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBinding {
    /// Resource address, e.g. `GPIB0::8::INSTR`.
    pub address: String,
    /// Device type name answering at this address.
    pub device: String,
    /// Interface kind derived from the address, e.g. `GPIB INSTR`.
    pub interface: String,
}

/// Validated device and resource catalogs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    devices: HashMap<String, Arc<DeviceDefinition>>,
    resources: HashMap<String, ResourceBinding>,
}

impl Catalog {
    /// Parse and validate a catalog from YAML text.
    pub fn from_yaml(text: &str) -> SimResult<Self> {
        let file: CatalogFile = serde_yaml::from_str(text)?;

        let mut devices = HashMap::new();
        for (name, schema) in file.devices {
            let definition = DeviceDefinition::from_schema(&name, schema)?;
            devices.insert(name, Arc::new(definition));
        }

        let mut resources = HashMap::new();
        for (address, binding) in file.resources {
            let device = devices.get(&binding.device).ok_or_else(|| {
                SimError::Catalog(format!(
                    "resource '{address}' is bound to unknown device '{}'",
                    binding.device
                ))
            })?;
            let interface = interface_kind(&address)?;
            if device.eom_for(&interface).is_none() {
                return Err(SimError::Catalog(format!(
                    "device '{}' has no end-of-message entry for interface '{interface}' \
                     required by resource '{address}'",
                    binding.device
                )));
            }
            resources.insert(
                address.clone(),
                ResourceBinding {
                    address,
                    device: binding.device,
                    interface,
                },
            );
        }

        log::info!(
            "Loaded catalog: {} device type(s), {} resource(s)",
            devices.len(),
            resources.len()
        );
        Ok(Self { devices, resources })
    }

    /// Load and validate a catalog file.
    pub fn from_path(path: &Path) -> SimResult<Self> {
        log::info!("Loading catalog from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Look up a device definition by type name.
    pub fn device(&self, name: &str) -> Option<&Arc<DeviceDefinition>> {
        self.devices.get(name)
    }

    /// Look up the binding for a resource address.
    pub fn binding(&self, address: &str) -> Option<&ResourceBinding> {
        self.resources.get(address)
    }

    /// All known device type names.
    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// All bound resource addresses.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }
}

/// Derive the interface kind from a resource address.
///
/// `"GPIB0::8::INSTR"` yields `"GPIB INSTR"`: the leading alphabetic part of
/// the first segment plus the final segment.
pub fn interface_kind(address: &str) -> SimResult<String> {
    let mut segments = address.split("::");
    let head = segments.next().unwrap_or_default();
    let alpha_end = head
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(head.len());
    let kind = &head[..alpha_end];
    let suffix = segments.last();
    match (kind.is_empty(), suffix) {
        (false, Some(suffix)) if !suffix.is_empty() => Ok(format!("{kind} {suffix}")),
        _ => Err(SimError::Catalog(format!(
            "cannot derive an interface kind from address '{address}'"
        ))),
    }
}
