//! Raw serde types mirroring the YAML catalog format.
//!
//! These structs deserialize the catalog file verbatim; validation and
//! compilation into the strongly-typed model happens in
//! [`loader`](crate::catalog::loader) and [`device`](crate::catalog::device).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level catalog file: device types plus resource bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Catalog format version string, informational.
    #[serde(default)]
    pub spec: Option<String>,

    /// Device type name to device description.
    pub devices: HashMap<String, DeviceSchema>,

    /// Resource address to binding.
    #[serde(default)]
    pub resources: HashMap<String, ResourceSchema>,
}

/// One device type as written in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSchema {
    /// End-of-message conventions keyed by interface kind, e.g. "GPIB INSTR".
    #[serde(default)]
    pub eom: HashMap<String, EomSchema>,

    /// Error sentinel token, e.g. "ERROR".
    #[serde(default)]
    pub error: Option<String>,

    /// Error-status query with a dynamic count-bearing response.
    #[serde(default)]
    pub status: Option<StatusSchema>,

    /// Unconditional command/response exchanges, in match order.
    #[serde(default)]
    pub dialogues: Vec<DialogueSchema>,

    /// Property name to property description.
    #[serde(default)]
    pub properties: HashMap<String, PropertySchema>,
}

/// Request/response terminators for one interface kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EomSchema {
    /// Terminator appended to requests.
    pub q: String,
    /// Terminator appended to responses.
    pub r: String,
}

/// A literal query with an optional literal response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueSchema {
    /// Literal query string.
    pub q: String,
    /// Literal response; absent means no reply is produced.
    #[serde(default)]
    pub r: Option<String>,
}

/// Error-status query description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSchema {
    /// Literal query string, e.g. "ERR?".
    pub q: String,
    /// Literal response when no error is pending.
    pub ok: String,
    /// Response template rendered with the pending error count.
    pub error: String,
}

/// One property: default value plus optional getter/setter commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Default value seeding simulated state.
    #[serde(default)]
    pub default: serde_yaml::Value,

    /// Getter command, if the property can be queried.
    #[serde(default)]
    pub getter: Option<GetterSchema>,

    /// Setter command, if the property can be written.
    #[serde(default)]
    pub setter: Option<SetterSchema>,
}

/// Getter: constant query plus response template with one directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetterSchema {
    /// Query string; must not contain a placeholder.
    pub q: String,
    /// Response template, e.g. `"{:.12f}"`.
    pub r: String,
}

/// Setter: query template with exactly one value placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetterSchema {
    /// Query template, e.g. `"CHAN 1;ATTN {:02.0f}"`.
    pub q: String,
}

/// One resource binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Name of the device type answering at this address.
    pub device: String,
}
