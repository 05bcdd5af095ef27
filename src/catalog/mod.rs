//! Declarative device and resource catalogs.
//!
//! The catalog is the single source of truth for what an instrument type
//! looks like on the wire: its terminators, its fixed dialogues and the
//! command templates behind each property. Catalogs are written in YAML,
//! parsed by [`schema`], compiled and validated into the immutable model in
//! [`device`] by [`loader`], and shared read-only from then on.

pub mod device;
pub mod format;
pub mod loader;
pub mod schema;

pub use device::{
    DeviceDefinition, Dialogue, EomConvention, GetterTemplate, PropertyDefinition, StatusQuery,
};
pub use format::{FormatSpec, Value, ValueTemplate};
pub use loader::{interface_kind, Catalog, ResourceBinding};
