//! # visa-sim
//!
//! Declarative descriptions of laboratory instruments as addressable
//! parameter sets over a VISA/GPIB-style query-response protocol, plus a
//! deterministic in-process simulator so software can exercise the protocol
//! without physical hardware.
//!
//! ## Crate Structure
//!
//! - **`catalog`**: the declarative device/resource catalogs — YAML schema,
//!   format directives (`{:.12f}`, `{:02.0f}`, ...), the validated immutable
//!   device model and the fail-fast loader.
//! - **`config`**: `Settings` loaded from TOML (catalog path, timeouts).
//! - **`engine`**: the simulated device — live property state seeded from
//!   defaults, answering commands by dialogue/getter/setter matching and
//!   tracking an error counter for unmatched traffic.
//! - **`error`**: the `SimError` taxonomy shared by every fallible path.
//! - **`registry`**: resource addresses to open sessions; fresh simulated
//!   state per `open`, caller-supplied transports for real hardware.
//! - **`session`**: the client-facing dispatcher — `get`, `set`,
//!   `send_dialogue`, bounded timeouts, typed parsing.
//! - **`transport`**: the `Transport` seam plus the simulator backend.
//!
//! ## Example
//!
//! ```rust,no_run
//! use visa_sim::{Catalog, ResourceRegistry, Value};
//!
//! # async fn demo() -> visa_sim::SimResult<()> {
//! let catalog = Catalog::from_path("catalog/devices.yaml".as_ref())?;
//! let registry = ResourceRegistry::new(catalog);
//!
//! let session = registry.open("GPIB0::8::INSTR")?;
//! let idn = session.send_dialogue("*IDN?").await?;
//! println!("connected to {}", idn.unwrap_or_default());
//!
//! session.set("ch1", 31).await?;
//! assert_eq!(session.get("ch1").await?, Value::Int(31));
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod session;
pub mod transport;

pub use catalog::{Catalog, DeviceDefinition, FormatSpec, Value};
pub use config::Settings;
pub use engine::SimulatedDevice;
pub use error::{SimError, SimResult};
pub use registry::ResourceRegistry;
pub use session::DeviceSession;
pub use transport::{SimTransport, Transport};
