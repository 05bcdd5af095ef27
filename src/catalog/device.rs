//! Validated, immutable device model.
//!
//! A [`DeviceDefinition`] is compiled once from its raw schema at load time
//! and shared read-only (`Arc`) by every session bound to that device type.
//! All structural invariants are enforced here, so the engine and dispatcher
//! never re-validate per command.

use crate::catalog::format::{has_placeholder, Value, ValueTemplate};
use crate::catalog::schema::{DeviceSchema, PropertySchema};
use crate::error::{SimError, SimResult};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Request/response terminator pair for one interface kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EomConvention {
    /// Terminator ending each request.
    pub request: String,
    /// Terminator ending each response.
    pub response: String,
}

/// An unconditional exchange: literal query, optional literal response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialogue {
    /// Exact query text (after terminator stripping).
    pub query: String,
    /// Literal reply; `None` means the command produces no response.
    pub response: Option<String>,
}

/// The error-status query: answers with the pending error count.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusQuery {
    /// Exact query text, e.g. `ERR?`.
    pub query: String,
    /// Literal response when no error is pending.
    pub ok: String,
    /// Template rendered with the error count when nonzero.
    pub error: ValueTemplate,
}

/// Getter command: constant query plus a one-directive response template.
#[derive(Debug, Clone, PartialEq)]
pub struct GetterTemplate {
    /// Exact query text.
    pub query: String,
    /// Template the current value is rendered into / parsed out of.
    pub response: ValueTemplate,
}

/// One named, typed, gettable/settable quantity on a device.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    /// Property name, unique within its device.
    pub name: String,
    /// Default value seeding simulated state.
    pub default: Value,
    /// Getter command, if queryable.
    pub getter: Option<GetterTemplate>,
    /// Setter command template, if writable.
    pub setter: Option<ValueTemplate>,
}

/// A named instrument type: terminators, dialogues and properties.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDefinition {
    /// Device type name.
    pub name: String,
    /// End-of-message conventions per interface kind.
    pub eom: HashMap<String, EomConvention>,
    /// Error sentinel the instrument may answer in place of a value.
    pub error_token: Option<String>,
    /// Error-status query, if the device exposes one.
    pub status: Option<StatusQuery>,
    /// Unconditional dialogues in match order (first match wins).
    pub dialogues: Vec<Dialogue>,
    /// Properties keyed by name.
    pub properties: BTreeMap<String, PropertyDefinition>,
}

impl DeviceDefinition {
    /// Compile and validate a device from its raw schema. Any violation is a
    /// load-time [`SimError::Catalog`] failure.
    pub(crate) fn from_schema(name: &str, schema: DeviceSchema) -> SimResult<Self> {
        let eom = schema
            .eom
            .into_iter()
            .map(|(kind, e)| {
                (
                    kind,
                    EomConvention {
                        request: e.q,
                        response: e.r,
                    },
                )
            })
            .collect();

        let mut seen = HashSet::new();
        let mut dialogues = Vec::with_capacity(schema.dialogues.len());
        for d in schema.dialogues {
            if !seen.insert(d.q.clone()) {
                return Err(SimError::Catalog(format!(
                    "device '{name}': duplicate dialogue query '{}'",
                    d.q
                )));
            }
            dialogues.push(Dialogue {
                query: d.q,
                response: d.r,
            });
        }

        let status = match schema.status {
            Some(s) => {
                if seen.contains(&s.q) {
                    return Err(SimError::Catalog(format!(
                        "device '{name}': status query '{}' collides with a dialogue",
                        s.q
                    )));
                }
                Some(StatusQuery {
                    query: s.q,
                    ok: s.ok,
                    error: ValueTemplate::compile(&s.error).map_err(|e| {
                        SimError::Catalog(format!("device '{name}': status response: {e}"))
                    })?,
                })
            }
            None => None,
        };

        let mut properties = BTreeMap::new();
        for (prop_name, prop) in schema.properties {
            let compiled = compile_property(name, &prop_name, prop)?;
            properties.insert(prop_name, compiled);
        }

        Ok(Self {
            name: name.to_string(),
            eom,
            error_token: schema.error,
            status,
            dialogues,
            properties,
        })
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.get(name)
    }

    /// Look up a dialogue by its exact query text.
    pub fn find_dialogue(&self, query: &str) -> Option<&Dialogue> {
        self.dialogues.iter().find(|d| d.query == query)
    }

    /// Terminator pair for an interface kind such as "GPIB INSTR".
    pub fn eom_for(&self, interface: &str) -> Option<&EomConvention> {
        self.eom.get(interface)
    }
}

fn compile_property(
    device: &str,
    name: &str,
    schema: PropertySchema,
) -> SimResult<PropertyDefinition> {
    let default = value_from_yaml(&schema.default).ok_or_else(|| {
        SimError::Catalog(format!(
            "device '{device}': property '{name}' needs a scalar default value"
        ))
    })?;

    let getter = match schema.getter {
        Some(g) => {
            if has_placeholder(&g.q) {
                return Err(SimError::Catalog(format!(
                    "device '{device}': getter query for '{name}' must not contain a placeholder"
                )));
            }
            let response = ValueTemplate::compile(&g.r).map_err(|e| {
                SimError::Catalog(format!("device '{device}': getter for '{name}': {e}"))
            })?;
            // The default must be renderable, otherwise the simulated device
            // could never answer this query.
            response.render(&default).map_err(|e| {
                SimError::Catalog(format!(
                    "device '{device}': default for '{name}' does not fit its getter format: {e}"
                ))
            })?;
            Some(GetterTemplate {
                query: g.q,
                response,
            })
        }
        None => None,
    };

    let setter = match schema.setter {
        Some(s) => Some(ValueTemplate::compile(&s.q).map_err(|e| {
            SimError::Catalog(format!("device '{device}': setter for '{name}': {e}"))
        })?),
        None => None,
    };

    Ok(PropertyDefinition {
        name: name.to_string(),
        default,
        getter,
        setter,
    })
}

/// Convert a YAML scalar into a typed value. Non-scalars yield `None`.
fn value_from_yaml(value: &serde_yaml::Value) -> Option<Value> {
    match value {
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        serde_yaml::Value::String(s) => Some(Value::Text(s.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(yaml: &str) -> DeviceSchema {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn compiles_a_minimal_device() {
        let def = DeviceDefinition::from_schema(
            "attenuator",
            schema(
                r#"
eom:
  GPIB INSTR: {q: "\r\n", r: "\n"}
error: ERROR
dialogues:
  - {q: "*IDN?", r: "softlab, attenuator"}
  - {q: "*RST"}
properties:
  ch1:
    default: 0
    getter: {q: "ATTN?", r: "{:02.0f}"}
    setter: {q: "ATTN {:02.0f}"}
"#,
            ),
        )
        .unwrap();

        assert_eq!(def.name, "attenuator");
        assert_eq!(def.error_token.as_deref(), Some("ERROR"));
        assert_eq!(def.find_dialogue("*RST").unwrap().response, None);
        assert!(def.property("ch1").unwrap().getter.is_some());
        assert_eq!(def.eom_for("GPIB INSTR").unwrap().request, "\r\n");
    }

    #[test]
    fn duplicate_dialogue_query_is_fatal() {
        let err = DeviceDefinition::from_schema(
            "dev",
            schema("dialogues:\n  - {q: \"*IDN?\", r: \"a\"}\n  - {q: \"*IDN?\", r: \"b\"}\n"),
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Catalog(_)));
    }

    #[test]
    fn getter_query_with_placeholder_is_fatal() {
        let err = DeviceDefinition::from_schema(
            "dev",
            schema(
                "properties:\n  p:\n    default: 0\n    getter: {q: \"GET {}\", r: \"{:d}\"}\n",
            ),
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Catalog(_)));
    }

    #[test]
    fn default_must_fit_getter_format() {
        // A fractional default cannot be rendered by an integer directive.
        let err = DeviceDefinition::from_schema(
            "dev",
            schema(
                "properties:\n  p:\n    default: 0.5\n    getter: {q: \"P?\", r: \"{:d}\"}\n",
            ),
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Catalog(_)));
    }

    #[test]
    fn property_without_commands_is_legal() {
        let def = DeviceDefinition::from_schema(
            "dev",
            schema("properties:\n  serial:\n    default: \"A1234\"\n"),
        )
        .unwrap();
        let prop = def.property("serial").unwrap();
        assert!(prop.getter.is_none() && prop.setter.is_none());
        assert_eq!(prop.default, Value::Text("A1234".into()));
    }
}
