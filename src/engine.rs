//! Simulated device engine.
//!
//! A [`SimulatedDevice`] holds the live property values for one bound
//! resource and answers raw command strings deterministically from its
//! definition. Matching runs in strict priority order: error-status query
//! and dialogues first, then getter queries, then setter templates; anything
//! else bumps the error counter and produces no reply, mirroring a real
//! instrument that reports errors only on explicit query.

use crate::catalog::device::DeviceDefinition;
use crate::catalog::format::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Live state for one simulated instrument instance.
///
/// Created when a session opens a simulated resource, seeded from the
/// definition's property defaults, dropped with the session. The definition
/// itself is shared immutable configuration.
#[derive(Debug)]
pub struct SimulatedDevice {
    definition: Arc<DeviceDefinition>,
    values: HashMap<String, Value>,
    error_count: u64,
}

impl SimulatedDevice {
    /// Create a fresh instance with every property at its default.
    pub fn new(definition: Arc<DeviceDefinition>) -> Self {
        let values = definition
            .properties
            .values()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect();
        Self {
            definition,
            values,
            error_count: 0,
        }
    }

    /// The shared definition this instance answers for.
    pub fn definition(&self) -> &Arc<DeviceDefinition> {
        &self.definition
    }

    /// Current value of a property, if it exists.
    pub fn value(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    /// Number of unmatched commands since the last error-status query.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Answer one incoming command (request terminator already stripped).
    ///
    /// Returns the raw response text (terminator not yet appended) or `None`
    /// when the command produces no reply. Matching is byte-exact; no case
    /// folding or whitespace trimming happens here.
    pub fn handle(&mut self, command: &str) -> Option<String> {
        // 1a. Error-status query: dynamic dialogue reporting the counter.
        if let Some(status) = &self.definition.status {
            if status.query == command {
                let reply = if self.error_count == 0 {
                    status.ok.clone()
                } else {
                    let count = Value::Int(self.error_count as i64);
                    self.error_count = 0;
                    match status.error.render(&count) {
                        Ok(text) => text,
                        // Unreachable for an integer count; keep the device
                        // answering rather than going mute.
                        Err(_) => status.ok.clone(),
                    }
                };
                log::debug!("{}: '{command}' -> '{reply}'", self.definition.name);
                return Some(reply);
            }
        }

        // 1b. Unconditional dialogues, first match wins.
        if let Some(dialogue) = self.definition.find_dialogue(command) {
            log::debug!(
                "{}: dialogue '{command}' -> {:?}",
                self.definition.name,
                dialogue.response
            );
            return dialogue.response.clone();
        }

        // 2. Getter queries, exact match.
        for prop in self.definition.properties.values() {
            let Some(getter) = &prop.getter else { continue };
            if getter.query != command {
                continue;
            }
            let Some(value) = self.values.get(&prop.name) else {
                continue;
            };
            match getter.response.render(value) {
                Ok(reply) => {
                    log::debug!(
                        "{}: get '{}' -> '{reply}'",
                        self.definition.name,
                        prop.name
                    );
                    return Some(reply);
                }
                Err(err) => {
                    // Stored value no longer fits the getter format; report
                    // through the error counter like any bad command.
                    log::warn!(
                        "{}: cannot render '{}': {err}",
                        self.definition.name,
                        prop.name
                    );
                    self.error_count += 1;
                    return None;
                }
            }
        }

        // 3. Setter templates: prefix/suffix match, then parse and store.
        for prop in self.definition.properties.values() {
            let Some(setter) = &prop.setter else { continue };
            let Some(raw_value) = setter.extract(command) else {
                continue;
            };
            match setter.spec().parse(raw_value) {
                Ok(value) => {
                    log::debug!(
                        "{}: set '{}' = {value}",
                        self.definition.name,
                        prop.name
                    );
                    self.values.insert(prop.name.clone(), value);
                    return None;
                }
                // A setter whose value fails to parse is a no-match; keep
                // scanning, then fall through to the miss path.
                Err(err) => log::debug!(
                    "{}: '{command}' shaped like setter for '{}' but: {err}",
                    self.definition.name,
                    prop.name
                ),
            }
        }

        // 4. No match: record and stay silent. The error sentinel is never
        // emitted unsolicited.
        self.error_count += 1;
        log::warn!(
            "{}: unrecognized command '{command}' (error count {})",
            self.definition.name,
            self.error_count
        );
        None
    }
}
