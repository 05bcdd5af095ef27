//! Wire-format directives for property values.
//!
//! Catalogs describe how a value crosses the wire with Python-style directive
//! strings (`"{:.12f}"`, `"{:02.0f}"`, `"{:d}"`, `"{:s}"`, `"{}"`). Rather
//! than interpolating those strings at runtime, each directive is compiled
//! once at load time into a [`FormatSpec`] variant, so rendering and parsing
//! are exhaustively checked and a set-then-get round trip reproduces the
//! configured precision or width byte for byte.

use crate::error::{SimError, SimResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Matches a bare directive such as `{}`, `{:s}`, `{:d}`, `{:05d}`,
/// `{:.4f}` or `{:02.0f}` (compiled once).
static DIRECTIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{(?::(0?)(\d*)(?:\.(\d+))?([dfs]?))?\}$").expect("Invalid directive regex")
});

/// Finds embedded directives inside a command template (compiled once).
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("Invalid placeholder regex"));

/// A typed value held by a property or exchanged over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Signed integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Free-form text value.
    Text(String),
}

impl Value {
    /// Convert to f64 for numeric rendering.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(_) => None,
        }
    }

    /// Convert to i64 without losing information.
    ///
    /// A float with a fractional part does not convert; integer directives
    /// reject such values instead of rounding (see DESIGN.md).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// How a single value is rendered into and parsed out of command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSpec {
    /// Fixed number of decimal places, e.g. `{:.4f}` renders `1` as `1.0000`.
    FixedDecimal {
        /// Decimal places emitted and expected.
        precision: usize,
    },
    /// Integer, optionally zero-padded to a fixed width, e.g. `{:02.0f}`
    /// renders `5` as `05`. Width 0 means no padding.
    FixedInt {
        /// Exact field width (0 = unconstrained).
        width: usize,
    },
    /// Free-form text, `{}` or `{:s}`.
    FreeText,
}

impl FormatSpec {
    /// Compile a bare directive string into a spec.
    ///
    /// Unsupported directives (hex, space padding, width on a fractional
    /// float) are a load-time [`SimError::Catalog`] failure.
    pub fn compile(directive: &str) -> SimResult<Self> {
        let caps = DIRECTIVE_REGEX.captures(directive).ok_or_else(|| {
            SimError::Catalog(format!("unsupported format directive '{directive}'"))
        })?;

        let zero_pad = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let width: usize = match caps.get(2) {
            Some(m) if !m.as_str().is_empty() => m
                .as_str()
                .parse()
                .map_err(|_| SimError::Catalog(format!("bad width in '{directive}'")))?,
            _ => 0,
        };
        let precision: Option<usize> = match caps.get(3) {
            Some(m) => Some(
                m.as_str()
                    .parse()
                    .map_err(|_| SimError::Catalog(format!("bad precision in '{directive}'")))?,
            ),
            None => None,
        };
        let kind = caps.get(4).map(|m| m.as_str()).unwrap_or("");

        if width > 0 && !zero_pad {
            return Err(SimError::Catalog(format!(
                "space-padded width in '{directive}' is not supported"
            )));
        }

        match (kind, precision) {
            ("" | "s", None) if width == 0 => Ok(FormatSpec::FreeText),
            ("d", None) => Ok(FormatSpec::FixedInt { width }),
            ("f", Some(0)) => Ok(FormatSpec::FixedInt { width }),
            ("f", Some(precision)) if width == 0 => Ok(FormatSpec::FixedDecimal { precision }),
            _ => Err(SimError::Catalog(format!(
                "unsupported format directive '{directive}'"
            ))),
        }
    }

    /// Render a value per this spec.
    ///
    /// Fails with [`SimError::Format`] when the value's type is incompatible
    /// (text against a numeric directive, fractional float against an
    /// integer directive).
    pub fn render(&self, value: &Value) -> SimResult<String> {
        match self {
            FormatSpec::FixedDecimal { precision } => {
                let x = value
                    .as_f64()
                    .ok_or_else(|| SimError::Format(format!("'{value}' is not numeric")))?;
                Ok(format!("{:.1$}", x, *precision))
            }
            FormatSpec::FixedInt { width } => {
                let n = value.as_i64().ok_or_else(|| {
                    SimError::Format(format!("'{value}' is not a whole number"))
                })?;
                if *width > 0 {
                    Ok(format!("{:01$}", n, *width))
                } else {
                    Ok(n.to_string())
                }
            }
            FormatSpec::FreeText => Ok(value.to_string()),
        }
    }

    /// Parse response text into a typed value per this spec.
    ///
    /// The text is taken exactly as delivered; no trimming or case folding.
    pub fn parse(&self, text: &str) -> SimResult<Value> {
        match self {
            FormatSpec::FixedDecimal { .. } => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| SimError::Parse(format!("'{text}' is not a valid float"))),
            FormatSpec::FixedInt { width } => {
                if *width > 0 && text.len() != *width {
                    return Err(SimError::Parse(format!(
                        "'{text}' does not have the expected width {width}"
                    )));
                }
                text.parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| SimError::Parse(format!("'{text}' is not a valid integer")))
            }
            FormatSpec::FreeText => Ok(Value::Text(text.to_string())),
        }
    }
}

/// Returns true when the string embeds at least one `{...}` directive.
pub(crate) fn has_placeholder(text: &str) -> bool {
    PLACEHOLDER_REGEX.is_match(text)
}

/// A command or response template with exactly one embedded value directive.
///
/// `"CHAN 1;ATTN {:02.0f}"` compiles to prefix `"CHAN 1;ATTN "`, an empty
/// suffix and a [`FormatSpec::FixedInt`] of width 2. Used for setter queries,
/// getter responses and the error-status response.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTemplate {
    prefix: String,
    suffix: String,
    spec: FormatSpec,
}

impl ValueTemplate {
    /// Compile a template, rejecting zero or multiple placeholders.
    pub fn compile(template: &str) -> SimResult<Self> {
        let mut found = PLACEHOLDER_REGEX.find_iter(template);
        let m = found.next().ok_or_else(|| {
            SimError::Catalog(format!("template '{template}' has no value placeholder"))
        })?;
        if found.next().is_some() {
            return Err(SimError::Catalog(format!(
                "template '{template}' has more than one value placeholder"
            )));
        }
        Ok(Self {
            prefix: template[..m.start()].to_string(),
            suffix: template[m.end()..].to_string(),
            spec: FormatSpec::compile(m.as_str())?,
        })
    }

    /// The compiled directive.
    pub fn spec(&self) -> &FormatSpec {
        &self.spec
    }

    /// Render the template with a value substituted into the placeholder.
    pub fn render(&self, value: &Value) -> SimResult<String> {
        Ok(format!(
            "{}{}{}",
            self.prefix,
            self.spec.render(value)?,
            self.suffix
        ))
    }

    /// Match literal text against the template, returning the substring that
    /// occupies the placeholder position. `None` when prefix or suffix
    /// differ; matching is byte-exact.
    pub fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())
    }

    /// Extract and parse in one step, failing with [`SimError::Parse`] when
    /// the text does not match the template shape.
    pub fn parse(&self, text: &str) -> SimResult<Value> {
        let inner = self.extract(text).ok_or_else(|| {
            SimError::Parse(format!(
                "'{text}' does not match template '{}{{..}}{}'",
                self.prefix, self.suffix
            ))
        })?;
        self.spec.parse(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_common_directives() {
        assert_eq!(FormatSpec::compile("{}").unwrap(), FormatSpec::FreeText);
        assert_eq!(FormatSpec::compile("{:s}").unwrap(), FormatSpec::FreeText);
        assert_eq!(
            FormatSpec::compile("{:d}").unwrap(),
            FormatSpec::FixedInt { width: 0 }
        );
        assert_eq!(
            FormatSpec::compile("{:05d}").unwrap(),
            FormatSpec::FixedInt { width: 5 }
        );
        assert_eq!(
            FormatSpec::compile("{:.12f}").unwrap(),
            FormatSpec::FixedDecimal { precision: 12 }
        );
        assert_eq!(
            FormatSpec::compile("{:02.0f}").unwrap(),
            FormatSpec::FixedInt { width: 2 }
        );
    }

    #[test]
    fn rejects_unsupported_directives() {
        assert!(FormatSpec::compile("{:x}").is_err());
        assert!(FormatSpec::compile("{:8.3f}").is_err());
        assert!(FormatSpec::compile("{:2d}").is_err());
        assert!(FormatSpec::compile("not a directive").is_err());
    }

    #[test]
    fn fixed_decimal_render_is_byte_exact() {
        let spec = FormatSpec::FixedDecimal { precision: 12 };
        assert_eq!(
            spec.render(&Value::Float(1.234567890123)).unwrap(),
            "1.234567890123"
        );
        let spec = FormatSpec::FixedDecimal { precision: 4 };
        assert_eq!(spec.render(&Value::Int(1)).unwrap(), "1.0000");
    }

    #[test]
    fn fixed_int_render_pads_to_width() {
        let spec = FormatSpec::FixedInt { width: 2 };
        assert_eq!(spec.render(&Value::Int(5)).unwrap(), "05");
        let spec = FormatSpec::FixedInt { width: 0 };
        assert_eq!(spec.render(&Value::Int(1)).unwrap(), "1");
    }

    #[test]
    fn fractional_value_is_rejected_by_integer_directive() {
        let spec = FormatSpec::FixedInt { width: 0 };
        let err = spec.render(&Value::Float(1.5)).unwrap_err();
        assert!(matches!(err, SimError::Format(_)));
        // Whole-number floats are accepted.
        assert_eq!(spec.render(&Value::Float(3.0)).unwrap(), "3");
    }

    #[test]
    fn text_is_rejected_by_numeric_directives() {
        let spec = FormatSpec::FixedDecimal { precision: 2 };
        assert!(spec.render(&Value::Text("on".into())).is_err());
    }

    #[test]
    fn parse_enforces_width_and_shape() {
        let spec = FormatSpec::FixedInt { width: 2 };
        assert_eq!(spec.parse("05").unwrap(), Value::Int(5));
        assert!(matches!(spec.parse("5"), Err(SimError::Parse(_))));
        assert!(matches!(spec.parse("ab"), Err(SimError::Parse(_))));

        let spec = FormatSpec::FixedDecimal { precision: 4 };
        assert_eq!(spec.parse("1.0000").unwrap(), Value::Float(1.0));
        assert!(spec.parse(" 1.0").is_err()); // no whitespace trimming
    }

    #[test]
    fn value_template_round_trips() {
        let tpl = ValueTemplate::compile("CHAN 1;ATTN {:02.0f}").unwrap();
        assert_eq!(tpl.render(&Value::Int(7)).unwrap(), "CHAN 1;ATTN 07");
        assert_eq!(tpl.extract("CHAN 1;ATTN 07"), Some("07"));
        assert_eq!(tpl.parse("CHAN 1;ATTN 07").unwrap(), Value::Int(7));
        assert_eq!(tpl.extract("CHAN 2;ATTN 07"), None);
    }

    #[test]
    fn value_template_requires_exactly_one_placeholder() {
        assert!(ValueTemplate::compile("ATTN?").is_err());
        assert!(ValueTemplate::compile("SET {} {}").is_err());
    }

    #[test]
    fn bare_directive_is_a_valid_template() {
        let tpl = ValueTemplate::compile("{:.4f}").unwrap();
        assert_eq!(tpl.render(&Value::Float(1.0)).unwrap(), "1.0000");
        assert_eq!(tpl.parse("1.0000").unwrap(), Value::Float(1.0));
    }
}
