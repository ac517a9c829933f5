//! Typed converter options
//!
//! Callers hand over raw `key=value` strings. Each converter declares the
//! keys it understands through [`OptionSpec`]s; the pipeline validates the
//! raw set against the specs of the converters it selected before building
//! any of them.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Type constraint of an option value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionKind {
    Int { min: i64, max: i64 },
    Bool,
    Choice(&'static [&'static str]),
}

/// Declaration of one recognized option key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionSpec {
    pub key: &'static str,
    pub kind: OptionKind,
    pub help: &'static str,
}

/// A validated option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Int(i64),
    Bool(bool),
    Choice(String),
}

/// Split `name=value` into its parts
pub fn parse_define(define: &str) -> Result<(String, String)> {
    match define.split_once('=') {
        Some((key, value)) if !value.is_empty() => Ok((key.trim().to_string(), value.trim().to_string())),
        Some((key, _)) => Err(Error::MissingOptionValue(key.trim().to_string())),
        None => Err(Error::MissingOptionValue(define.trim().to_string())),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl OptionSpec {
    fn parse(&self, value: &str) -> Result<OptionValue> {
        let invalid = |expected: String| Error::InvalidOption {
            key: self.key.to_string(),
            value: value.to_string(),
            expected,
        };
        match self.kind {
            OptionKind::Int { min, max } => match value.parse::<i64>() {
                Ok(v) if (min..=max).contains(&v) => Ok(OptionValue::Int(v)),
                _ => Err(invalid(format!("an integer in {}..={}", min, max))),
            },
            OptionKind::Bool => parse_bool(value)
                .map(OptionValue::Bool)
                .ok_or_else(|| invalid("true or false".into())),
            OptionKind::Choice(choices) => {
                let lower = value.to_ascii_lowercase();
                if choices.contains(&lower.as_str()) {
                    Ok(OptionValue::Choice(lower))
                } else {
                    Err(invalid(format!("one of {}", choices.join(", "))))
                }
            }
        }
    }
}

/// Validated option set shared by the converters of one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate raw pairs against the declared specs
    pub fn validate(raw: &[(String, String)], specs: &[OptionSpec]) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (key, value) in raw {
            let spec = specs
                .iter()
                .find(|s| s.key == key.as_str())
                .ok_or_else(|| Error::UnknownOption(key.clone()))?;
            values.insert(key.clone(), spec.parse(value)?);
        }
        Ok(Self { values })
    }

    pub fn int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(OptionValue::Int(v)) => *v,
            _ => default,
        }
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(OptionValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn choice<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.values.get(key) {
            Some(OptionValue::Choice(v)) => v,
            _ => default,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[OptionSpec] = &[
        OptionSpec {
            key: "decimation",
            kind: OptionKind::Int { min: 0, max: 64 },
            help: "",
        },
        OptionSpec {
            key: "useTestMode",
            kind: OptionKind::Bool,
            help: "",
        },
        OptionSpec {
            key: "noisePolicy",
            kind: OptionKind::Choice(&["tone", "noise", "mix"]),
            help: "",
        },
    ];

    fn raw(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("decimation=4").unwrap(),
            ("decimation".to_string(), "4".to_string())
        );
        assert!(matches!(
            parse_define("decimation"),
            Err(Error::MissingOptionValue(_))
        ));
        assert!(matches!(
            parse_define("decimation="),
            Err(Error::MissingOptionValue(_))
        ));
    }

    #[test]
    fn test_typed_values() {
        let opts = Options::validate(
            &raw(&[("decimation", "4"), ("useTestMode", "yes"), ("noisePolicy", "MIX")]),
            SPECS,
        )
        .unwrap();
        assert_eq!(opts.int("decimation", 0), 4);
        assert!(opts.bool("useTestMode", false));
        assert_eq!(opts.choice("noisePolicy", "tone"), "mix");
        assert_eq!(opts.int("missing", 7), 7);
    }

    #[test]
    fn test_rejects_unknown_and_invalid() {
        assert!(matches!(
            Options::validate(&raw(&[("ws", "1")]), SPECS),
            Err(Error::UnknownOption(_))
        ));
        assert!(matches!(
            Options::validate(&raw(&[("decimation", "100")]), SPECS),
            Err(Error::InvalidOption { .. })
        ));
        assert!(matches!(
            Options::validate(&raw(&[("noisePolicy", "both")]), SPECS),
            Err(Error::InvalidOption { .. })
        ));
    }
}
