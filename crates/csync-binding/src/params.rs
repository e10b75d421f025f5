//! Per-invocation parameter bag and branch guards

use crate::coerce::parse_bool;
use csync_model::FieldValue;
use std::collections::BTreeMap;

/// Parameter carrying the major platform version.
pub const VERSION: &str = "version";

/// Parameter overriding the template's namespace for one invocation.
pub const NAMESPACE: &str = "namespace";

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ParamValue {
    fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Text(t) => parse_bool(t).unwrap_or(false),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Text(t) => t.clone(),
        }
    }
}

impl From<ParamValue> for FieldValue {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Bool(b) => FieldValue::Bool(b),
            ParamValue::Int(i) => FieldValue::Int(i),
            ParamValue::Text(t) => FieldValue::Text(t),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Open key/value bag consulted by guards and default lookups.
///
/// A bag belongs to one marshal or unmarshal invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bag holding only the platform version.
    pub fn for_version(version: u64) -> Self {
        Self::new().with(VERSION, version as i64)
    }

    /// Builder: set a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Whether a named boolean parameter is set and true.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(ParamValue::truthy)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(ParamValue::as_text)
    }

    pub fn version(&self) -> Option<u64> {
        match self.get(VERSION)? {
            ParamValue::Int(i) => u64::try_from(*i).ok(),
            ParamValue::Text(t) => t.trim().parse().ok(),
            ParamValue::Bool(_) => None,
        }
    }
}

/// Test deciding whether a conditional branch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Named boolean parameter is true
    Flag(String),
    /// Named parameter renders to the given text
    Equals(String, String),
    /// Platform version is at least the given major version
    VersionAtLeast(u64),
    Not(Box<Guard>),
    All(Vec<Guard>),
    Any(Vec<Guard>),
}

impl Guard {
    pub fn flag(name: impl Into<String>) -> Self {
        Self::Flag(name.into())
    }

    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals(name.into(), value.into())
    }

    pub fn version_at_least(version: u64) -> Self {
        Self::VersionAtLeast(version)
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn eval(&self, params: &Params) -> bool {
        match self {
            Self::Flag(name) => params.flag(name),
            Self::Equals(name, value) => params.text(name).is_some_and(|v| &v == value),
            Self::VersionAtLeast(min) => params.version().is_some_and(|v| v >= *min),
            Self::Not(inner) => !inner.eval(params),
            Self::All(guards) => guards.iter().all(|g| g.eval(params)),
            Self::Any(guards) => guards.iter().any(|g| g.eval(params)),
        }
    }
}
