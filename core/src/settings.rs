//! Typed, self-describing key/value settings.
//!
//! Every key is declared up front with a [`Descriptor`] carrying its type,
//! default and admissible range. Values can then be read and modified only
//! with the declared type, which is what lets calculators expose a
//! dictionary-like settings object without losing validation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("unknown setting '{0}'")]
    UnknownKey(String),

    #[error("setting '{key}' expects a {expected} value, got {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("setting '{key}' is out of range: {value}")]
    OutOfRange { key: String, value: String },

    #[error("setting '{key}' does not allow option '{value}' (allowed: {allowed})")]
    InvalidOption {
        key: String,
        value: String,
        allowed: String,
    },
}

/// A single setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl SettingValue {
    fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::Int(_) => "int",
            SettingValue::Double(_) => "double",
            SettingValue::String(_) => "string",
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(v) => write!(f, "{v}"),
            SettingValue::Int(v) => write!(f, "{v}"),
            SettingValue::Double(v) => write!(f, "{v}"),
            SettingValue::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Double(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::String(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::String(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorKind {
    Bool {
        default: bool,
    },
    Int {
        default: i64,
        min: Option<i64>,
        max: Option<i64>,
    },
    Double {
        default: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    String {
        default: String,
    },
    OptionList {
        options: Vec<String>,
        default: String,
    },
}

/// Declaration of one setting: description, type, default and range.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub description: String,
    pub kind: DescriptorKind,
}

impl Descriptor {
    pub fn boolean(description: &str, default: bool) -> Self {
        Self::with_kind(description, DescriptorKind::Bool { default })
    }

    pub fn int(description: &str, default: i64) -> Self {
        Self::with_kind(
            description,
            DescriptorKind::Int {
                default,
                min: None,
                max: None,
            },
        )
    }

    pub fn double(description: &str, default: f64) -> Self {
        Self::with_kind(
            description,
            DescriptorKind::Double {
                default,
                min: None,
                max: None,
            },
        )
    }

    pub fn string(description: &str, default: &str) -> Self {
        Self::with_kind(
            description,
            DescriptorKind::String {
                default: default.to_string(),
            },
        )
    }

    pub fn options(description: &str, options: &[&str], default: &str) -> Self {
        Self::with_kind(
            description,
            DescriptorKind::OptionList {
                options: options.iter().map(|o| o.to_string()).collect(),
                default: default.to_string(),
            },
        )
    }

    fn with_kind(description: &str, kind: DescriptorKind) -> Self {
        Self {
            description: description.to_string(),
            kind,
        }
    }

    /// Set the lower bound of an int or double descriptor.
    pub fn with_minimum(mut self, minimum: f64) -> Self {
        match &mut self.kind {
            DescriptorKind::Int { min, .. } => *min = Some(minimum as i64),
            DescriptorKind::Double { min, .. } => *min = Some(minimum),
            _ => {}
        }
        self
    }

    /// Set the upper bound of an int or double descriptor.
    pub fn with_maximum(mut self, maximum: f64) -> Self {
        match &mut self.kind {
            DescriptorKind::Int { max, .. } => *max = Some(maximum as i64),
            DescriptorKind::Double { max, .. } => *max = Some(maximum),
            _ => {}
        }
        self
    }

    pub fn default_value(&self) -> SettingValue {
        match &self.kind {
            DescriptorKind::Bool { default } => SettingValue::Bool(*default),
            DescriptorKind::Int { default, .. } => SettingValue::Int(*default),
            DescriptorKind::Double { default, .. } => SettingValue::Double(*default),
            DescriptorKind::String { default } => SettingValue::String(default.clone()),
            DescriptorKind::OptionList { default, .. } => SettingValue::String(default.clone()),
        }
    }

    fn expected_type(&self) -> &'static str {
        match self.kind {
            DescriptorKind::Bool { .. } => "bool",
            DescriptorKind::Int { .. } => "int",
            DescriptorKind::Double { .. } => "double",
            DescriptorKind::String { .. } | DescriptorKind::OptionList { .. } => "string",
        }
    }

    /// Coerce `value` into this descriptor's type, widening ints to doubles.
    fn coerce(&self, key: &str, value: SettingValue) -> Result<SettingValue, SettingsError> {
        let mismatch = |value: &SettingValue| SettingsError::TypeMismatch {
            key: key.to_string(),
            expected: self.expected_type(),
            found: value.type_name().to_string(),
        };
        match (&self.kind, value) {
            (DescriptorKind::Bool { .. }, v @ SettingValue::Bool(_)) => Ok(v),
            (DescriptorKind::Int { .. }, v @ SettingValue::Int(_)) => Ok(v),
            (DescriptorKind::Double { .. }, v @ SettingValue::Double(_)) => Ok(v),
            (DescriptorKind::Double { .. }, SettingValue::Int(i)) => Ok(SettingValue::Double(i as f64)),
            (DescriptorKind::String { .. }, v @ SettingValue::String(_)) => Ok(v),
            (DescriptorKind::OptionList { .. }, v @ SettingValue::String(_)) => Ok(v),
            (_, other) => Err(mismatch(&other)),
        }
    }

    fn validate(&self, key: &str, value: &SettingValue) -> Result<(), SettingsError> {
        let out_of_range = || SettingsError::OutOfRange {
            key: key.to_string(),
            value: value.to_string(),
        };
        match (&self.kind, value) {
            (DescriptorKind::Int { min, max, .. }, SettingValue::Int(v)) => {
                if min.map_or(false, |m| *v < m) || max.map_or(false, |m| *v > m) {
                    return Err(out_of_range());
                }
            }
            (DescriptorKind::Double { min, max, .. }, SettingValue::Double(v)) => {
                if min.map_or(false, |m| *v < m) || max.map_or(false, |m| *v > m) {
                    return Err(out_of_range());
                }
            }
            (DescriptorKind::OptionList { options, .. }, SettingValue::String(v)) => {
                if !options.iter().any(|o| o == v) {
                    return Err(SettingsError::InvalidOption {
                        key: key.to_string(),
                        value: v.clone(),
                        allowed: options.join(", "),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// A named collection of declared settings and their current values.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    name: String,
    descriptors: Vec<(String, Descriptor)>,
    values: HashMap<String, SettingValue>,
}

impl Settings {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptors: Vec::new(),
            values: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a setting. Re-declaring a key replaces its descriptor.
    pub fn push(&mut self, key: &str, descriptor: Descriptor) {
        self.values.insert(key.to_string(), descriptor.default_value());
        match self.descriptors.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = descriptor,
            None => self.descriptors.push((key.to_string(), descriptor)),
        }
    }

    pub fn reset_to_defaults(&mut self) {
        for (key, descriptor) in &self.descriptors {
            self.values.insert(key.clone(), descriptor.default_value());
        }
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.descriptor(key).is_some()
    }

    pub fn descriptor(&self, key: &str) -> Option<&Descriptor> {
        self.descriptors
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, d)| d)
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    /// Set a value after type coercion. Range checks are deferred to
    /// [`Settings::check`], matching how values are edited one at a time.
    pub fn set(&mut self, key: &str, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        let descriptor = self
            .descriptor(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        let value = descriptor.coerce(key, value.into())?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, SettingsError> {
        match self.lookup(key)? {
            SettingValue::Bool(v) => Ok(*v),
            other => Err(self.type_error(key, "bool", other)),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i64, SettingsError> {
        match self.lookup(key)? {
            SettingValue::Int(v) => Ok(*v),
            other => Err(self.type_error(key, "int", other)),
        }
    }

    pub fn get_double(&self, key: &str) -> Result<f64, SettingsError> {
        match self.lookup(key)? {
            SettingValue::Double(v) => Ok(*v),
            other => Err(self.type_error(key, "double", other)),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<&str, SettingsError> {
        match self.lookup(key)? {
            SettingValue::String(v) => Ok(v.as_str()),
            other => Err(self.type_error(key, "string", other)),
        }
    }

    pub fn modify_bool(&mut self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.set(key, value)
    }

    pub fn modify_int(&mut self, key: &str, value: i64) -> Result<(), SettingsError> {
        self.set(key, value)
    }

    pub fn modify_double(&mut self, key: &str, value: f64) -> Result<(), SettingsError> {
        self.set(key, value)
    }

    pub fn modify_string(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.set(key, value)
    }

    /// Apply several overrides, stopping at the first rejected one.
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = (&'a String, &'a SettingValue)>,
    {
        for (key, value) in overrides {
            self.set(key, value.clone())?;
        }
        Ok(())
    }

    /// Validate every value against its descriptor.
    pub fn check(&self) -> Result<(), SettingsError> {
        for (key, descriptor) in &self.descriptors {
            let value = self.lookup(key)?;
            descriptor.validate(key, value)?;
        }
        Ok(())
    }

    pub fn valid(&self) -> bool {
        self.check().is_ok()
    }

    fn lookup(&self, key: &str) -> Result<&SettingValue, SettingsError> {
        self.values
            .get(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))
    }

    fn type_error(&self, key: &str, expected: &'static str, found: &SettingValue) -> SettingsError {
        SettingsError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: found.type_name().to_string(),
        }
    }
}
