//! Modules: named bundles of interface implementations.

use crate::calculator::Calculator;
use crate::error::{CoreError, Result};
use std::fmt;
use std::str::FromStr;

/// Interfaces a module can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    Calculator,
}

impl Interface {
    pub fn name(self) -> &'static str {
        match self {
            Interface::Calculator => "calculator",
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interface {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "calculator" => Ok(Interface::Calculator),
            _ => Err(CoreError::UnknownInterface(s.to_string())),
        }
    }
}

pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// True if this module implements `model` for `interface`.
    /// Model names are matched case-insensitively.
    fn has(&self, interface: Interface, model: &str) -> bool;

    fn get_calculator(&self, model: &str) -> Result<Box<dyn Calculator>>;

    fn announce_interfaces(&self) -> Vec<Interface>;

    fn announce_models(&self, interface: Interface) -> Vec<String>;
}
