//! The `Serenity` module: DFT, HF and CC calculators.

use crate::calculators::{Cc, Dft, Hf, SerenityCalculator};
use crate::engine::Engine;
use crate::loader::RESOURCES_ENV;
use crate::MODULE_NAME;
use scine_core::{Calculator, CoreError, Interface, Module, PluginConfig, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculatorModel {
    Dft,
    Hf,
    Cc,
}

impl CalculatorModel {
    pub const ALL: [CalculatorModel; 3] = [CalculatorModel::Dft, CalculatorModel::Hf, CalculatorModel::Cc];

    pub fn name(self) -> &'static str {
        match self {
            CalculatorModel::Dft => "DFT",
            CalculatorModel::Hf => "HF",
            CalculatorModel::Cc => "CC",
        }
    }
}

impl fmt::Display for CalculatorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CalculatorModel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        CalculatorModel::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::ClassNotImplemented {
                interface: Interface::Calculator.to_string(),
                model: s.to_string(),
            })
    }
}

pub struct SerenityModule {
    engine: Arc<dyn Engine>,
    resource_root: String,
}

impl SerenityModule {
    /// The resource root comes from `config`, falling back to the
    /// `SERENITY_RESOURCES` environment variable.
    pub fn new(engine: Arc<dyn Engine>, config: &PluginConfig) -> Self {
        let resource_root = match &config.resource_root {
            Some(path) => with_trailing_separator(&path.to_string_lossy()),
            None => std::env::var(RESOURCES_ENV)
                .map(|root| with_trailing_separator(&root))
                .unwrap_or_default(),
        };
        Self {
            engine,
            resource_root,
        }
    }

    pub fn resource_root(&self) -> &str {
        &self.resource_root
    }

    pub fn calculator(&self, model: CalculatorModel) -> Box<dyn Calculator> {
        let engine = Arc::clone(&self.engine);
        match model {
            CalculatorModel::Dft => Box::new(SerenityCalculator::new(Dft, engine, &self.resource_root)),
            CalculatorModel::Hf => Box::new(SerenityCalculator::new(Hf, engine, &self.resource_root)),
            CalculatorModel::Cc => Box::new(SerenityCalculator::new(Cc, engine, &self.resource_root)),
        }
    }
}

fn with_trailing_separator(path: &str) -> String {
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

impl Module for SerenityModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn has(&self, interface: Interface, model: &str) -> bool {
        match interface {
            Interface::Calculator => model.parse::<CalculatorModel>().is_ok(),
        }
    }

    fn get_calculator(&self, model: &str) -> Result<Box<dyn Calculator>> {
        Ok(self.calculator(model.parse()?))
    }

    fn announce_interfaces(&self) -> Vec<Interface> {
        vec![Interface::Calculator]
    }

    fn announce_models(&self, interface: Interface) -> Vec<String> {
        match interface {
            Interface::Calculator => CalculatorModel::ALL.iter().map(|m| m.to_string()).collect(),
        }
    }
}
