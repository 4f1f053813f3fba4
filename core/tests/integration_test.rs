//! Integration tests for the module contract through the public API

use nalgebra::Vector3;
use scine_core::{
    AtomCollection, Calculator, CoreError, Descriptor, Interface, Module, ModuleManager, Property,
    PropertyList, Results, SettingValue, Settings, SettingsError,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Harmonic bond between the first two atoms, k = 1 Hartree/Bohr^2.
#[derive(Clone)]
struct SpringCalculator {
    settings: Settings,
    structure: Option<AtomCollection>,
    required: PropertyList,
    results: Results,
}

impl SpringCalculator {
    fn new() -> Self {
        let mut settings = Settings::new("SpringSettings");
        settings.push("rest_length", Descriptor::double("Rest length in Bohr", 1.4).with_minimum(0.0));
        settings.push("verbose", Descriptor::boolean("Print progress", false));
        Self {
            settings,
            structure: None,
            required: Property::Energy.into(),
            results: Results::default(),
        }
    }
}

impl Calculator for SpringCalculator {
    fn name(&self) -> &str {
        "SpringCalculator"
    }

    fn set_structure(&mut self, structure: AtomCollection) -> scine_core::Result<()> {
        self.structure = Some(structure);
        self.results = Results::default();
        Ok(())
    }

    fn structure(&self) -> Option<&AtomCollection> {
        self.structure.as_ref()
    }

    fn modify_positions(&mut self, positions: Vec<Vector3<f64>>) -> scine_core::Result<()> {
        match self.structure.as_mut() {
            Some(structure) => structure.set_positions(positions),
            None => Err(CoreError::MissingStructure("SpringCalculator".to_string())),
        }
    }

    fn set_required_properties(&mut self, properties: PropertyList) {
        self.required = properties;
    }

    fn required_properties(&self) -> PropertyList {
        self.required
    }

    fn possible_properties(&self) -> PropertyList {
        Property::Energy | Property::Gradients
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    fn calculate(&mut self, _description: &str) -> scine_core::Result<&Results> {
        let structure = self
            .structure
            .as_ref()
            .ok_or_else(|| CoreError::MissingStructure("SpringCalculator".to_string()))?;
        let missing = self.required.missing_from(self.possible_properties());
        if !missing.is_empty() {
            return Err(CoreError::UnavailableProperties(format!("{missing:?}")));
        }
        let rest = self.settings.get_double("rest_length")?;
        let d = structure.positions()[1] - structure.positions()[0];
        let stretch = d.norm() - rest;
        self.results = Results {
            energy: Some(0.5 * stretch * stretch),
            successful_calculation: Some(true),
            ..Default::default()
        };
        Ok(&self.results)
    }

    fn results(&self) -> &Results {
        &self.results
    }

    fn supports_method_family(&self, family: &str) -> bool {
        family.eq_ignore_ascii_case("MM")
    }

    fn clone_box(&self) -> Box<dyn Calculator> {
        Box::new(self.clone())
    }
}

struct SpringModule;

impl Module for SpringModule {
    fn name(&self) -> &str {
        "Spring"
    }

    fn has(&self, interface: Interface, model: &str) -> bool {
        interface == Interface::Calculator && model.eq_ignore_ascii_case("spring")
    }

    fn get_calculator(&self, model: &str) -> scine_core::Result<Box<dyn Calculator>> {
        if !self.has(Interface::Calculator, model) {
            return Err(CoreError::ClassNotImplemented {
                interface: Interface::Calculator.to_string(),
                model: model.to_string(),
            });
        }
        Ok(Box::new(SpringCalculator::new()))
    }

    fn announce_interfaces(&self) -> Vec<Interface> {
        vec![Interface::Calculator]
    }

    fn announce_models(&self, _interface: Interface) -> Vec<String> {
        vec!["SPRING".to_string()]
    }
}

fn manager() -> ModuleManager {
    let mut manager = ModuleManager::new();
    manager.add_module(Arc::new(SpringModule)).unwrap();
    manager
}

#[test]
fn test_calculate_through_manager() {
    let manager = manager();
    let mut calculator = manager.get("Calculator", "SPRING").unwrap();
    assert_eq!(calculator.name(), "SpringCalculator");

    let structure = AtomCollection::from_symbols(
        &["H", "H"],
        vec![Vector3::zeros(), Vector3::new(2.4, 0.0, 0.0)],
    )
    .unwrap();
    calculator.set_structure(structure).unwrap();
    let results = calculator.calculate("stretched").unwrap();
    assert!(results.successful());
    assert!((results.energy.unwrap() - 0.5).abs() < 1e-12);
}

#[test]
fn test_yaml_overrides_reach_calculator() {
    let manager = manager();
    let mut calculator = manager.get("calculator", "spring").unwrap();
    let overrides: HashMap<String, SettingValue> =
        serde_yml::from_str("rest_length: 2\nverbose: true\n").unwrap();
    calculator.settings_mut().apply_overrides(&overrides).unwrap();
    assert_eq!(calculator.settings().get_double("rest_length").unwrap(), 2.0);
    assert!(calculator.settings().get_bool("verbose").unwrap());

    let bad: HashMap<String, SettingValue> = serde_yml::from_str("rest_length: -1.0\n").unwrap();
    calculator.settings_mut().apply_overrides(&bad).unwrap();
    assert!(matches!(
        calculator.settings().check(),
        Err(SettingsError::OutOfRange { ref key, .. }) if key == "rest_length"
    ));

    let wrong_type: HashMap<String, SettingValue> =
        serde_yml::from_str("verbose: 3\n").unwrap();
    assert!(matches!(
        calculator.settings_mut().apply_overrides(&wrong_type),
        Err(SettingsError::TypeMismatch { .. })
    ));
}

#[test]
fn test_unavailable_properties_are_rejected() {
    let manager = manager();
    let mut calculator = manager.get("calculator", "spring").unwrap();
    calculator
        .set_structure(AtomCollection::from_angstrom(&["H", "H"], &[[0.0; 3], [0.74, 0.0, 0.0]]).unwrap())
        .unwrap();
    calculator.set_required_properties(Property::Energy | Property::Hessian);
    assert!(matches!(
        calculator.calculate(""),
        Err(CoreError::UnavailableProperties(_))
    ));
}

#[test]
fn test_cloned_calculator_is_independent() {
    let manager = manager();
    let original = manager.get("calculator", "spring").unwrap();
    let mut copy = original.clone();
    copy.settings_mut().set("rest_length", 3.0).unwrap();
    assert_eq!(original.settings().get_double("rest_length").unwrap(), 1.4);
}

#[test]
fn test_stateless_calculator() {
    let manager = manager();
    let calculator = manager.get("calculator", "spring").unwrap();
    assert!(matches!(calculator.get_state(), Err(CoreError::StateNotSupported(_))));
}

#[test]
fn test_unknown_model_and_interface() {
    let manager = manager();
    assert!(matches!(
        manager.get("calculator", "dft"),
        Err(CoreError::ClassNotImplemented { .. })
    ));
    assert!(matches!(
        manager.get("bond_orders", "spring"),
        Err(CoreError::UnknownInterface(_))
    ));
}
