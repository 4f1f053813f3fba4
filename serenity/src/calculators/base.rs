use super::state::SerenityState;
use crate::engine::{Engine, EngineError, System};
use crate::method::ScfMode;
use crate::settings::{
    apply_to, check_solvation, serenity_settings, SystemSettings, PRESSURE, SPIN_MULTIPLICITY,
    TEMPERATURE,
};
use nalgebra::{DMatrix, Vector3};
use scine_core::{
    AtomCollection, AtomsOrbitalsIndexes, Calculator, CoreError, ElectronicOccupation, Property,
    PropertyList, Result, Results, Settings, State, ThermochemicalSummary, Thermochemistry,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Reported as the program name of every result.
pub const PROGRAM_NAME: &str = "serenity";

/// Displacement (Bohr) above which a previous electronic structure is not
/// reused as a starting point.
pub const MOVE_THRESHOLD: f64 = 0.1;

/// Everything a method needs for one calculation.
pub struct Job<'a> {
    pub system: &'a mut dyn System,
    pub structure: &'a AtomCollection,
    pub results: &'a mut Results,
    pub settings: &'a Settings,
    pub required: PropertyList,
    pub mode: ScfMode,
    /// Set while the geometry changed since the last converged calculation.
    pub moved: &'a mut bool,
}

impl Job<'_> {
    pub fn requires(&self, property: Property) -> bool {
        self.required.contains(property)
    }

    /// Mulliken charges: effective core charge minus electron population.
    pub fn atomic_charges(&self) -> std::result::Result<Vec<f64>, EngineError> {
        let populations = self.system.mulliken_populations(self.mode)?;
        let cores = self.system.effective_charges()?;
        let n_atoms = self.structure.len();
        if populations.len() != n_atoms || cores.len() != n_atoms {
            return Err(EngineError::Protocol(format!(
                "{} populations and {} core charges for {} atoms",
                populations.len(),
                cores.len(),
                n_atoms
            )));
        }
        Ok(cores
            .iter()
            .zip(populations.iter())
            .map(|(core, population)| core - population)
            .collect())
    }

    /// Nuclear gradients, including the dispersion correction when the
    /// system has one.
    pub fn gradients(&mut self) -> std::result::Result<DMatrix<f64>, EngineError> {
        let mut gradients = self.system.gradients(self.mode)?;
        let expected = (self.structure.len(), 3);
        if gradients.shape() != expected {
            return Err(shape_error("gradient", gradients.shape(), expected));
        }
        if self.system.settings().dft.dispersion.is_some() {
            let dispersion = self.system.dispersion_gradient()?;
            if dispersion.shape() != expected {
                return Err(shape_error("dispersion gradient", dispersion.shape(), expected));
            }
            gradients += dispersion;
        }
        Ok(gradients)
    }

    pub fn hessian(&mut self) -> std::result::Result<DMatrix<f64>, EngineError> {
        let hessian = self.system.hessian(self.mode)?;
        let n = 3 * self.structure.len();
        if hessian.shape() != (n, n) {
            return Err(shape_error("Hessian", hessian.shape(), (n, n)));
        }
        Ok(hessian)
    }

    /// Thermochemistry at the `temperature` and `pressure` settings.
    pub fn thermochemistry(&self, hessian: &DMatrix<f64>, energy: f64) -> Result<ThermochemicalSummary> {
        let multiplicity = self.settings.get_int(SPIN_MULTIPLICITY)?.max(1) as usize;
        Thermochemistry::new(self.structure, hessian)
            .temperature(self.settings.get_double(TEMPERATURE)?)
            .pressure(self.settings.get_double(PRESSURE)?)
            .multiplicity(multiplicity)
            .compute(energy)
    }

    pub fn ao_to_atom_mapping(&self) -> std::result::Result<AtomsOrbitalsIndexes, EngineError> {
        let mut mapping = AtomsOrbitalsIndexes::new();
        for (first, end) in self.system.basis_indices()? {
            mapping.add_atom(end - first);
        }
        Ok(mapping)
    }

    pub fn occupation(&self) -> std::result::Result<ElectronicOccupation, EngineError> {
        let count = self.system.n_electrons(self.mode)?;
        Ok(match self.mode {
            ScfMode::Restricted => ElectronicOccupation::Restricted {
                n_occupied: count.total() / 2,
            },
            ScfMode::Unrestricted => ElectronicOccupation::Unrestricted {
                n_alpha: count.alpha,
                n_beta: count.beta,
            },
        })
    }
}

fn shape_error(what: &str, found: (usize, usize), expected: (usize, usize)) -> EngineError {
    EngineError::Protocol(format!(
        "{what} is {}x{}, expected {}x{}",
        found.0, found.1, expected.0, expected.1
    ))
}

/// An electronic-structure method run by [`SerenityCalculator`].
pub trait Method: Clone + Send + 'static {
    /// Calculator name reported to the host.
    const NAME: &'static str;
    /// Method family, e.g. `"DFT"`.
    const FAMILY: &'static str;

    fn possible_properties(&self) -> PropertyList;

    fn solvation_models(&self) -> &'static [&'static str];

    /// Settings that are specific to the method rather than user-controlled.
    fn apply_fixed_settings(&self, settings: &Settings, system: &mut SystemSettings) -> Result<()>;

    fn calculate_impl(&self, job: Job<'_>) -> Result<()>;
}

pub struct SerenityCalculator<M: Method> {
    method: M,
    engine: Arc<dyn Engine>,
    settings: Settings,
    structure: Option<AtomCollection>,
    system: Option<Box<dyn System>>,
    required: PropertyList,
    results: Results,
    moved: bool,
}

impl<M: Method> SerenityCalculator<M> {
    /// `resource_root` is the module data directory, with trailing separator.
    pub fn new(method: M, engine: Arc<dyn Engine>, resource_root: &str) -> Self {
        Self {
            method,
            engine,
            settings: serenity_settings(resource_root),
            structure: None,
            system: None,
            required: PropertyList::from(Property::Energy),
            results: Results::default(),
            moved: true,
        }
    }

    pub fn has_system(&self) -> bool {
        self.system.is_some()
    }

    fn missing_structure(&self) -> CoreError {
        CoreError::MissingStructure(M::NAME.to_string())
    }

    /// A new system for `structure` from the current settings, which are
    /// validated (and their `any` entries resolved) on the way.
    fn build_system(
        method: &M,
        engine: &dyn Engine,
        settings: &mut Settings,
        structure: &AtomCollection,
    ) -> Result<Box<dyn System>> {
        check_solvation(method.solvation_models(), settings)?;
        let mut system_settings = apply_to(settings)?;
        method.apply_fixed_settings(settings, &mut system_settings)?;
        system_settings.name = Uuid::new_v4().to_string();
        info!("Generated new Serenity system with UID: {}", system_settings.name);
        Ok(engine.create_system(&system_settings, structure)?)
    }
}

impl<M: Method> Clone for SerenityCalculator<M> {
    /// The copy starts without a Serenity system and builds its own on the
    /// next calculation.
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            engine: Arc::clone(&self.engine),
            settings: self.settings.clone(),
            structure: self.structure.clone(),
            system: None,
            required: self.required,
            results: self.results.clone(),
            moved: true,
        }
    }
}

impl<M: Method> Calculator for SerenityCalculator<M> {
    fn name(&self) -> &str {
        M::NAME
    }

    fn set_structure(&mut self, structure: AtomCollection) -> Result<()> {
        self.structure = Some(structure);
        self.system = None;
        self.results = Results::default();
        self.moved = true;
        Ok(())
    }

    fn structure(&self) -> Option<&AtomCollection> {
        self.structure.as_ref()
    }

    fn modify_positions(&mut self, positions: Vec<Vector3<f64>>) -> Result<()> {
        let structure = self
            .structure
            .as_mut()
            .ok_or_else(|| CoreError::MissingStructure(M::NAME.to_string()))?;
        let max_shift = structure
            .positions()
            .iter()
            .zip(positions.iter())
            .map(|(old, new)| (old - new).norm())
            .fold(0.0_f64, f64::max);
        structure.set_positions(positions)?;

        if let Some(system) = self.system.as_mut() {
            if max_shift > MOVE_THRESHOLD {
                debug!("Atoms moved by {:.3} bohr, dropping electronic structure", max_shift);
                system.reset_electronic_structure();
            }
            system.set_positions(structure.positions())?;
        }
        self.results = Results::default();
        self.moved = true;
        Ok(())
    }

    fn set_required_properties(&mut self, properties: PropertyList) {
        self.required = properties;
    }

    fn required_properties(&self) -> PropertyList {
        self.required
    }

    fn possible_properties(&self) -> PropertyList {
        self.method.possible_properties()
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    fn calculate(&mut self, _description: &str) -> Result<&Results> {
        let Some(structure) = self.structure.as_ref() else {
            return Err(self.missing_structure());
        };

        let missing = self.required.missing_from(self.method.possible_properties());
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|p| p.name()).collect();
            return Err(CoreError::UnavailableProperties(names.join(", ")));
        }

        if self.system.is_none() {
            self.system = Some(Self::build_system(
                &self.method,
                self.engine.as_ref(),
                &mut self.settings,
                structure,
            )?);
        }

        self.results = Results::default();
        let Some(system) = self.system.as_deref_mut() else {
            return Err(CoreError::UnsuccessfulCalculation("no Serenity system".to_string()));
        };
        let mode = system.settings().scf_mode;
        debug!("Running {} calculation in {} mode", M::FAMILY, mode);
        self.method.calculate_impl(Job {
            system,
            structure,
            results: &mut self.results,
            settings: &self.settings,
            required: self.required,
            mode,
            moved: &mut self.moved,
        })?;

        self.results.program_name = Some(PROGRAM_NAME.to_string());
        Ok(&self.results)
    }

    fn results(&self) -> &Results {
        &self.results
    }

    fn supports_method_family(&self, family: &str) -> bool {
        family.eq_ignore_ascii_case(M::FAMILY)
    }

    fn clone_box(&self) -> Box<dyn Calculator> {
        Box::new(self.clone())
    }

    fn get_state(&self) -> Result<Arc<dyn State>> {
        let structure = self
            .structure
            .clone()
            .ok_or_else(|| self.missing_structure())?;
        let mut electronic_structures = Vec::new();
        if let Some(system) = self.system.as_deref() {
            for mode in [ScfMode::Restricted, ScfMode::Unrestricted] {
                if let Some(es) = system.electronic_structure(mode)? {
                    electronic_structures.push(es);
                }
            }
        }
        Ok(Arc::new(SerenityState::new(structure, electronic_structures)))
    }

    fn load_state(&mut self, state: Arc<dyn State>) -> Result<()> {
        let state = state
            .as_any()
            .downcast_ref::<SerenityState>()
            .ok_or_else(|| CoreError::StateCasting(M::NAME.to_string()))?;
        let structure = state.structure().clone();
        let mut system = Self::build_system(
            &self.method,
            self.engine.as_ref(),
            &mut self.settings,
            &structure,
        )?;
        for es in state.electronic_structures() {
            system.set_electronic_structure(es)?;
        }
        // Without orbitals for the current mode the next calculation starts over.
        self.moved = state
            .electronic_structure(system.settings().scf_mode)
            .is_none();
        self.structure = Some(structure);
        self.system = Some(system);
        self.results = Results::default();
        Ok(())
    }
}
