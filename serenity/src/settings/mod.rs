//! The Serenity settings table exposed by every calculator, and its mapping
//! onto the settings of a Serenity system.

use crate::method::{Dispersion, ScfMode, Theory};
use scine_core::{Descriptor, Settings, SettingsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SETTINGS_NAME: &str = "SerenityDFTSettings";

pub const SHOW_SERENITY_OUTPUT: &str = "show_serenity_output";
pub const SPIN_MULTIPLICITY: &str = "spin_multiplicity";
pub const MOLECULAR_CHARGE: &str = "molecular_charge";
pub const MAX_SCF_ITERATIONS: &str = "max_scf_iterations";
pub const SELF_CONSISTENCE_CRITERION: &str = "self_consistence_criterion";
pub const SPIN_MODE: &str = "spin_mode";
pub const METHOD: &str = "method";
pub const BASIS_SET: &str = "basis_set";
pub const TEMPERATURE: &str = "temperature";
pub const PRESSURE: &str = "pressure";
pub const ELECTRONIC_TEMPERATURE: &str = "electronic_temperature";
pub const SOLVATION: &str = "solvation";
pub const SOLVENT: &str = "solvent";

/// Scratch directory appended to the system path.
pub const SCRATCH_DIR: &str = "serenity_tmp/";

// Serenity's own defaults for the fields it owns.
const DEFAULT_BASIS: &str = "6-31GS";
const DEFAULT_AUX_J: &str = "RI_J_WEIGEND";
const DEFAULT_AUX_C: &str = "CC-PVTZ-RI";
const DEFAULT_FIRST_ECP: i64 = 37;
const DEFAULT_GRID_TYPE: &str = "SSF";
const DEFAULT_INITIAL_GUESS: &str = "ATOM_SCF";
const DEFAULT_ENERGY_THRESHOLD: f64 = 5e-8;
const DEFAULT_MAX_CYCLES: i64 = 100;
const DEFAULT_SYSTEM_PATH: &str = "./";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolvationError {
    #[error("solvent '{0}' requested without a solvation model")]
    MissingModel(String),

    #[error("solvation model '{0}' requested without a solvent")]
    MissingSolvent(String),

    #[error("solvation model '{model}' is not available (available: {available})")]
    Unavailable { model: String, available: String },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Build the settings table. `resource_root` is the module's data directory
/// (with trailing separator) and seeds the basis library path.
pub fn serenity_settings(resource_root: &str) -> Settings {
    let mut settings = Settings::new(SETTINGS_NAME);

    settings.push(
        SHOW_SERENITY_OUTPUT,
        Descriptor::boolean("Switch: turns Serenity text output on and off.", false),
    );

    settings.push(SPIN_MULTIPLICITY, Descriptor::int("The multiplicity.", 1));
    settings.push(MOLECULAR_CHARGE, Descriptor::int("The molecular charge.", 0));
    settings.push(
        MAX_SCF_ITERATIONS,
        Descriptor::int("The maximum number of SCF iterations.", DEFAULT_MAX_CYCLES),
    );
    settings.push(
        SELF_CONSISTENCE_CRITERION,
        Descriptor::double("The energy convergence threshold.", DEFAULT_ENERGY_THRESHOLD),
    );
    settings.push(
        SPIN_MODE,
        Descriptor::options(
            "The description of the spin mode such as restricted or unrestricted.",
            &["any", "restricted", "unrestricted"],
            "any",
        ),
    );
    settings.push(METHOD, Descriptor::string("The actual method used.", "PBE"));
    settings.push(
        BASIS_SET,
        Descriptor::string("The label of the basis set.", DEFAULT_BASIS),
    );
    settings.push(
        TEMPERATURE,
        Descriptor::double("The temperature.", 300.0).with_minimum(0.0),
    );
    settings.push(
        PRESSURE,
        Descriptor::double("The pressure in Pa.", scine_core::thermochemistry::DEFAULT_PRESSURE)
            .with_minimum(0.0),
    );
    settings.push(
        ELECTRONIC_TEMPERATURE,
        Descriptor::double("The electronic temperature.", 0.0)
            .with_minimum(0.0)
            .with_maximum(0.0),
    );
    settings.push(
        SOLVATION,
        Descriptor::string("The solvation method/description.", "none"),
    );
    settings.push(SOLVENT, Descriptor::string("The solvent.", "none"));

    // basis
    settings.push(
        "basis_auxJLabel",
        Descriptor::string(
            "Basis set label for the auxiliary basis for Coulomb integrals.",
            DEFAULT_AUX_J,
        ),
    );
    settings.push(
        "basis_auxCLabel",
        Descriptor::string(
            "Basis set label for the auxiliary basis for correlation treatments.",
            DEFAULT_AUX_C,
        ),
    );
    settings.push(
        "basis_makeSphericalBasis",
        Descriptor::boolean("Switch: use a spherical basis (or a cartesian one).", true),
    );
    settings.push(
        "basis_integralThreshold",
        Descriptor::double("The threshold for prescreening in integral evaluations.", 0.0),
    );
    settings.push(
        "basis_basisLibPath",
        Descriptor::string(
            "The path to the basis set files.",
            &format!("{resource_root}basis/"),
        ),
    );
    settings.push(
        "basis_firstECP",
        Descriptor::int(
            "The nuclear charge number of the first atom in the PSE to receive ECPs.",
            DEFAULT_FIRST_ECP,
        ),
    );

    // grid
    settings.push(
        "grid_gridType",
        Descriptor::string("The identifier for the type of grid.", DEFAULT_GRID_TYPE),
    );
    settings.push(
        "grid_smallGridAccuracy",
        Descriptor::int(
            "The accuracy of the smaller integration grid used in temporary steps.",
            3,
        )
        .with_minimum(1.0)
        .with_maximum(7.0),
    );
    settings.push(
        "grid_accuracy",
        Descriptor::int("The accuracy of the integration grid.", 5)
            .with_minimum(1.0)
            .with_maximum(7.0),
    );

    // scf
    settings.push(
        "scf_initialguess",
        Descriptor::string("The initial guess to be used.", DEFAULT_INITIAL_GUESS),
    );
    settings.push(
        "scf_seriesDampingInitialSteps",
        Descriptor::int("The number of initial dampening steps.", 5),
    );

    // pcm
    settings.push(
        "pcm_alpha",
        Descriptor::int(
            "The sharpness parameter for the molecular surface model function for DELLEY-type surfaces.",
            50,
        )
        .with_minimum(0.0),
    );
    settings.push(
        "pcm_scaling",
        Descriptor::boolean(
            "If true, the atom-radii used for the cavity construction are scaled by a factor of 1.2.",
            false,
        ),
    );
    settings.push(
        "pcm_radiiType",
        Descriptor::string("The atomic radii-set to be used in the cavity construction.", "uff"),
    );

    settings
}

/// Replace spin mode `any` with `restricted` for singlets and `unrestricted`
/// otherwise, and return the resolved mode.
pub fn resolve_spin_mode(settings: &mut Settings) -> Result<ScfMode, SettingsError> {
    if settings.get_string(SPIN_MODE)? == "any" {
        let resolved = if settings.get_int(SPIN_MULTIPLICITY)? == 1 {
            ScfMode::Restricted
        } else {
            ScfMode::Unrestricted
        };
        settings.modify_string(SPIN_MODE, &resolved.to_string())?;
    }
    let mode = settings.get_string(SPIN_MODE)?;
    mode.parse().map_err(|_| SettingsError::InvalidOption {
        key: SPIN_MODE.to_string(),
        value: mode.to_string(),
        allowed: "any, restricted, unrestricted".to_string(),
    })
}

fn is_none(value: &str) -> bool {
    value.is_empty() || value == "none"
}

/// Check that the requested implicit solvation is consistent and supported.
/// A solvation model of `any` is replaced by the first available model.
/// Returns whether solvation is requested.
pub fn check_solvation(available: &[&str], settings: &mut Settings) -> Result<bool, SolvationError> {
    let solvation = settings
        .get_string(SOLVATION)
        .map(str::to_lowercase)
        .unwrap_or_default();
    let solvent = settings
        .get_string(SOLVENT)
        .map(str::to_lowercase)
        .unwrap_or_default();

    if is_none(&solvation) {
        if !is_none(&solvent) {
            return Err(SolvationError::MissingModel(solvent));
        }
        return Ok(false);
    }

    let unavailable = |model: &str| SolvationError::Unavailable {
        model: model.to_string(),
        available: available.join(", "),
    };
    let model = if solvation == "any" {
        let first = available.first().ok_or_else(|| unavailable("any"))?;
        settings.modify_string(SOLVATION, first)?;
        first.to_string()
    } else {
        solvation
    };
    if !available.contains(&model.as_str()) {
        return Err(unavailable(&model));
    }
    if is_none(&solvent) {
        return Err(SolvationError::MissingSolvent(model));
    }
    Ok(true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DftSettings {
    pub functional: String,
    pub dispersion: Option<Dispersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisSettings {
    pub label: String,
    pub aux_j_label: String,
    pub aux_c_label: String,
    pub make_spherical_basis: bool,
    pub integral_threshold: f64,
    pub basis_lib_path: String,
    pub first_ecp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub grid_type: String,
    pub small_grid_accuracy: i64,
    pub accuracy: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScfSettings {
    pub initial_guess: String,
    pub series_damping_initial_steps: i64,
    pub energy_threshold: f64,
    pub max_cycles: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcmSettings {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub solver_type: Option<String>,
    pub solvent: Option<String>,
    pub radii_type: Option<String>,
    pub alpha: i64,
    pub scaling: bool,
}

/// Settings of one Serenity system, produced by [`apply_to`] and completed
/// by the calculator (theory, functional, name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub name: String,
    pub path: String,
    pub method: Theory,
    pub scf_mode: ScfMode,
    pub charge: i64,
    /// Number of unpaired electrons (multiplicity - 1).
    pub spin: i64,
    pub show_output: bool,
    pub dft: DftSettings,
    pub basis: BasisSettings,
    pub grid: GridSettings,
    pub scf: ScfSettings,
    pub pcm: PcmSettings,
}

/// Validate `settings` and translate them into the settings of a new system.
/// Resolves the spin mode in place.
pub fn apply_to(settings: &mut Settings) -> Result<SystemSettings, SettingsError> {
    settings.check()?;
    let scf_mode = resolve_spin_mode(settings)?;

    let solvation = settings.get_string(SOLVATION)?.to_string();
    let pcm_enabled = !is_none(&solvation);
    let pcm = PcmSettings {
        enabled: pcm_enabled,
        solver_type: pcm_enabled.then(|| solvation.to_uppercase()),
        solvent: pcm_enabled
            .then(|| settings.get_string(SOLVENT).map(str::to_uppercase))
            .transpose()?,
        radii_type: pcm_enabled
            .then(|| settings.get_string("pcm_radiiType").map(str::to_uppercase))
            .transpose()?,
        alpha: settings.get_int("pcm_alpha")?,
        scaling: settings.get_bool("pcm_scaling")?,
    };

    Ok(SystemSettings {
        name: String::new(),
        path: format!("{DEFAULT_SYSTEM_PATH}{SCRATCH_DIR}"),
        method: Theory::Hf,
        scf_mode,
        charge: settings.get_int(MOLECULAR_CHARGE)?,
        spin: settings.get_int(SPIN_MULTIPLICITY)? - 1,
        show_output: settings.get_bool(SHOW_SERENITY_OUTPUT)?,
        dft: DftSettings {
            functional: String::new(),
            dispersion: None,
        },
        basis: BasisSettings {
            label: settings.get_string(BASIS_SET)?.to_uppercase(),
            aux_j_label: settings.get_string("basis_auxJLabel")?.to_uppercase(),
            aux_c_label: settings.get_string("basis_auxCLabel")?.to_uppercase(),
            make_spherical_basis: settings.get_bool("basis_makeSphericalBasis")?,
            integral_threshold: settings.get_double("basis_integralThreshold")?,
            basis_lib_path: settings.get_string("basis_basisLibPath")?.to_string(),
            first_ecp: settings.get_int("basis_firstECP")?,
        },
        grid: GridSettings {
            grid_type: settings.get_string("grid_gridType")?.to_uppercase(),
            small_grid_accuracy: settings.get_int("grid_smallGridAccuracy")?,
            accuracy: settings.get_int("grid_accuracy")?,
        },
        scf: ScfSettings {
            initial_guess: settings.get_string("scf_initialguess")?.to_uppercase(),
            series_damping_initial_steps: settings.get_int("scf_seriesDampingInitialSteps")?,
            energy_threshold: settings.get_double(SELF_CONSISTENCE_CRITERION)?,
            max_cycles: settings.get_int(MAX_SCF_ITERATIONS)?,
        },
        pcm,
    })
}
