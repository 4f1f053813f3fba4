//! Python bindings for the Serenity wrapper.
//!
//! Importing `scine_serenity_wrapper` locates the extension's own directory,
//! registers `serenity.module.so` with the process-wide module manager and
//! raises `ImportError` if that fails. The extension is expected to live in
//! the package directory, next to `data/`.

use nalgebra::DMatrix;
use pyo3::exceptions::{PyImportError, PyKeyError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBool;
use scine_core::{
    AtomCollection, Calculator, ModuleManager, Property, PropertyList, Results, SettingValue, State,
    ThermochemicalSummary,
};
use serenity_wrapper::{bootstrap, LoaderConfig};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

static MANAGER: OnceLock<Mutex<ModuleManager>> = OnceLock::new();

fn lock_manager() -> PyResult<MutexGuard<'static, ModuleManager>> {
    MANAGER
        .get_or_init(|| Mutex::new(ModuleManager::new()))
        .lock()
        .map_err(|_| PyRuntimeError::new_err("module manager lock poisoned"))
}

/// Directory of the shared object this code was loaded from.
#[cfg(unix)]
fn extension_dir() -> Option<PathBuf> {
    use std::ffi::{CStr, OsStr};
    use std::os::unix::ffi::OsStrExt;

    let address = extension_dir as fn() -> Option<PathBuf> as *const libc::c_void;
    // SAFETY: Dl_info is plain data; dladdr only writes into it.
    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    let found = unsafe { libc::dladdr(address, &mut info) };
    if found == 0 || info.dli_fname.is_null() {
        return None;
    }
    // SAFETY: dli_fname is a NUL-terminated path owned by the loader.
    let file = unsafe { CStr::from_ptr(info.dli_fname) };
    let path = PathBuf::from(OsStr::from_bytes(file.to_bytes()));
    std::fs::canonicalize(&path)
        .unwrap_or(path)
        .parent()
        .map(PathBuf::from)
}

#[cfg(not(unix))]
fn extension_dir() -> Option<PathBuf> {
    None
}

fn register_serenity() -> PyResult<()> {
    let dir = extension_dir()
        .ok_or_else(|| PyImportError::new_err("could not determine the installation directory"))?;
    let mut manager = lock_manager()?;
    bootstrap(&mut *manager, &LoaderConfig::new(dir))
        .map(|_| ())
        .map_err(|e| PyImportError::new_err(e.to_string()))
}

fn to_value_err<E: std::fmt::Display>(err: E) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn matrix_to_vecvec(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..matrix.nrows())
        .map(|i| (0..matrix.ncols()).map(|j| matrix[(i, j)]).collect())
        .collect()
}

fn parse_properties(names: &[String]) -> PyResult<PropertyList> {
    let mut list = PropertyList::empty();
    for name in names {
        list.insert(name.parse::<Property>().map_err(PyValueError::new_err)?);
    }
    Ok(list)
}

#[pyclass(name = "ModuleManager")]
pub struct PyModuleManager;

#[pymethods]
impl PyModuleManager {
    #[staticmethod]
    fn get_instance() -> Self {
        PyModuleManager
    }

    fn module_loaded(&self, name: &str) -> PyResult<bool> {
        Ok(lock_manager()?.module_loaded(name))
    }

    /// Load a module library, returning the names of the modules it provides.
    fn load(&self, path: PathBuf) -> PyResult<Vec<String>> {
        lock_manager()?.load(&path).map_err(to_value_err)
    }

    fn has(&self, interface: &str, model: &str) -> PyResult<bool> {
        Ok(lock_manager()?.has(interface, model))
    }

    fn get(&self, interface: &str, model: &str) -> PyResult<PyCalculator> {
        let calculator = lock_manager()?.get(interface, model).map_err(to_value_err)?;
        Ok(PyCalculator::new(calculator))
    }

    fn loaded_modules(&self) -> PyResult<Vec<String>> {
        Ok(lock_manager()?.loaded_modules())
    }
}

/// Elements and positions in Bohr.
#[pyclass(name = "AtomCollection")]
#[derive(Clone)]
pub struct PyAtomCollection {
    inner: AtomCollection,
}

#[pymethods]
impl PyAtomCollection {
    #[new]
    fn new(elements: Vec<String>, positions: Vec<[f64; 3]>) -> PyResult<Self> {
        let symbols: Vec<&str> = elements.iter().map(String::as_str).collect();
        let positions = positions
            .iter()
            .map(|p| nalgebra::Vector3::new(p[0], p[1], p[2]))
            .collect();
        let inner = AtomCollection::from_symbols(&symbols, positions).map_err(to_value_err)?;
        Ok(Self { inner })
    }

    #[staticmethod]
    fn from_angstrom(elements: Vec<String>, positions: Vec<[f64; 3]>) -> PyResult<Self> {
        let symbols: Vec<&str> = elements.iter().map(String::as_str).collect();
        let inner = AtomCollection::from_angstrom(&symbols, &positions).map_err(to_value_err)?;
        Ok(Self { inner })
    }

    #[getter]
    fn elements(&self) -> Vec<String> {
        self.inner.symbols()
    }

    #[getter]
    fn positions(&self) -> Vec<[f64; 3]> {
        self.inner
            .positions()
            .iter()
            .map(|p| [p.x, p.y, p.z])
            .collect()
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!("<AtomCollection {}>", self.inner.symbols().join(" "))
    }
}

type SharedCalculator = Arc<Mutex<Box<dyn Calculator>>>;

fn lock_calculator(calculator: &SharedCalculator) -> PyResult<MutexGuard<'_, Box<dyn Calculator>>> {
    calculator
        .lock()
        .map_err(|_| PyRuntimeError::new_err("calculator lock poisoned"))
}

#[pyclass(name = "Calculator")]
pub struct PyCalculator {
    inner: SharedCalculator,
}

impl PyCalculator {
    fn new(calculator: Box<dyn Calculator>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(calculator)),
        }
    }
}

#[pymethods]
impl PyCalculator {
    fn name(&self) -> PyResult<String> {
        Ok(lock_calculator(&self.inner)?.name().to_string())
    }

    #[getter]
    fn get_structure(&self) -> PyResult<Option<PyAtomCollection>> {
        Ok(lock_calculator(&self.inner)?
            .structure()
            .map(|s| PyAtomCollection { inner: s.clone() }))
    }

    #[setter]
    fn set_structure(&self, structure: PyAtomCollection) -> PyResult<()> {
        lock_calculator(&self.inner)?
            .set_structure(structure.inner)
            .map_err(to_value_err)
    }

    /// Mutable view on the calculator settings.
    #[getter]
    fn settings(&self) -> PySettings {
        PySettings {
            calculator: Arc::clone(&self.inner),
        }
    }

    fn set_required_properties(&self, properties: Vec<String>) -> PyResult<()> {
        let list = parse_properties(&properties)?;
        lock_calculator(&self.inner)?.set_required_properties(list);
        Ok(())
    }

    fn get_required_properties(&self) -> PyResult<Vec<String>> {
        let list = lock_calculator(&self.inner)?.required_properties();
        Ok(list.iter().map(|p| p.name().to_string()).collect())
    }

    fn get_possible_properties(&self) -> PyResult<Vec<String>> {
        let list = lock_calculator(&self.inner)?.possible_properties();
        Ok(list.iter().map(|p| p.name().to_string()).collect())
    }

    fn supports_method_family(&self, family: &str) -> PyResult<bool> {
        Ok(lock_calculator(&self.inner)?.supports_method_family(family))
    }

    #[pyo3(signature = (description=""))]
    fn calculate(&self, py: Python<'_>, description: &str) -> PyResult<PyResults> {
        let calculator = Arc::clone(&self.inner);
        let description = description.to_string();
        py.allow_threads(move || {
            let mut guard = lock_calculator(&calculator)?;
            let results = guard
                .calculate(&description)
                .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
            Ok(PyResults::from(results))
        })
    }

    fn clone(&self) -> PyResult<PyCalculator> {
        Ok(PyCalculator::new(lock_calculator(&self.inner)?.clone_box()))
    }

    fn get_state(&self) -> PyResult<PyState> {
        let state = lock_calculator(&self.inner)?
            .get_state()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        Ok(PyState { inner: state })
    }

    fn load_state(&self, state: &PyState) -> PyResult<()> {
        lock_calculator(&self.inner)?
            .load_state(Arc::clone(&state.inner))
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }
}

/// Opaque calculator state.
#[pyclass(name = "State")]
pub struct PyState {
    inner: Arc<dyn State>,
}

#[pyclass(name = "Settings")]
pub struct PySettings {
    calculator: SharedCalculator,
}

fn setting_to_py(py: Python<'_>, value: &SettingValue) -> PyResult<PyObject> {
    Ok(match value {
        SettingValue::Bool(b) => PyBool::new(py, *b).to_owned().into_any().unbind(),
        SettingValue::Int(i) => (*i).into_pyobject(py)?.into_any().unbind(),
        SettingValue::Double(d) => (*d).into_pyobject(py)?.into_any().unbind(),
        SettingValue::String(s) => s.as_str().into_pyobject(py)?.into_any().unbind(),
    })
}

fn setting_from_py(value: &Bound<'_, PyAny>) -> PyResult<SettingValue> {
    // Python's bool is a subclass of int.
    if let Ok(b) = value.downcast::<PyBool>() {
        return Ok(SettingValue::Bool(b.is_true()));
    }
    if let Ok(i) = value.extract::<i64>() {
        return Ok(SettingValue::Int(i));
    }
    if let Ok(d) = value.extract::<f64>() {
        return Ok(SettingValue::Double(d));
    }
    if let Ok(s) = value.extract::<String>() {
        return Ok(SettingValue::String(s));
    }
    Err(PyTypeError::new_err("setting values must be bool, int, float or str"))
}

#[pymethods]
impl PySettings {
    fn __getitem__(&self, py: Python<'_>, key: &str) -> PyResult<PyObject> {
        let calculator = lock_calculator(&self.calculator)?;
        let value = calculator
            .settings()
            .get(key)
            .ok_or_else(|| PyKeyError::new_err(key.to_string()))?;
        setting_to_py(py, value)
    }

    fn __setitem__(&self, key: &str, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let value = setting_from_py(value)?;
        lock_calculator(&self.calculator)?
            .settings_mut()
            .set(key, value)
            .map_err(to_value_err)
    }

    fn __contains__(&self, key: &str) -> PyResult<bool> {
        Ok(lock_calculator(&self.calculator)?.settings().contains(key))
    }

    fn keys(&self) -> PyResult<Vec<String>> {
        Ok(lock_calculator(&self.calculator)?
            .settings()
            .keys()
            .map(str::to_string)
            .collect())
    }

    fn reset_to_defaults(&self) -> PyResult<()> {
        lock_calculator(&self.calculator)?.settings_mut().reset_to_defaults();
        Ok(())
    }
}

#[pyclass(name = "Thermochemistry")]
#[derive(Clone)]
pub struct PyThermochemistry {
    #[pyo3(get)]
    temperature: f64,
    #[pyo3(get)]
    pressure: f64,
    #[pyo3(get)]
    vibrational_frequencies: Vec<f64>,
    #[pyo3(get)]
    zero_point_vibrational_energy: f64,
    #[pyo3(get)]
    enthalpy: f64,
    #[pyo3(get)]
    entropy: f64,
    #[pyo3(get)]
    heat_capacity_p: f64,
    #[pyo3(get)]
    heat_capacity_v: f64,
    #[pyo3(get)]
    gibbs_free_energy: f64,
}

impl From<&ThermochemicalSummary> for PyThermochemistry {
    fn from(summary: &ThermochemicalSummary) -> Self {
        Self {
            temperature: summary.temperature,
            pressure: summary.pressure,
            vibrational_frequencies: summary.vibrational_frequencies.clone(),
            zero_point_vibrational_energy: summary.zero_point_vibrational_energy,
            enthalpy: summary.enthalpy,
            entropy: summary.entropy,
            heat_capacity_p: summary.heat_capacity_p,
            heat_capacity_v: summary.heat_capacity_v,
            gibbs_free_energy: summary.gibbs_free_energy,
        }
    }
}

#[pyclass(name = "Results")]
pub struct PyResults {
    #[pyo3(get)]
    successful_calculation: bool,
    #[pyo3(get)]
    energy: Option<f64>,
    #[pyo3(get)]
    gradients: Option<Vec<Vec<f64>>>,
    #[pyo3(get)]
    hessian: Option<Vec<Vec<f64>>>,
    #[pyo3(get)]
    overlap_matrix: Option<Vec<Vec<f64>>>,
    /// Total density; alpha plus beta for unrestricted calculations.
    #[pyo3(get)]
    density_matrix: Option<Vec<Vec<f64>>>,
    #[pyo3(get)]
    atomic_charges: Option<Vec<f64>>,
    /// `(first_orbital, n_orbitals)` per atom.
    #[pyo3(get)]
    ao_to_atom_mapping: Option<Vec<(usize, usize)>>,
    /// Occupied `(alpha, beta)` orbital counts.
    #[pyo3(get)]
    electronic_occupation: Option<(usize, usize)>,
    #[pyo3(get)]
    bond_orders: Option<Vec<Vec<f64>>>,
    #[pyo3(get)]
    thermochemistry: Option<PyThermochemistry>,
    #[pyo3(get)]
    program_name: Option<String>,
}

impl From<&Results> for PyResults {
    fn from(results: &Results) -> Self {
        Self {
            successful_calculation: results.successful(),
            energy: results.energy,
            gradients: results.gradients.as_ref().map(matrix_to_vecvec),
            hessian: results.hessian.as_ref().map(matrix_to_vecvec),
            overlap_matrix: results.overlap_matrix.as_ref().map(matrix_to_vecvec),
            density_matrix: results
                .density_matrix
                .as_ref()
                .map(|density| matrix_to_vecvec(&density.total())),
            atomic_charges: results.atomic_charges.clone(),
            ao_to_atom_mapping: results
                .ao_to_atom_mapping
                .as_ref()
                .map(|mapping| mapping.ranges().map(|r| (r.start, r.len())).collect()),
            electronic_occupation: results.electronic_occupation.map(|o| o.spin_counts()),
            bond_orders: results.bond_orders.as_ref().map(matrix_to_vecvec),
            thermochemistry: results.thermochemistry.as_ref().map(PyThermochemistry::from),
            program_name: results.program_name.clone(),
        }
    }
}

#[pymethods]
impl PyResults {
    fn __repr__(&self) -> String {
        match self.energy {
            Some(energy) => format!(
                "<Results successful={}, energy={:.8} au>",
                self.successful_calculation, energy
            ),
            None => format!("<Results successful={}>", self.successful_calculation),
        }
    }
}

#[pymodule]
fn scine_serenity_wrapper(m: &Bound<'_, PyModule>) -> PyResult<()> {
    register_serenity()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_class::<PyModuleManager>()?;
    m.add_class::<PyAtomCollection>()?;
    m.add_class::<PyCalculator>()?;
    m.add_class::<PySettings>()?;
    m.add_class::<PyResults>()?;
    m.add_class::<PyThermochemistry>()?;
    m.add_class::<PyState>()?;
    Ok(())
}
