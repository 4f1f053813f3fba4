//! The module registry.

use crate::calculator::Calculator;
use crate::error::{CoreError, Result};
use crate::module::{Interface, Module};
use crate::plugin::{
    self, AbiVersionFn, FactoryFn, PluginConfig, PluginError, ABI_VERSION_SYMBOL, FACTORY_SYMBOL,
    SCINE_MODULE_ABI_VERSION,
};
use libloading::Library;
use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// The part of the module manager a bootstrap routine needs.
pub trait ModuleRegistry {
    fn module_loaded(&self, name: &str) -> bool;

    /// Load a module library, passing `config` to its factory.
    fn load_with(&mut self, path: &Path, config: &PluginConfig) -> Result<Vec<String>>;
}

/// Owns loaded modules and the shared libraries backing them.
///
/// Calculators obtained through [`ModuleManager::get`] may point into a loaded
/// library and must not outlive the manager.
#[derive(Default)]
pub struct ModuleManager {
    // Declared before `libraries`: modules are dropped first.
    modules: Vec<Arc<dyn Module>>,
    libraries: Vec<Library>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module that is linked into the current binary.
    pub fn add_module(&mut self, module: Arc<dyn Module>) -> Result<()> {
        if self.module_loaded(module.name()) {
            return Err(CoreError::ModuleAlreadyLoaded(module.name().to_string()));
        }
        info!("Registered module {}", module.name());
        self.modules.push(module);
        Ok(())
    }

    pub fn module_loaded(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name() == name)
    }

    /// Load a module library with a default [`PluginConfig`].
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        self.load_with(path, &PluginConfig::default())
    }

    /// Load a module library and register every module it provides.
    /// Returns the names of the new modules.
    ///
    /// Loading runs the library's initialisers and factory, so `path` must
    /// point to a trusted module library.
    pub fn load_with(&mut self, path: impl AsRef<Path>, config: &PluginConfig) -> Result<Vec<String>> {
        let path = path.as_ref();
        // SAFETY: the library is trusted by the caller; see the method docs.
        let (library, modules) = unsafe { load_library(path, config)? };

        if let Some(duplicate) = modules.iter().find(|m| self.module_loaded(m.name())) {
            let name = duplicate.name().to_string();
            drop(modules);
            drop(library);
            return Err(CoreError::ModuleAlreadyLoaded(name));
        }

        let names: Vec<String> = modules.iter().map(|m| m.name().to_string()).collect();
        info!("Loaded {} from {}", names.join(", "), path.display());
        self.modules.extend(modules);
        self.libraries.push(library);
        Ok(names)
    }

    /// Create the `model` implementation of `interface`, e.g.
    /// `get("calculator", "dft")`.
    pub fn get(&self, interface: &str, model: &str) -> Result<Box<dyn Calculator>> {
        let interface: Interface = interface.parse()?;
        let module = self
            .modules
            .iter()
            .find(|m| m.has(interface, model))
            .ok_or_else(|| CoreError::ClassNotImplemented {
                interface: interface.to_string(),
                model: model.to_string(),
            })?;
        match interface {
            Interface::Calculator => module.get_calculator(model),
        }
    }

    pub fn has(&self, interface: &str, model: &str) -> bool {
        match interface.parse::<Interface>() {
            Ok(interface) => self.modules.iter().any(|m| m.has(interface, model)),
            Err(_) => false,
        }
    }

    pub fn loaded_modules(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }
}

impl ModuleRegistry for ModuleManager {
    fn module_loaded(&self, name: &str) -> bool {
        ModuleManager::module_loaded(self, name)
    }

    fn load_with(&mut self, path: &Path, config: &PluginConfig) -> Result<Vec<String>> {
        ModuleManager::load_with(self, path, config)
    }
}

impl std::fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleManager")
            .field("modules", &self.loaded_modules())
            .field("libraries", &self.libraries.len())
            .finish()
    }
}

/// Open `path`, check its ABI version and run its module factory.
///
/// # Safety
///
/// Loading a library executes arbitrary code. The library must export the
/// symbols described in [`crate::plugin`] with matching signatures.
pub unsafe fn load_library(
    path: &Path,
    config: &PluginConfig,
) -> std::result::Result<(Library, Vec<Arc<dyn Module>>), PluginError> {
    debug!("Opening module library {}", path.display());
    // SAFETY: caller guarantees the library is trusted.
    let library = unsafe { Library::new(path).map_err(|e| PluginError::LoadFailed(e.to_string()))? };

    // SAFETY: symbol types match the documented entry points; the copied
    // function pointers are only used while `library` is alive.
    let abi_version: AbiVersionFn = unsafe {
        *library
            .get::<AbiVersionFn>(ABI_VERSION_SYMBOL)
            .map_err(|_| PluginError::MissingEntryPoint("scine_module_abi_version".into()))?
    };
    let factory: FactoryFn = unsafe {
        *library
            .get::<FactoryFn>(FACTORY_SYMBOL)
            .map_err(|_| PluginError::MissingEntryPoint("scine_module_factory".into()))?
    };

    // SAFETY: both entry points come from the trusted library.
    let modules = unsafe { instantiate_modules(abi_version, factory, config)? };
    Ok((library, modules))
}

/// Check the ABI version reported by a module library and run its factory.
///
/// # Safety
///
/// `factory` must return null or a pointer produced by
/// [`plugin::modules_into_raw`].
pub unsafe fn instantiate_modules(
    abi_version: AbiVersionFn,
    factory: FactoryFn,
    config: &PluginConfig,
) -> std::result::Result<Vec<Arc<dyn Module>>, PluginError> {
    let actual = unsafe { abi_version() };
    if actual != SCINE_MODULE_ABI_VERSION {
        return Err(PluginError::AbiMismatch {
            expected: SCINE_MODULE_ABI_VERSION,
            actual,
        });
    }

    let config_json =
        CString::new(config.to_json()?).map_err(|e| PluginError::Config(e.to_string()))?;
    let raw = unsafe { factory(config_json.as_ptr()) };
    if raw.is_null() {
        return Err(PluginError::NullFactory);
    }

    // SAFETY: a non-null factory result comes from modules_into_raw.
    Ok(unsafe { plugin::modules_from_raw(raw) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{c_char, c_void, CStr};

    struct NamedModule(&'static str);

    impl Module for NamedModule {
        fn name(&self) -> &str {
            self.0
        }

        fn has(&self, interface: Interface, model: &str) -> bool {
            interface == Interface::Calculator && model.eq_ignore_ascii_case("toy")
        }

        fn get_calculator(&self, model: &str) -> Result<Box<dyn Calculator>> {
            Err(CoreError::ClassNotImplemented {
                interface: "calculator".to_string(),
                model: model.to_string(),
            })
        }

        fn announce_interfaces(&self) -> Vec<Interface> {
            vec![Interface::Calculator]
        }

        fn announce_models(&self, _interface: Interface) -> Vec<String> {
            vec!["TOY".to_string()]
        }
    }

    #[test]
    fn test_duplicate_module_is_rejected() {
        let mut manager = ModuleManager::new();
        manager.add_module(Arc::new(NamedModule("Toy"))).unwrap();
        assert!(manager.module_loaded("Toy"));
        assert!(matches!(
            manager.add_module(Arc::new(NamedModule("Toy"))),
            Err(CoreError::ModuleAlreadyLoaded(name)) if name == "Toy"
        ));
        assert_eq!(manager.loaded_modules(), vec!["Toy".to_string()]);
    }

    #[test]
    fn test_lookup_by_strings() {
        let mut manager = ModuleManager::new();
        manager.add_module(Arc::new(NamedModule("Toy"))).unwrap();
        assert!(manager.has("calculator", "TOY"));
        assert!(!manager.has("calculator", "dft"));
        assert!(!manager.has("bond_order", "toy"));
        assert!(matches!(
            manager.get("calculator", "dft"),
            Err(CoreError::ClassNotImplemented { .. })
        ));
        assert!(matches!(
            manager.get("nope", "toy"),
            Err(CoreError::UnknownInterface(_))
        ));
    }

    #[test]
    fn test_loading_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.module.so");
        std::fs::write(&path, b"not a shared library").unwrap();

        let mut manager = ModuleManager::new();
        assert!(matches!(
            manager.load(&path),
            Err(CoreError::Plugin(PluginError::LoadFailed(_)))
        ));
        assert!(manager.loaded_modules().is_empty());
    }

    #[test]
    fn test_loading_missing_file_fails() {
        let mut manager = ModuleManager::new();
        assert!(manager.load("/nonexistent/serenity.module.so").is_err());
    }

    #[test]
    fn test_library_without_entry_points() {
        let candidates = [
            "/lib/x86_64-linux-gnu/libm.so.6",
            "/usr/lib/x86_64-linux-gnu/libm.so.6",
            "/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib64/libm.so.6",
            "/lib64/libm.so.6",
            "/usr/lib/libm.so.6",
        ];
        let Some(libm) = candidates.iter().map(Path::new).find(|p| p.is_file()) else {
            eprintln!("Skipping test: no system libm found");
            return;
        };

        let mut manager = ModuleManager::new();
        assert!(matches!(
            manager.load(libm),
            Err(CoreError::Plugin(PluginError::MissingEntryPoint(symbol)))
                if symbol == "scine_module_abi_version"
        ));
        assert!(manager.loaded_modules().is_empty());
    }

    unsafe extern "C" fn current_abi() -> u32 {
        SCINE_MODULE_ABI_VERSION
    }

    unsafe extern "C" fn newer_abi() -> u32 {
        SCINE_MODULE_ABI_VERSION + 1
    }

    unsafe extern "C" fn null_factory(_config_json: *const c_char) -> *mut c_void {
        std::ptr::null_mut()
    }

    /// Provides "Toy", or "ToyWithData" when given a resource root.
    unsafe extern "C" fn toy_factory(config_json: *const c_char) -> *mut c_void {
        let json = unsafe { CStr::from_ptr(config_json) }.to_string_lossy();
        let name = match PluginConfig::from_json(&json) {
            Ok(config) if config.resource_root.is_some() => "ToyWithData",
            Ok(_) => "Toy",
            Err(_) => return std::ptr::null_mut(),
        };
        plugin::modules_into_raw(vec![Arc::new(NamedModule(name))])
    }

    #[test]
    fn test_abi_mismatch_skips_factory() {
        let result = unsafe { instantiate_modules(newer_abi, toy_factory, &PluginConfig::default()) };
        assert!(matches!(
            result,
            Err(PluginError::AbiMismatch { expected, actual })
                if expected == SCINE_MODULE_ABI_VERSION && actual == SCINE_MODULE_ABI_VERSION + 1
        ));
    }

    #[test]
    fn test_null_factory() {
        let result = unsafe { instantiate_modules(current_abi, null_factory, &PluginConfig::default()) };
        assert!(matches!(result, Err(PluginError::NullFactory)));
    }

    #[test]
    fn test_factory_receives_config() {
        let modules =
            unsafe { instantiate_modules(current_abi, toy_factory, &PluginConfig::default()) }.unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name(), "Toy");

        let config = PluginConfig::with_resource_root("/opt/serenity/data/");
        let modules = unsafe { instantiate_modules(current_abi, toy_factory, &config) }.unwrap();
        assert_eq!(modules[0].name(), "ToyWithData");
        assert!(modules[0].has(Interface::Calculator, "toy"));
    }
}
