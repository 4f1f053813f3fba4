//! Tests for locating and registering the module

use super::*;
use scine_core::{CoreError, PluginError};
use std::fs;
use tempfile::TempDir;

#[derive(Default)]
struct FakeRegistry {
    loaded: Vec<String>,
    loads: Vec<PathBuf>,
    configs: Vec<PluginConfig>,
    fail: bool,
    provides_module: bool,
}

impl FakeRegistry {
    fn working() -> Self {
        Self {
            provides_module: true,
            ..Default::default()
        }
    }
}

impl ModuleRegistry for FakeRegistry {
    fn module_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|m| m == name)
    }

    fn load_with(&mut self, path: &Path, config: &PluginConfig) -> scine_core::Result<Vec<String>> {
        self.loads.push(path.to_path_buf());
        self.configs.push(config.clone());
        if self.fail {
            return Err(CoreError::Plugin(PluginError::LoadFailed("invalid ELF header".to_string())));
        }
        if self.provides_module {
            self.loaded.push("Serenity".to_string());
            return Ok(vec!["Serenity".to_string()]);
        }
        Ok(Vec::new())
    }
}

/// `<root>/lib/python3.11/site-packages/scine_serenity_wrapper`
struct Layout {
    _root: TempDir,
    lib: PathBuf,
    install_dir: PathBuf,
}

fn layout() -> Layout {
    let root = tempfile::tempdir().unwrap();
    let lib = root.path().join("lib");
    let install_dir = lib
        .join("python3.11")
        .join("site-packages")
        .join("scine_serenity_wrapper");
    fs::create_dir_all(&install_dir).unwrap();
    Layout {
        lib: fs::canonicalize(&lib).unwrap(),
        install_dir: fs::canonicalize(&install_dir).unwrap(),
        _root: root,
    }
}

fn config_for(layout: &Layout) -> LoaderConfig {
    LoaderConfig {
        install_dir: Some(layout.install_dir.clone()),
        export_environment: Some(false),
        ..Default::default()
    }
}

#[test]
fn test_candidates_in_search_order() {
    let layout = layout();
    let locator = Locator::new(&layout.install_dir);
    assert_eq!(
        locator.candidates(),
        vec![
            layout.install_dir.join("serenity.module.so"),
            layout.lib.join("serenity.module.so"),
        ]
    );
}

#[test]
fn test_shallow_install_dir_falls_back_to_root() {
    let locator = Locator::new("/serenity_shallow_install");
    assert_eq!(
        locator.candidates(),
        vec![
            PathBuf::from("/serenity_shallow_install/serenity.module.so"),
            PathBuf::from("/serenity.module.so"),
        ]
    );

    let root = Locator::new("/");
    assert_eq!(root.candidates(), vec![PathBuf::from("/serenity.module.so")]);
}

#[test]
fn test_artifact_not_found() {
    let layout = layout();
    let mut registry = FakeRegistry::working();
    let err = bootstrap(&mut registry, &config_for(&layout)).unwrap_err();
    match err {
        LoaderError::ArtifactNotFound { artifact, searched } => {
            assert_eq!(artifact, "serenity.module.so");
            assert_eq!(searched.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(registry.loads.is_empty());
}

#[test]
fn test_first_candidate_is_loaded() {
    let layout = layout();
    let artifact = layout.install_dir.join("serenity.module.so");
    fs::write(&artifact, b"").unwrap();
    fs::write(layout.lib.join("serenity.module.so"), b"").unwrap();

    let mut registry = FakeRegistry::working();
    let result = bootstrap(&mut registry, &config_for(&layout)).unwrap();
    assert_eq!(result.outcome, LoadOutcome::Loaded(artifact.clone()));
    assert_eq!(registry.loads, vec![artifact]);
    assert!(registry.module_loaded("Serenity"));
}

#[test]
fn test_second_candidate_is_used_when_first_is_missing() {
    let layout = layout();
    let artifact = layout.lib.join("serenity.module.so");
    fs::write(&artifact, b"").unwrap();

    let mut registry = FakeRegistry::working();
    let result = bootstrap(&mut registry, &config_for(&layout)).unwrap();
    assert_eq!(result.outcome, LoadOutcome::Loaded(artifact));
}

#[test]
fn test_resource_root_is_threaded_to_plugin() {
    let layout = layout();
    fs::write(layout.install_dir.join("serenity.module.so"), b"").unwrap();

    let mut registry = FakeRegistry::working();
    let result = bootstrap(&mut registry, &config_for(&layout)).unwrap();
    let expected = format!("{}/data/", layout.install_dir.display());
    assert_eq!(result.resource_root, expected);
    assert_eq!(
        registry.configs,
        vec![PluginConfig::with_resource_root(&expected)]
    );
}

#[test]
fn test_environment_is_exported() {
    let layout = layout();
    fs::write(layout.install_dir.join("serenity.module.so"), b"").unwrap();

    let config = LoaderConfig {
        export_environment: Some(true),
        ..config_for(&layout)
    };
    let mut registry = FakeRegistry::working();
    let result = bootstrap(&mut registry, &config).unwrap();
    assert_eq!(std::env::var(RESOURCES_ENV).unwrap(), result.resource_root);

    // Repeated bootstraps set the same value and load nothing.
    let again = bootstrap(&mut registry, &config).unwrap();
    assert_eq!(again.outcome, LoadOutcome::AlreadyLoaded);
    assert_eq!(std::env::var(RESOURCES_ENV).unwrap(), result.resource_root);
}

#[test]
fn test_bootstrap_is_idempotent() {
    let layout = layout();
    fs::write(layout.install_dir.join("serenity.module.so"), b"").unwrap();

    let mut registry = FakeRegistry::working();
    bootstrap(&mut registry, &config_for(&layout)).unwrap();
    let second = bootstrap(&mut registry, &config_for(&layout)).unwrap();
    assert_eq!(second.outcome, LoadOutcome::AlreadyLoaded);
    assert_eq!(registry.loads.len(), 1);
}

#[test]
fn test_already_loaded_skips_search() {
    let layout = layout();
    let mut registry = FakeRegistry {
        loaded: vec!["Serenity".to_string()],
        ..Default::default()
    };
    let result = bootstrap(&mut registry, &config_for(&layout)).unwrap();
    assert_eq!(result.outcome, LoadOutcome::AlreadyLoaded);
}

#[test]
fn test_load_failure() {
    let layout = layout();
    let artifact = layout.install_dir.join("serenity.module.so");
    fs::write(&artifact, b"garbage").unwrap();

    let mut registry = FakeRegistry {
        fail: true,
        ..Default::default()
    };
    match bootstrap(&mut registry, &config_for(&layout)).unwrap_err() {
        LoaderError::ArtifactLoadFailure { path, reason } => {
            assert_eq!(path, artifact);
            assert!(reason.contains("invalid ELF header"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_module_missing_after_load_is_failure() {
    let layout = layout();
    fs::write(layout.install_dir.join("serenity.module.so"), b"").unwrap();

    let mut registry = FakeRegistry::default();
    assert!(matches!(
        bootstrap(&mut registry, &config_for(&layout)),
        Err(LoaderError::ArtifactLoadFailure { .. })
    ));
}

#[test]
fn test_missing_install_dir() {
    let mut registry = FakeRegistry::working();
    assert!(matches!(
        bootstrap(&mut registry, &LoaderConfig::default()),
        Err(LoaderError::MissingInstallDir)
    ));
}

#[test]
fn test_real_manager_rejects_garbage_artifact() {
    let layout = layout();
    fs::write(layout.install_dir.join("serenity.module.so"), b"not a library").unwrap();

    let mut manager = scine_core::ModuleManager::new();
    assert!(matches!(
        bootstrap(&mut manager, &config_for(&layout)),
        Err(LoaderError::ArtifactLoadFailure { .. })
    ));
    assert!(!manager.module_loaded("Serenity"));
}
