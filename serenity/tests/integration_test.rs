//! Integration tests against an installed Serenity module
//!
//! These load the real `serenity.module.so` from the directory named by
//! `SERENITY_WRAPPER_INSTALL_DIR` and check the H2/def2-TZVP reference
//! energies.

use std::path::PathBuf;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use scine_core::ModuleManager;
    use serenity_wrapper::app::{reference_jobs, run_job};
    use serenity_wrapper::{bootstrap, LoaderConfig, MODULE_NAME};

    fn install_dir() -> Option<PathBuf> {
        std::env::var_os("SERENITY_WRAPPER_INSTALL_DIR").map(PathBuf::from)
    }

    fn loaded_manager() -> Option<ModuleManager> {
        let Some(dir) = install_dir() else {
            eprintln!("Skipping test: SERENITY_WRAPPER_INSTALL_DIR not set");
            return None;
        };
        let mut manager = ModuleManager::new();
        bootstrap(&mut manager, &LoaderConfig::new(dir)).unwrap();
        assert!(manager.module_loaded(MODULE_NAME));
        Some(manager)
    }

    fn check(job_name: &str, calculator_name: &str) {
        let Some(manager) = loaded_manager() else {
            return;
        };
        let job = reference_jobs()
            .into_iter()
            .find(|j| j.name == job_name)
            .unwrap();
        let calculator = manager.get("calculator", &job.calculator).unwrap();
        assert_eq!(calculator.name(), calculator_name);

        let outcome = run_job(&manager, &job).unwrap();
        assert!(
            outcome.passed(),
            "{}: {} vs {:?}",
            job_name,
            outcome.energy,
            outcome.reference
        );
    }

    #[test]
    #[ignore]
    fn test_dft_restricted() {
        check("dft restricted", "SerenityDFTCalculator");
    }

    #[test]
    #[ignore]
    fn test_dft_unrestricted() {
        check("dft unrestricted", "SerenityDFTCalculator");
    }

    #[test]
    #[ignore]
    fn test_hf_restricted() {
        check("hf restricted", "SerenityHFCalculator");
    }

    #[test]
    #[ignore]
    fn test_hf_unrestricted() {
        check("hf unrestricted", "SerenityHFCalculator");
    }

    #[test]
    #[ignore]
    fn test_ccsd_t_restricted() {
        check("ccsd(t) restricted", "SerenityCCCalculator");
    }

    #[test]
    #[ignore]
    fn test_dlpno_ccsd_t0_restricted() {
        check("dlpno-ccsd(t0) restricted", "SerenityCCCalculator");
    }

    #[test]
    #[ignore]
    fn test_second_bootstrap_is_noop() {
        let Some(mut manager) = loaded_manager() else {
            return;
        };
        let dir = install_dir().unwrap();
        let again = bootstrap(&mut manager, &LoaderConfig::new(dir)).unwrap();
        assert_eq!(again.outcome, serenity_wrapper::LoadOutcome::AlreadyLoaded);
        assert_eq!(manager.loaded_modules(), vec![MODULE_NAME.to_string()]);
    }
}
