//! Entry points of the `serenity.module.so` artifact.

use crate::engine::native::NativeEngine;
use crate::module::SerenityModule;
use scine_core::plugin::{modules_into_raw, SCINE_MODULE_ABI_VERSION};
use scine_core::{Module, PluginConfig};
use std::ffi::{c_char, c_void, CStr};
use std::ptr;
use std::sync::Arc;
use tracing::error;

#[no_mangle]
pub extern "C" fn scine_module_abi_version() -> u32 {
    SCINE_MODULE_ABI_VERSION
}

/// Create the Serenity module from a JSON [`PluginConfig`].
///
/// # Safety
///
/// `config_json` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn scine_module_factory(config_json: *const c_char) -> *mut c_void {
    let config = if config_json.is_null() {
        PluginConfig::default()
    } else {
        // SAFETY: checked for null; caller guarantees NUL termination.
        let json = unsafe { CStr::from_ptr(config_json) }.to_string_lossy();
        match PluginConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                error!("Rejected module configuration: {}", e);
                return ptr::null_mut();
            }
        }
    };
    let module: Arc<dyn Module> = Arc::new(SerenityModule::new(Arc::new(NativeEngine::new()), &config));
    modules_into_raw(vec![module])
}
