//! Calculators for the `calculator` interface of the Serenity module.
//!
//! One generic [`SerenityCalculator`] implements the host's
//! [`scine_core::Calculator`] trait; the electronic-structure method it runs
//! is a [`Method`] type parameter.

mod base;
mod cc;
mod dft;
mod hf;
mod state;

pub use base::{Job, Method, SerenityCalculator, MOVE_THRESHOLD, PROGRAM_NAME};
pub use state::SerenityState;
pub use cc::Cc;
pub use dft::Dft;
pub use hf::Hf;

use crate::engine::EngineError;
use crate::method::MethodError;
use crate::settings::SolvationError;
use scine_core::CoreError;

pub type DftCalculator = SerenityCalculator<Dft>;
pub type HfCalculator = SerenityCalculator<Hf>;
pub type CcCalculator = SerenityCalculator<Cc>;

impl From<EngineError> for CoreError {
    fn from(e: EngineError) -> Self {
        CoreError::UnsuccessfulCalculation(e.to_string())
    }
}

impl From<MethodError> for CoreError {
    fn from(e: MethodError) -> Self {
        CoreError::InvalidSettings(e.to_string())
    }
}

impl From<SolvationError> for CoreError {
    fn from(e: SolvationError) -> Self {
        CoreError::InvalidSettings(e.to_string())
    }
}
