//! Calculator state snapshots.

use std::any::Any;

/// An opaque snapshot taken by [`crate::Calculator::get_state`].
///
/// Only the calculator type that produced a state knows its concrete type;
/// it recovers it through [`State::as_any`].
pub trait State: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}
