pub mod reconciler;
pub mod replacement;

pub use reconciler::Reconciler;
pub use replacement::{ReplacementEngine, ReplacementState};
