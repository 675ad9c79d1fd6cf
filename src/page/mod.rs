pub mod events;
pub mod model;

pub use events::{NodeSummary, PageEvent};
pub use model::{ContentFit, ElementId, ImageInit, ImageSnapshot, PageModel, Rect};
