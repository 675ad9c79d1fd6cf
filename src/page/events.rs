use super::model::ElementId;

/// Observable summary of a node inserted into the live document: its text
/// content and the targets of any anchors it contains. This is all the
/// listing heuristic ever sees, so it can be tested without a rendering
/// surface.
#[derive(Debug, Clone, Default)]
pub struct NodeSummary {
    pub text: String,
    pub anchor_targets: Vec<String>,
}

impl NodeSummary {
    pub fn new(text: impl Into<String>, anchor_targets: Vec<String>) -> Self {
        Self {
            text: text.into(),
            anchor_targets,
        }
    }
}

/// Asynchronous structural changes reported by the document model.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// An image finished loading and resolved its current source.
    ImageLoaded { id: ElementId, source: String },
    /// A batch of node insertions, one summary per added node.
    NodesInserted(Vec<NodeSummary>),
}
