use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::events::{NodeSummary, PageEvent};

/// Identity of an image element for the lifetime of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

/// How rendered content is fitted into a fixed element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFit {
    Contain,
}

/// Rendered geometry of an element, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Host-supplied description of an image element entering the document.
#[derive(Debug, Clone, Default)]
pub struct ImageInit {
    pub source: String,
    pub source_set: Option<String>,
    pub label: Option<String>,
    pub rect: Rect,
    pub natural_size: (u32, u32),
    /// When true the current source resolves immediately; otherwise the
    /// element stays unresolved until [`PageModel::complete_load`].
    pub loaded: bool,
    /// Alternate-resolution declarations under the enclosing grouping
    /// container, highest priority first.
    pub alternate_sources: Vec<String>,
}

#[derive(Debug)]
struct ImageElement {
    id: ElementId,
    source: String,
    source_set: Option<String>,
    current_source: Option<String>,
    label: Option<String>,
    rect: Rect,
    natural_size: (u32, u32),
    fixed_box: Option<(u32, u32)>,
    content_fit: Option<ContentFit>,
    alternate_sources: Vec<String>,
}

/// Read-only view of an image element's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSnapshot {
    pub source: String,
    pub source_set: Option<String>,
    pub current_source: Option<String>,
    pub label: Option<String>,
    pub fixed_box: Option<(u32, u32)>,
    pub content_fit: Option<ContentFit>,
    pub alternate_sources: Vec<String>,
}

#[derive(Default)]
struct PageInner {
    images: Vec<ImageElement>,
    pointer: (f64, f64),
    next_id: u64,
}

/// In-memory model of the live visual document. The embedding collaborator
/// mutates it as the real surface changes (insertions, load completions,
/// pointer movement); load completions and structural insertions are
/// emitted as [`PageEvent`]s on the channel returned by [`PageModel::new`].
///
/// Handles are cheap clones over shared state; mutations from the engine
/// and from the host interleave without ordering guarantees beyond each
/// single call.
#[derive(Clone)]
pub struct PageModel {
    inner: Arc<Mutex<PageInner>>,
    events: mpsc::UnboundedSender<PageEvent>,
}

impl PageModel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PageEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let model = Self {
            inner: Arc::new(Mutex::new(PageInner::default())),
            events,
        };
        (model, receiver)
    }

    // Host-side mutators.

    pub fn insert_image(&self, init: ImageInit) -> ElementId {
        let mut inner = self.inner.lock();
        let id = ElementId(inner.next_id);
        inner.next_id += 1;
        let current_source = init.loaded.then(|| init.source.clone());
        inner.images.push(ImageElement {
            id,
            source: init.source,
            source_set: init.source_set,
            current_source,
            label: init.label,
            rect: init.rect,
            natural_size: init.natural_size,
            fixed_box: None,
            content_fit: None,
            alternate_sources: init.alternate_sources,
        });
        id
    }

    /// Marks an image as finished loading with its resolved source and
    /// reports the completion.
    pub fn complete_load(&self, id: ElementId, resolved: &str) {
        {
            let mut inner = self.inner.lock();
            let Some(image) = inner.images.iter_mut().find(|i| i.id == id) else {
                return;
            };
            image.current_source = Some(resolved.to_string());
        }
        let _ = self.events.send(PageEvent::ImageLoaded {
            id,
            source: resolved.to_string(),
        });
    }

    /// Reports a batch of structural insertions.
    pub fn record_insertions(&self, batch: Vec<NodeSummary>) {
        if batch.is_empty() {
            return;
        }
        let _ = self.events.send(PageEvent::NodesInserted(batch));
    }

    /// Tracks the pointer continuously; commands resolve their target from
    /// the last position seen here.
    pub fn set_pointer(&self, x: f64, y: f64) {
        self.inner.lock().pointer = (x, y);
    }

    // Queries.

    pub fn images(&self) -> Vec<ElementId> {
        self.inner.lock().images.iter().map(|i| i.id).collect()
    }

    /// Resolved current source; `None` until the image has loaded.
    pub fn current_source(&self, id: ElementId) -> Option<String> {
        self.with_image(id, |i| i.current_source.clone()).flatten()
    }

    /// The static source attribute.
    pub fn static_source(&self, id: ElementId) -> Option<String> {
        self.with_image(id, |i| i.source.clone())
    }

    pub fn source_set(&self, id: ElementId) -> Option<String> {
        self.with_image(id, |i| i.source_set.clone()).flatten()
    }

    pub fn rect(&self, id: ElementId) -> Option<Rect> {
        self.with_image(id, |i| i.rect)
    }

    pub fn natural_size(&self, id: ElementId) -> Option<(u32, u32)> {
        self.with_image(id, |i| i.natural_size)
    }

    /// Topmost image under the last known pointer position.
    pub fn image_under_pointer(&self) -> Option<ElementId> {
        let inner = self.inner.lock();
        let (x, y) = inner.pointer;
        inner
            .images
            .iter()
            .rev()
            .find(|i| i.rect.contains(x, y))
            .map(|i| i.id)
    }

    pub fn snapshot(&self, id: ElementId) -> Option<ImageSnapshot> {
        self.with_image(id, |i| ImageSnapshot {
            source: i.source.clone(),
            source_set: i.source_set.clone(),
            current_source: i.current_source.clone(),
            label: i.label.clone(),
            fixed_box: i.fixed_box,
            content_fit: i.content_fit,
            alternate_sources: i.alternate_sources.clone(),
        })
    }

    // Engine-side mutators.

    /// Sets the source attribute; the model resolves it immediately.
    pub fn set_source(&self, id: ElementId, source: &str) {
        self.mutate(id, |i| {
            i.source = source.to_string();
            i.current_source = Some(source.to_string());
        });
    }

    pub fn set_source_set(&self, id: ElementId, value: &str) {
        self.mutate(id, |i| i.source_set = Some(value.to_string()));
    }

    pub fn clear_source_set(&self, id: ElementId) {
        self.mutate(id, |i| i.source_set = None);
    }

    /// Drops the alternate-resolution declarations under the enclosing
    /// grouping container so none of them can reassert a banned source.
    pub fn strip_alternate_sources(&self, id: ElementId) {
        self.mutate(id, |i| i.alternate_sources.clear());
    }

    /// Pins the rendered box so a substitution does not reflow the layout.
    pub fn fix_box(&self, id: ElementId, width: u32, height: u32) {
        self.mutate(id, |i| i.fixed_box = Some((width, height)));
    }

    pub fn set_content_fit(&self, id: ElementId, fit: Option<ContentFit>) {
        self.mutate(id, |i| i.content_fit = fit);
    }

    pub fn set_label_if_missing(&self, id: ElementId, label: &str) {
        self.mutate(id, |i| {
            if i.label.as_deref().map_or(true, str::is_empty) {
                i.label = Some(label.to_string());
            }
        });
    }

    fn with_image<T>(&self, id: ElementId, f: impl FnOnce(&ImageElement) -> T) -> Option<T> {
        self.inner.lock().images.iter().find(|i| i.id == id).map(f)
    }

    fn mutate(&self, id: ElementId, f: impl FnOnce(&mut ImageElement)) {
        if let Some(image) = self.inner.lock().images.iter_mut().find(|i| i.id == id) {
            f(image);
        }
    }
}
