use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{
    config::ReplacementConfig,
    page::{ContentFit, ElementId, PageModel},
};

const FALLBACK_WIDTH: u32 = 200;
const FALLBACK_HEIGHT: u32 = 300;
const DEFAULT_LABEL: &str = "Replacement cover";

/// Per-element record of what a substitution displaced. Created on the
/// first substitution of an element, read on restoration, and kept for the
/// element's lifetime.
#[derive(Debug, Clone, Default)]
pub struct ReplacementState {
    pub original_source: String,
    pub original_source_set: Option<String>,
    pub replaced: bool,
}

/// Idempotent substitute/restore state machine over the document model.
/// Replacement state lives in an explicit side table keyed by element
/// identity, never on the element itself.
pub struct ReplacementEngine {
    page: PageModel,
    config: ReplacementConfig,
    states: Mutex<HashMap<ElementId, ReplacementState>>,
}

impl ReplacementEngine {
    pub fn new(page: PageModel, config: ReplacementConfig) -> Self {
        Self {
            page,
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Picks the substitute shown in place of a banned location.
    // TODO: key the choice by location once more than one replacement ships.
    pub fn choose_replacement(&self, _location: &str) -> String {
        self.config.covers.first().cloned().unwrap_or_default()
    }

    /// Substitutes `replacement` for the element's current content. No-op
    /// when the element is already replaced; the original source and
    /// source-set are captured once, before the first substitution touches
    /// them.
    pub fn apply(&self, id: ElementId, replacement: &str) {
        let mut states = self.states.lock();
        let state = states.entry(id).or_default();
        if state.replaced {
            return;
        }

        if state.original_source.is_empty() {
            state.original_source = self
                .page
                .current_source(id)
                .or_else(|| self.page.static_source(id))
                .unwrap_or_default();
            state.original_source_set = self.page.source_set(id);
        }

        // A higher-priority alternate declaration would reassert the banned
        // image the next time the surface re-evaluates its sources.
        self.page.strip_alternate_sources(id);

        let rect = self.page.rect(id).unwrap_or_default();
        let natural = self.page.natural_size(id).unwrap_or_default();
        let width = first_nonzero(rect.width as u32, natural.0, FALLBACK_WIDTH);
        let height = first_nonzero(rect.height as u32, natural.1, FALLBACK_HEIGHT);
        self.page.fix_box(id, width, height);
        self.page.set_content_fit(id, Some(ContentFit::Contain));

        self.page.clear_source_set(id);
        self.page.set_source(id, replacement);
        self.page.set_label_if_missing(id, DEFAULT_LABEL);

        state.replaced = true;
    }

    /// Replays the captured original. Never re-derives anything from the
    /// ban state; what was captured on first substitution is what comes
    /// back.
    pub fn restore(&self, id: ElementId) {
        let mut states = self.states.lock();
        let Some(state) = states.get_mut(&id) else {
            return;
        };
        if !state.replaced {
            return;
        }

        self.page.set_source(id, &state.original_source);
        if let Some(source_set) = state.original_source_set.clone() {
            self.page.set_source_set(id, &source_set);
        }
        self.page.set_content_fit(id, None);

        state.replaced = false;
    }

    pub fn is_replaced(&self, id: ElementId) -> bool {
        self.states.lock().get(&id).map_or(false, |s| s.replaced)
    }

    /// The original source captured for an element, if any was.
    pub fn original_source(&self, id: ElementId) -> Option<String> {
        self.states
            .lock()
            .get(&id)
            .map(|s| s.original_source.clone())
            .filter(|s| !s.is_empty())
    }

    /// Effective source of an element: the captured original when the
    /// element is or was replaced, else its resolved current source, else
    /// the static attribute.
    pub fn effective_source(&self, id: ElementId) -> Option<String> {
        self.original_source(id)
            .or_else(|| self.page.current_source(id))
            .or_else(|| self.page.static_source(id))
            .filter(|s| !s.is_empty())
    }

    /// Live element whose effective source equals `location`.
    pub fn find_by_effective_source(&self, location: &str) -> Option<ElementId> {
        self.page
            .images()
            .into_iter()
            .find(|id| self.effective_source(*id).as_deref() == Some(location))
    }
}

fn first_nonzero(a: u32, b: u32, fallback: u32) -> u32 {
    if a > 0 {
        a
    } else if b > 0 {
        b
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{ImageInit, Rect};

    fn rig() -> (PageModel, ReplacementEngine) {
        let (page, _events) = PageModel::new();
        let engine = ReplacementEngine::new(
            page.clone(),
            ReplacementConfig {
                covers: vec!["covers/steward-01.png".to_string()],
            },
        );
        (page, engine)
    }

    fn sample_image(page: &PageModel) -> ElementId {
        page.insert_image(ImageInit {
            source: "a/cover_1.png".into(),
            source_set: Some("a/cover_1.png 1x, a/cover_1@2x.png 2x".into()),
            rect: Rect::new(0.0, 0.0, 120.0, 180.0),
            natural_size: (600, 900),
            loaded: true,
            alternate_sources: vec!["a/cover_1.avif".into()],
            ..Default::default()
        })
    }

    #[test]
    fn apply_substitutes_and_pins_the_box() {
        let (page, engine) = rig();
        let id = sample_image(&page);

        engine.apply(id, "covers/steward-01.png");

        let snap = page.snapshot(id).unwrap();
        assert_eq!(snap.source, "covers/steward-01.png");
        assert_eq!(snap.source_set, None);
        assert_eq!(snap.fixed_box, Some((120, 180)));
        assert_eq!(snap.content_fit, Some(ContentFit::Contain));
        assert!(snap.alternate_sources.is_empty());
        assert_eq!(snap.label.as_deref(), Some("Replacement cover"));
        assert!(engine.is_replaced(id));
    }

    #[test]
    fn apply_twice_equals_apply_once() {
        let (page, engine) = rig();
        let id = sample_image(&page);

        engine.apply(id, "covers/steward-01.png");
        let first = page.snapshot(id).unwrap();
        engine.apply(id, "covers/steward-01.png");
        let second = page.snapshot(id).unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.original_source(id).as_deref(), Some("a/cover_1.png"));
    }

    #[test]
    fn restore_round_trips_source_and_source_set() {
        let (page, engine) = rig();
        let id = sample_image(&page);
        let before = page.snapshot(id).unwrap();

        engine.apply(id, "covers/steward-01.png");
        engine.restore(id);

        let after = page.snapshot(id).unwrap();
        assert_eq!(after.source, before.source);
        assert_eq!(after.source_set, before.source_set);
        assert_eq!(after.content_fit, None);
        assert!(!engine.is_replaced(id));
    }

    #[test]
    fn restore_without_prior_apply_is_a_noop() {
        let (page, engine) = rig();
        let id = sample_image(&page);
        let before = page.snapshot(id).unwrap();

        engine.restore(id);

        assert_eq!(page.snapshot(id).unwrap(), before);
    }

    #[test]
    fn existing_label_is_preserved() {
        let (page, engine) = rig();
        let id = page.insert_image(ImageInit {
            source: "a/cover_2.png".into(),
            label: Some("Volume 2 cover".into()),
            loaded: true,
            ..Default::default()
        });

        engine.apply(id, "covers/steward-01.png");
        assert_eq!(
            page.snapshot(id).unwrap().label.as_deref(),
            Some("Volume 2 cover")
        );
    }

    #[test]
    fn zero_sized_box_falls_back_to_defaults() {
        let (page, engine) = rig();
        let id = page.insert_image(ImageInit {
            source: "a/cover_3.png".into(),
            loaded: true,
            ..Default::default()
        });

        engine.apply(id, "covers/steward-01.png");
        assert_eq!(page.snapshot(id).unwrap().fixed_box, Some((200, 300)));
    }
}
