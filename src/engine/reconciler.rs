use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    domain::types::BanMap,
    page::{ElementId, PageModel},
};

use super::replacement::ReplacementEngine;

#[derive(Default)]
struct LoadHooks {
    /// Armed and waiting for the element to finish loading.
    armed: HashSet<ElementId>,
    /// Ever armed; an element is never hooked a second time.
    seen: HashSet<ElementId>,
}

/// Brings the visible document into agreement with a ban map snapshot.
/// Repeated runs converge because the engine's `apply` is idempotent.
pub struct Reconciler {
    page: PageModel,
    engine: Arc<ReplacementEngine>,
    hooks: Mutex<LoadHooks>,
}

impl Reconciler {
    pub fn new(page: PageModel, engine: Arc<ReplacementEngine>) -> Self {
        Self {
            page,
            engine,
            hooks: Mutex::new(LoadHooks::default()),
        }
    }

    /// Scans every rendered image: banned and not yet replaced gets the
    /// substitution; not yet loaded gets a one-shot load hook, armed at
    /// most once per element.
    pub fn reconcile_visible(&self, ban_map: &BanMap) {
        let mut replaced = 0usize;
        for id in self.page.images() {
            match self.page.current_source(id).filter(|s| !s.is_empty()) {
                Some(source) => {
                    if ban_map.contains_key(&source) && !self.engine.is_replaced(id) {
                        let replacement = self.engine.choose_replacement(&source);
                        self.engine.apply(id, &replacement);
                        replaced += 1;
                    }
                }
                None => {
                    let mut hooks = self.hooks.lock();
                    if hooks.seen.insert(id) {
                        hooks.armed.insert(id);
                    }
                }
            }
        }
        if replaced > 0 {
            tracing::debug!(target: "reconcile", replaced, "banned images substituted");
        }
    }

    /// One-shot completion hook: fires only for elements armed by a prior
    /// scan and re-checks membership against the map current at load time.
    pub fn on_image_loaded(&self, id: ElementId, source: &str, ban_map: &BanMap) {
        if !self.hooks.lock().armed.remove(&id) {
            return;
        }
        if source.is_empty() {
            return;
        }
        if ban_map.contains_key(source) && !self.engine.is_replaced(id) {
            let replacement = self.engine.choose_replacement(source);
            self.engine.apply(id, &replacement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReplacementConfig,
        page::{ImageInit, Rect},
    };

    fn rig() -> (PageModel, Arc<ReplacementEngine>, Reconciler) {
        let (page, _events) = PageModel::new();
        let engine = Arc::new(ReplacementEngine::new(
            page.clone(),
            ReplacementConfig {
                covers: vec!["covers/steward-01.png".to_string()],
            },
        ));
        let reconciler = Reconciler::new(page.clone(), engine.clone());
        (page, engine, reconciler)
    }

    fn loaded_image(page: &PageModel, source: &str) -> ElementId {
        page.insert_image(ImageInit {
            source: source.into(),
            rect: Rect::new(0.0, 0.0, 100.0, 150.0),
            loaded: true,
            ..Default::default()
        })
    }

    fn ban_map(locations: &[&str]) -> BanMap {
        locations.iter().map(|l| (l.to_string(), true)).collect()
    }

    #[test]
    fn replaces_exactly_the_banned_images_and_converges() {
        let (page, engine, reconciler) = rig();
        let banned_a = loaded_image(&page, "a/cover_1.png");
        let banned_b = loaded_image(&page, "b/cover_2.png");
        let untouched = loaded_image(&page, "c/cover_3.png");
        let bans = ban_map(&["a/cover_1.png", "b/cover_2.png"]);

        reconciler.reconcile_visible(&bans);

        assert!(engine.is_replaced(banned_a));
        assert!(engine.is_replaced(banned_b));
        assert!(!engine.is_replaced(untouched));
        assert_eq!(page.snapshot(untouched).unwrap().source, "c/cover_3.png");

        let snapshots: Vec<_> = [banned_a, banned_b, untouched]
            .iter()
            .map(|id| page.snapshot(*id).unwrap())
            .collect();
        reconciler.reconcile_visible(&bans);
        let again: Vec<_> = [banned_a, banned_b, untouched]
            .iter()
            .map(|id| page.snapshot(*id).unwrap())
            .collect();
        assert_eq!(snapshots, again);
    }

    #[test]
    fn load_hook_applies_when_the_resolved_source_is_banned() {
        let (page, engine, reconciler) = rig();
        let pending = page.insert_image(ImageInit {
            source: "a/cover_9.png".into(),
            ..Default::default()
        });
        let bans = ban_map(&["a/cover_9.png"]);

        reconciler.reconcile_visible(&bans);
        assert!(!engine.is_replaced(pending));

        page.complete_load(pending, "a/cover_9.png");
        reconciler.on_image_loaded(pending, "a/cover_9.png", &bans);
        assert!(engine.is_replaced(pending));
    }

    #[test]
    fn load_hook_fires_at_most_once() {
        let (page, engine, reconciler) = rig();
        let pending = page.insert_image(ImageInit {
            source: "a/cover_9.png".into(),
            ..Default::default()
        });
        let bans = ban_map(&["a/cover_9.png"]);

        reconciler.reconcile_visible(&bans);

        // The load resolves to an unbanned source; the one-shot hook is
        // spent without replacing anything.
        page.complete_load(pending, "a/other.png");
        reconciler.on_image_loaded(pending, "a/other.png", &bans);
        assert!(!engine.is_replaced(pending));

        // A stray completion event for a now-banned source finds no hook.
        reconciler.on_image_loaded(pending, "a/cover_9.png", &bans);
        assert!(!engine.is_replaced(pending));

        // A later scan does not re-arm an element it has already hooked.
        reconciler.reconcile_visible(&bans);
        reconciler.on_image_loaded(pending, "a/cover_9.png", &bans);
        assert!(!engine.is_replaced(pending));
    }

    #[test]
    fn loaded_events_without_a_hook_are_ignored() {
        let (page, engine, reconciler) = rig();
        let id = loaded_image(&page, "a/cover_1.png");

        reconciler.on_image_loaded(id, "a/cover_1.png", &ban_map(&["a/cover_1.png"]));
        assert!(!engine.is_replaced(id));
    }
}
