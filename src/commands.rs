use std::sync::Arc;

use anyhow::Result;

use crate::{
    db::BanStore,
    engine::ReplacementEngine,
    page::PageModel,
    sync::Syncer,
};

/// Commands raised by the external UI collaborator. The target is implicit:
/// whatever image sits under the last known pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverCommand {
    BanHere,
    UnbanHere,
}

/// Resolves pointer-scoped commands against the store and the engine,
/// giving immediate feedback on the affected element outside the regular
/// reconcile cycle.
pub struct CommandHandler {
    page: PageModel,
    store: BanStore,
    engine: Arc<ReplacementEngine>,
    syncer: Arc<Syncer>,
}

impl CommandHandler {
    pub fn new(
        page: PageModel,
        store: BanStore,
        engine: Arc<ReplacementEngine>,
        syncer: Arc<Syncer>,
    ) -> Self {
        Self {
            page,
            store,
            engine,
            syncer,
        }
    }

    pub async fn handle(&self, command: CoverCommand) -> Result<()> {
        let Some(location) = self.pointer_location() else {
            tracing::debug!(target: "commands", ?command, "no image under pointer");
            return Ok(());
        };
        match command {
            CoverCommand::BanHere => self.ban_here(&location).await,
            CoverCommand::UnbanHere => self.unban_here(&location).await,
        }
    }

    /// Effective source of the image under the last known pointer position.
    fn pointer_location(&self) -> Option<String> {
        let id = self.page.image_under_pointer()?;
        self.engine.effective_source(id)
    }

    async fn ban_here(&self, location: &str) -> Result<()> {
        self.store.ban(location).await?;

        let Some(id) = self.engine.find_by_effective_source(location) else {
            tracing::debug!(target: "commands", location, "no live element for banned location");
            return Ok(());
        };
        let replacement = self.engine.choose_replacement(location);
        self.engine.apply(id, &replacement);

        self.syncer.report_banned(location);
        tracing::info!(target: "commands", location, "cover banned from pointer context");
        Ok(())
    }

    async fn unban_here(&self, location: &str) -> Result<()> {
        self.store.allow(location).await?;

        let Some(id) = self.engine.find_by_effective_source(location) else {
            tracing::debug!(target: "commands", location, "no live element for allowed location");
            return Ok(());
        };
        self.engine.restore(id);

        tracing::info!(target: "commands", location, "cover restored from pointer context");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use futures::future::BoxFuture;
    use parking_lot::Mutex;

    use super::*;
    use crate::{
        config::ReplacementConfig,
        db::init_pool,
        page::{ElementId, ImageInit, Rect},
        sync::BanAuthority,
    };

    #[derive(Default)]
    struct RecordingAuthority {
        reports: Mutex<Vec<String>>,
    }

    impl BanAuthority for RecordingAuthority {
        fn fetch_banned(&self) -> BoxFuture<'_, Result<Vec<String>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn report_ban(&self, location: &str) -> BoxFuture<'static, Result<()>> {
            self.reports.lock().push(location.to_string());
            Box::pin(async { Ok(()) })
        }
    }

    struct Rig {
        page: PageModel,
        store: BanStore,
        engine: Arc<ReplacementEngine>,
        handler: CommandHandler,
        authority: Arc<RecordingAuthority>,
        _dir: tempfile::TempDir,
    }

    async fn rig() -> Rig {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = init_pool(&dir.path().join("guard.db")).await.expect("pool");
        let store = BanStore::new(pool).await.expect("store");
        let (page, _events) = PageModel::new();
        let engine = Arc::new(ReplacementEngine::new(
            page.clone(),
            ReplacementConfig {
                covers: vec!["covers/steward-01.png".to_string()],
            },
        ));
        let authority = Arc::new(RecordingAuthority::default());
        let syncer = Arc::new(Syncer::new(
            store.clone(),
            authority.clone(),
            std::time::Duration::from_secs(1),
        ));
        let handler = CommandHandler::new(page.clone(), store.clone(), engine.clone(), syncer);
        Rig {
            page,
            store,
            engine,
            handler,
            authority,
            _dir: dir,
        }
    }

    fn cover_under_pointer(rig: &Rig) -> ElementId {
        let id = rig.page.insert_image(ImageInit {
            source: "x/cover_7.png".into(),
            rect: Rect::new(10.0, 10.0, 100.0, 150.0),
            loaded: true,
            ..Default::default()
        });
        rig.page.set_pointer(50.0, 60.0);
        id
    }

    #[tokio::test]
    async fn ban_here_updates_store_element_and_authority() {
        let rig = rig().await;
        let id = cover_under_pointer(&rig);

        rig.handler.handle(CoverCommand::BanHere).await.unwrap();

        let bans = rig.store.ban_map().await.unwrap();
        assert!(bans.contains_key("x/cover_7.png"));
        assert!(bans.contains_key("x/cover_thumb_7.png"));
        assert_eq!(
            rig.page.snapshot(id).unwrap().source,
            "covers/steward-01.png"
        );
        assert_eq!(*rig.authority.reports.lock(), vec!["x/cover_7.png".to_string()]);
    }

    #[tokio::test]
    async fn unban_here_restores_the_original() {
        let rig = rig().await;
        let id = cover_under_pointer(&rig);

        rig.handler.handle(CoverCommand::BanHere).await.unwrap();
        // The pointer still resolves the replaced element through its
        // captured original source.
        rig.handler.handle(CoverCommand::UnbanHere).await.unwrap();

        let allows = rig.store.allow_map().await.unwrap();
        assert!(allows.contains_key("x/cover_7.png"));
        assert!(allows.contains_key("x/cover_thumb_7.png"));
        assert!(rig.store.ban_map().await.unwrap().is_empty());
        assert_eq!(rig.page.snapshot(id).unwrap().source, "x/cover_7.png");
        assert!(!rig.engine.is_replaced(id));
    }

    #[tokio::test]
    async fn command_without_a_target_is_a_silent_noop() {
        let rig = rig().await;
        rig.page.set_pointer(999.0, 999.0);

        rig.handler.handle(CoverCommand::BanHere).await.unwrap();

        assert!(rig.store.ban_map().await.unwrap().is_empty());
        assert!(rig.authority.reports.lock().is_empty());
    }
}
