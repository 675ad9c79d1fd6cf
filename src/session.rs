use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_cron_scheduler::JobScheduler;

use crate::{
    commands::{CommandHandler, CoverCommand},
    config::AppConfig,
    db::{BanMirror, BanStore},
    engine::{Reconciler, ReplacementEngine},
    infrastructure::shutdown::ShutdownListener,
    observer,
    page::{PageEvent, PageModel},
    sync::{configure_refresh_jobs, BanAuthority, Syncer},
};

/// Per-document-context coordinator. Owns the reactive loop that keeps one
/// live document in agreement with the ban store: the startup sequence on
/// page-ready, rescans on qualifying structural changes, load hooks, and
/// the pointer-scoped command surface.
pub struct GuardSession {
    page_events: mpsc::UnboundedReceiver<PageEvent>,
    commands_tx: mpsc::Sender<CoverCommand>,
    commands_rx: mpsc::Receiver<CoverCommand>,
    mirror: BanMirror,
    syncer: Arc<Syncer>,
    reconciler: Reconciler,
    handler: CommandHandler,
    scheduler: JobScheduler,
}

impl GuardSession {
    pub async fn initialize(
        config: &AppConfig,
        store: BanStore,
        authority: Arc<dyn BanAuthority>,
        page: PageModel,
        page_events: mpsc::UnboundedReceiver<PageEvent>,
    ) -> Result<Self> {
        let engine = Arc::new(ReplacementEngine::new(
            page.clone(),
            config.replacement.clone(),
        ));
        let syncer = Arc::new(Syncer::new(
            store.clone(),
            authority,
            config.remote.fetch_ttl,
        ));
        let reconciler = Reconciler::new(page.clone(), engine.clone());
        let handler = CommandHandler::new(page, store.clone(), engine, syncer.clone());
        let mirror = BanMirror::new(store.subscribe());
        let scheduler = configure_refresh_jobs(&config.scheduler.refresh_crons, syncer.clone()).await?;
        let (commands_tx, commands_rx) = mpsc::channel(16);

        Ok(Self {
            page_events,
            commands_tx,
            commands_rx,
            mirror,
            syncer,
            reconciler,
            handler,
            scheduler,
        })
    }

    /// Handle the UI collaborator uses to raise ban/unban commands.
    pub fn command_sender(&self) -> mpsc::Sender<CoverCommand> {
        self.commands_tx.clone()
    }

    /// The startup sequence: refresh the ban store, then bring the visible
    /// document into agreement with it. Run on page-ready and re-run after
    /// qualifying structural changes; every step is idempotent, so
    /// overlapping runs do redundant rather than wrong work.
    pub async fn startup(&self) -> Result<()> {
        let ban_map = self.syncer.refresh().await?;
        self.reconciler.reconcile_visible(&ban_map);
        Ok(())
    }

    /// Runs the startup sequence and then the reactive loop until shutdown.
    /// Failures inside the loop are logged and the loop continues; nothing
    /// in this core is fatal.
    pub async fn run(mut self, mut shutdown: ShutdownListener) -> Result<()> {
        tracing::info!(target: "session", "cover guard session starting");
        if let Err(err) = self.startup().await {
            tracing::error!(target: "session", error = %err, "startup sequence failed");
        }

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                Some(command) = self.commands_rx.recv() => {
                    if let Err(err) = self.handler.handle(command).await {
                        tracing::error!(target: "session", error = %err, "command failed");
                    }
                }
                Some(event) = self.page_events.recv() => {
                    if let Err(err) = self.handle_page_event(event).await {
                        tracing::error!(target: "session", error = %err, "page event handling failed");
                    }
                }
                _ = self.mirror.changed() => {
                    tracing::debug!(
                        target: "session",
                        total = self.mirror.current().len(),
                        "ban mirror replaced"
                    );
                }
            }
        }

        if let Err(err) = self.scheduler.shutdown().await {
            tracing::warn!(target: "session", error = %err, "scheduler shutdown failed");
        }
        tracing::info!(target: "session", "cover guard session stopped");
        Ok(())
    }

    async fn handle_page_event(&self, event: PageEvent) -> Result<()> {
        match event {
            PageEvent::ImageLoaded { id, source } => {
                self.reconciler
                    .on_image_loaded(id, &source, &self.mirror.current());
                Ok(())
            }
            PageEvent::NodesInserted(batch) => {
                if observer::batch_triggers_rescan(&batch) {
                    self.startup().await?;
                }
                Ok(())
            }
        }
    }
}
