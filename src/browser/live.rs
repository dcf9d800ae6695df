use crate::browser::agent;
use crate::browser::surface::{TabNotifier, TabSurface};
use crate::config::OverlayConfig;
use crate::dom::{self, Document};
use crate::engine::{BatchSummary, OverlayEngine};
use crate::error::Result;
use crate::events::{NavigationKind, PageEvent};
use crate::orchestrator::Orchestrator;
use crate::preferences::{JsonFilePreferences, PreferenceStore};
use headless_chrome::Tab;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Polls in a row that may fail before the tab is considered gone
const MAX_CONSECUTIVE_FAILURES: u32 = 20;

/// Keeps overlays on a live tab in sync until told to stop
pub struct LiveOverlay {
    tab: Arc<Tab>,
    engine: OverlayEngine<TabSurface>,
    poll_interval: Duration,
}

impl LiveOverlay {
    pub fn new(
        tab: Arc<Tab>,
        config: OverlayConfig,
        orchestrator: Orchestrator,
        preferences: Box<dyn PreferenceStore>,
    ) -> Self {
        let poll_interval = config.poll_interval;
        let engine = OverlayEngine::new(
            config,
            TabSurface::new(tab.clone()),
            orchestrator,
            Arc::new(TabNotifier::new(tab.clone())),
            preferences,
        );
        Self {
            tab,
            engine,
            poll_interval,
        }
    }

    /// HTTP collaborators and the preference file named in `config`
    pub fn from_config(tab: Arc<Tab>, config: OverlayConfig) -> Result<Self> {
        let orchestrator = Orchestrator::from_config(&config)?;
        let preferences = JsonFilePreferences::open(&config.preferences_path)?;
        Ok(Self::new(tab, config, orchestrator, Box::new(preferences)))
    }

    pub fn engine(&self) -> &OverlayEngine<TabSurface> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut OverlayEngine<TabSurface> {
        &mut self.engine
    }

    /// Install the agent and enter auto mode if the hostname has it enabled
    pub fn start(&mut self) -> Result<Document> {
        agent::install(&self.tab)?;
        let doc = dom::capture(&self.tab)?;
        self.engine.start(&doc);
        Ok(doc)
    }

    /// Drain agent events and feed them to the engine
    ///
    /// The page is only re-captured when something happened.
    pub fn poll(&mut self) -> Result<BatchSummary> {
        let events = match agent::drain(&self.tab)? {
            Some(events) => events,
            None => {
                log::info!("Page agent missing, reinstalling after reload");
                agent::install(&self.tab)?;
                vec![PageEvent::Navigation {
                    url: self.tab.get_url(),
                    kind: NavigationKind::Reload,
                }]
            }
        };
        if events.is_empty() {
            return Ok(BatchSummary::default());
        }

        log::debug!("Handling {} page events", events.len());
        let doc = dom::capture(&self.tab)?;
        Ok(self.engine.handle_events(&doc, &events))
    }

    /// Run until `shutdown` fires, then remove every overlay
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        self.start()?;
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut failures = 0;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.poll() {
                        Ok(_) => failures = 0,
                        Err(e) => {
                            failures += 1;
                            if failures >= MAX_CONSECUTIVE_FAILURES {
                                self.engine.shutdown();
                                return Err(e);
                            }
                            log::warn!("Skipping page update: {}", e);
                        }
                    }
                }
                Some(completion) = self.engine.next_completion(), if self.engine.in_flight() > 0 => {
                    // The page may have moved on since the job started
                    match dom::capture(&self.tab) {
                        Ok(doc) => {
                            self.engine.apply_completion(&doc, completion);
                        }
                        Err(e) => log::warn!("Failed to capture page for OCR result: {}", e),
                    }
                }
            }
        }

        log::info!("Stopping overlay on {}", self.tab.get_url());
        self.engine.shutdown();
        Ok(())
    }
}
