//! Auto-selection state machine
//!
//! While auto mode is enabled for the current hostname, every observed page
//! change re-runs image discovery in visible-area mode. When the primary
//! target or its image source differs from the recorded pair, the current
//! overlay is torn down and a fetch is requested for the new target.
//!
//! The machine does not touch the page itself. It returns [`AutoAction`]s
//! which the engine carries out.

pub mod observers;

pub use observers::ObserverSet;

use crate::discovery::{ScoreMode, image_source, select_primary};
use crate::dom::Document;
use crate::events::PageEvent;
use crate::locator::{ElementPath, resolve};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoState {
    Disabled,
    /// Enabled, no change pending
    Idle,
    /// Held for the span of one `run_pass`
    ///
    /// Passes take `&mut self`, so nothing runs inside one. Overlay writes reach the
    /// page agent, which discards the mutation records they cause with
    /// `takeRecords()`, so a pass never triggers the next one.
    Transitioning,
}

/// The last primary target seen and the image it showed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRecord {
    pub path: Option<ElementPath>,
    pub source: Option<String>,
}

impl TargetRecord {
    /// Whether `self` describes a different target than `previous`
    ///
    /// A vanished target alone is not a change; a changed source always is.
    pub fn differs_from(&self, previous: &TargetRecord) -> bool {
        (self.path.is_some() && self.path != previous.path) || self.source != previous.source
    }
}

/// Request to OCR a newly recorded target
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub target: ElementPath,
    pub source: Option<String>,
    /// Cancelled as soon as another target is recorded
    pub token: CancellationToken,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub enum AutoAction {
    /// Remove every overlay session
    TearDown,
    Fetch(FetchTicket),
}

/// Auto mode for one page
#[derive(Debug)]
pub struct AutoSelector {
    state: AutoState,
    min_area_ratio: f64,
    recorded: TargetRecord,
    observers: Option<ObserverSet>,
    token: Option<CancellationToken>,
    generation: u64,
}

impl AutoSelector {
    pub fn new(min_area_ratio: f64) -> Self {
        Self {
            state: AutoState::Disabled,
            min_area_ratio,
            recorded: TargetRecord::default(),
            observers: None,
            token: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> AutoState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state != AutoState::Disabled
    }

    pub fn recorded(&self) -> &TargetRecord {
        &self.recorded
    }

    pub fn observers(&self) -> Option<&ObserverSet> {
        self.observers.as_ref()
    }

    /// Whether a fetch issued with `generation` still belongs to the recorded target
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_enabled() && generation == self.generation && self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Enter the machine for a freshly loaded page with the stored preference
    pub fn init(&mut self, doc: &Document, enabled: bool) -> Vec<AutoAction> {
        if !enabled {
            self.disable();
            return Vec::new();
        }
        if self.is_enabled() {
            log::debug!("Auto mode already active on {}", doc.url());
            return Vec::new();
        }

        self.state = AutoState::Idle;
        self.observers = Some(ObserverSet::scan(doc));
        log::info!("Auto mode active on {}", doc.url());
        self.run_pass(doc)
    }

    /// React to one observed page event
    ///
    /// Navigation is not handled here; the engine calls [`teardown`](Self::teardown)
    /// and [`init`](Self::init) for the new page instead.
    pub fn on_page_change(&mut self, doc: &Document, event: &PageEvent) -> Vec<AutoAction> {
        if self.wants_pass(doc, event) {
            self.run_pass(doc)
        } else {
            Vec::new()
        }
    }

    /// Update observers for `event` and report whether it calls for a pass
    pub fn wants_pass(&mut self, doc: &Document, event: &PageEvent) -> bool {
        let Some(observers) = self.observers.as_mut() else {
            return false;
        };
        let relevant = observers.observes(event);
        if ObserverSet::needs_rescan(event) {
            *observers = ObserverSet::scan(doc);
        }
        relevant
    }

    /// Recompute the primary target and act if it changed
    pub fn run_pass(&mut self, doc: &Document) -> Vec<AutoAction> {
        if self.state != AutoState::Idle {
            return Vec::new();
        }
        self.state = AutoState::Transitioning;

        let path = select_primary(doc, ScoreMode::VisibleArea, self.min_area_ratio);
        let source = path
            .as_ref()
            .and_then(|p| resolve(doc, p))
            .and_then(|id| image_source(doc, id));
        let current = TargetRecord { path, source };

        let mut actions = Vec::new();
        if current.differs_from(&self.recorded) {
            log::info!(
                "Target changed: {:?} -> {:?}",
                self.recorded.path.as_ref().map(ElementPath::as_str),
                current.path.as_ref().map(ElementPath::as_str)
            );
            self.cancel_in_flight();
            actions.push(AutoAction::TearDown);

            if let Some(target) = current.path.clone() {
                let token = CancellationToken::new();
                self.generation += 1;
                self.token = Some(token.clone());
                actions.push(AutoAction::Fetch(FetchTicket {
                    target,
                    source: current.source.clone(),
                    token,
                    generation: self.generation,
                }));
            }
            self.recorded = current;
        }

        self.state = AutoState::Idle;
        actions
    }

    /// Leave auto mode: disconnect observers and forget the recorded target
    ///
    /// Existing overlays stay on the page.
    pub fn disable(&mut self) {
        if self.is_enabled() {
            log::info!("Auto mode disabled");
        }
        self.cancel_in_flight();
        self.observers = None;
        self.recorded = TargetRecord::default();
        self.state = AutoState::Disabled;
    }

    /// Full reset for navigation: also removes every overlay
    pub fn teardown(&mut self) -> Vec<AutoAction> {
        self.disable();
        vec![AutoAction::TearDown]
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, NodeId, Viewport};

    fn reader(src: &str, height: f64) -> Document {
        let body = ElementNode::new("body")
            .with_child(ElementNode::new("img").with_src("logo.png").with_layout(0.0, 0.0, 50.0, 50.0))
            .with_child(ElementNode::new("img").with_src(src).with_layout(100.0, 0.0, 800.0, height));
        Document::from_body(body, "https://example.com/read/1", Viewport::new(1000.0, 1000.0))
    }

    fn page_image(doc: &Document) -> NodeId {
        resolve(doc, &ElementPath::from("/html/body/img[2]")).unwrap()
    }

    fn fetches(actions: &[AutoAction]) -> Vec<&FetchTicket> {
        actions
            .iter()
            .filter_map(|a| match a {
                AutoAction::Fetch(ticket) => Some(ticket),
                AutoAction::TearDown => None,
            })
            .collect()
    }

    #[test]
    fn test_init_disabled_does_nothing() {
        let mut auto = AutoSelector::new(0.1);
        assert!(auto.init(&reader("1.jpg", 1000.0), false).is_empty());
        assert_eq!(auto.state(), AutoState::Disabled);
        assert!(auto.observers().is_none());
    }

    #[test]
    fn test_init_enabled_runs_first_pass() {
        let mut auto = AutoSelector::new(0.1);
        let actions = auto.init(&reader("1.jpg", 1000.0), true);

        assert!(matches!(actions[0], AutoAction::TearDown));
        let tickets = fetches(&actions);
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].target.as_str(), "/html/body/img[2]");
        assert_eq!(tickets[0].source.as_deref(), Some("1.jpg"));
        assert_eq!(auto.state(), AutoState::Idle);
        assert!(auto.is_current(tickets[0].generation));
    }

    #[test]
    fn test_unchanged_target_is_not_refetched() {
        let mut doc = reader("1.jpg", 1000.0);
        let mut auto = AutoSelector::new(0.1);
        auto.init(&doc, true);

        doc.scroll_window_by(0.0, 100.0);
        assert!(auto.on_page_change(&doc, &PageEvent::window_scroll()).is_empty());
        assert!(auto.on_page_change(&doc, &PageEvent::viewport_resize()).is_empty());
    }

    #[test]
    fn test_source_swap_refetches_once_and_cancels_previous() {
        let mut doc = reader("1.jpg", 1000.0);
        let mut auto = AutoSelector::new(0.1);
        let first = auto.init(&doc, true);
        let first_ticket = fetches(&first)[0].clone();

        let img = page_image(&doc);
        doc.set_attribute(img, "src", "2.jpg");
        let event = PageEvent::attribute("/html/body/img[2]", "src");

        let actions = auto.on_page_change(&doc, &event);
        assert_eq!(fetches(&actions).len(), 1);
        assert!(first_ticket.token.is_cancelled());
        assert!(!auto.is_current(first_ticket.generation));

        // later callbacks for the same swap are deduplicated
        assert!(auto.on_page_change(&doc, &event).is_empty());
        assert!(auto.on_page_change(&doc, &PageEvent::Load {
            target: Some(ElementPath::from("/html/body/img[2]"))
        })
        .is_empty());
    }

    #[test]
    fn test_target_below_threshold_tears_down_without_fetch() {
        let mut doc = reader("1.jpg", 1000.0);
        let mut auto = AutoSelector::new(0.1);
        auto.init(&doc, true);

        // scroll the page image almost entirely out of view
        doc.scroll_window_by(0.0, 990.0);
        let actions = auto.on_page_change(&doc, &PageEvent::window_scroll());

        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], AutoAction::TearDown));
        assert_eq!(auto.recorded(), &TargetRecord::default());
    }

    #[test]
    fn test_unobserved_events_are_ignored() {
        let mut doc = reader("1.jpg", 1000.0);
        let mut auto = AutoSelector::new(0.1);
        auto.init(&doc, true);

        let img = page_image(&doc);
        doc.set_attribute(img, "src", "2.jpg");
        let class_change = PageEvent::attribute("/html/body/img[2]", "class");
        assert!(auto.on_page_change(&doc, &class_change).is_empty());
    }

    #[test]
    fn test_pass_returns_to_idle() {
        let doc = reader("1.jpg", 1000.0);
        let mut auto = AutoSelector::new(0.1);
        auto.init(&doc, true);

        let swapped = reader("2.jpg", 1000.0);
        assert_eq!(auto.run_pass(&swapped).len(), 2);
        assert_eq!(auto.state(), AutoState::Idle);
        assert!(auto.run_pass(&swapped).is_empty());
        assert_eq!(auto.recorded().source.as_deref(), Some("2.jpg"));
    }

    #[test]
    fn test_disable_clears_state() {
        let doc = reader("1.jpg", 1000.0);
        let mut auto = AutoSelector::new(0.1);
        let ticket = fetches(&auto.init(&doc, true))[0].clone();

        auto.disable();
        assert_eq!(auto.state(), AutoState::Disabled);
        assert!(auto.observers().is_none());
        assert!(ticket.token.is_cancelled());
        assert!(auto.on_page_change(&doc, &PageEvent::window_scroll()).is_empty());

        // re-entering treats the same image as a new target
        assert_eq!(fetches(&auto.init(&doc, true)).len(), 1);
    }

    #[test]
    fn test_teardown_requests_overlay_removal() {
        let doc = reader("1.jpg", 1000.0);
        let mut auto = AutoSelector::new(0.1);
        auto.init(&doc, true);

        let actions = auto.teardown();
        assert!(matches!(actions.as_slice(), [AutoAction::TearDown]));
        assert!(!auto.is_enabled());
    }

    #[test]
    fn test_target_change_rule() {
        let a = TargetRecord {
            path: Some("/html/body/img[1]".into()),
            source: Some("1.jpg".into()),
        };
        let vanished = TargetRecord {
            path: None,
            source: Some("1.jpg".into()),
        };
        assert!(!a.differs_from(&a));
        assert!(!vanished.differs_from(&a));
        assert!(TargetRecord::default().differs_from(&a));
    }
}
