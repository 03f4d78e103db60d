//! Delegate notifications
//!
//! Hosts register only the handlers they care about on an [`AdDelegate`];
//! events without a handler are dropped. [`DelegateNotifier`] sits between
//! the controller and the delegate and enforces ordering:
//!
//! - per request cycle, at most one of `DidLoad` / `DidFailToReceiveAd`
//! - per action, `ActionWillBegin` → `ActionDidBegin` (only when not leaving
//!   the application) → `ActionDidFinish`
//!
//! Handlers run synchronously on the task that drives the controller.

use tracing::{debug, trace};

use crate::error::AdError;
use crate::registry::ControllerId;

/// Lifecycle events delivered to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdEvent {
    /// A creative was loaded
    DidLoad,
    /// The request cycle failed
    DidFailToReceiveAd(AdError),
    /// A user action is about to start
    ActionWillBegin { will_leave_application: bool },
    /// Full-screen content is showing
    ActionDidBegin,
    /// The action finished and control is back with the app
    ActionDidFinish,
    /// A user action was refused because another one is running
    ActionUnableToBegin,
    /// The presented interstitial is opening another application
    WillLeaveApplication,
}

type Handler = Box<dyn FnMut() + Send>;

/// Optional per-event handlers
///
/// # Example
///
/// ```rust
/// use oxm_core::AdDelegate;
///
/// let delegate = AdDelegate::new()
///     .on_did_load(|| println!("ad ready"))
///     .on_did_fail(|err| eprintln!("no ad: {} ({})", err, err.code()));
/// ```
#[derive(Default)]
pub struct AdDelegate {
    did_load: Option<Handler>,
    did_fail: Option<Box<dyn FnMut(&AdError) + Send>>,
    action_will_begin: Option<Box<dyn FnMut(bool) + Send>>,
    action_did_begin: Option<Handler>,
    action_did_finish: Option<Handler>,
    action_unable_to_begin: Option<Handler>,
    will_leave_application: Option<Handler>,
    any_event: Option<Box<dyn FnMut(&AdEvent) + Send>>,
}

impl AdDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_did_load(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.did_load = Some(Box::new(f));
        self
    }

    pub fn on_did_fail(mut self, f: impl FnMut(&AdError) + Send + 'static) -> Self {
        self.did_fail = Some(Box::new(f));
        self
    }

    /// Receives `will_leave_application`
    pub fn on_action_will_begin(mut self, f: impl FnMut(bool) + Send + 'static) -> Self {
        self.action_will_begin = Some(Box::new(f));
        self
    }

    pub fn on_action_did_begin(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.action_did_begin = Some(Box::new(f));
        self
    }

    pub fn on_action_did_finish(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.action_did_finish = Some(Box::new(f));
        self
    }

    pub fn on_action_unable_to_begin(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.action_unable_to_begin = Some(Box::new(f));
        self
    }

    pub fn on_will_leave_application(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.will_leave_application = Some(Box::new(f));
        self
    }

    /// Observe every event, after its specific handler
    pub fn on_event(mut self, f: impl FnMut(&AdEvent) + Send + 'static) -> Self {
        self.any_event = Some(Box::new(f));
        self
    }

    fn dispatch(&mut self, event: &AdEvent) {
        match event {
            AdEvent::DidLoad => call(&mut self.did_load),
            AdEvent::DidFailToReceiveAd(err) => {
                if let Some(f) = self.did_fail.as_mut() {
                    f(err);
                }
            }
            AdEvent::ActionWillBegin {
                will_leave_application,
            } => {
                if let Some(f) = self.action_will_begin.as_mut() {
                    f(*will_leave_application);
                }
            }
            AdEvent::ActionDidBegin => call(&mut self.action_did_begin),
            AdEvent::ActionDidFinish => call(&mut self.action_did_finish),
            AdEvent::ActionUnableToBegin => call(&mut self.action_unable_to_begin),
            AdEvent::WillLeaveApplication => call(&mut self.will_leave_application),
        }

        if let Some(f) = self.any_event.as_mut() {
            f(event);
        }
    }
}

fn call(handler: &mut Option<Handler>) {
    if let Some(f) = handler.as_mut() {
        f();
    }
}

impl std::fmt::Debug for AdDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdDelegate")
            .field("did_load", &self.did_load.is_some())
            .field("did_fail", &self.did_fail.is_some())
            .field("action_will_begin", &self.action_will_begin.is_some())
            .field("action_did_begin", &self.action_did_begin.is_some())
            .field("action_did_finish", &self.action_did_finish.is_some())
            .field("action_unable_to_begin", &self.action_unable_to_begin.is_some())
            .field("will_leave_application", &self.will_leave_application.is_some())
            .field("any_event", &self.any_event.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionPhase {
    Idle,
    WillBegin { will_leave_application: bool },
    Began,
}

/// Ordered, best-effort event delivery for one controller
#[derive(Debug)]
pub struct DelegateNotifier {
    controller: ControllerId,
    delegate: Option<AdDelegate>,
    last_cycle: Option<u64>,
    action: ActionPhase,
}

impl DelegateNotifier {
    pub fn new(controller: ControllerId) -> Self {
        Self {
            controller,
            delegate: None,
            last_cycle: None,
            action: ActionPhase::Idle,
        }
    }

    /// Replace the delegate; `None` drops all further events
    pub fn set_delegate(&mut self, delegate: Option<AdDelegate>) {
        self.delegate = delegate;
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    /// Report a successful cycle
    ///
    /// Returns `false` if the cycle already produced its outcome event.
    pub fn cycle_loaded(&mut self, ticket: u64) -> bool {
        if !self.open_cycle(ticket) {
            return false;
        }
        self.emit(AdEvent::DidLoad);
        true
    }

    /// Report a failed cycle; same once-per-cycle rule as `cycle_loaded`
    pub fn cycle_failed(&mut self, ticket: u64, error: &AdError) -> bool {
        if !self.open_cycle(ticket) {
            return false;
        }
        self.emit(AdEvent::DidFailToReceiveAd(error.clone()));
        true
    }

    /// Action accepted: `ActionWillBegin`, plus `ActionDidBegin` unless
    /// control is leaving the application
    pub fn action_began(&mut self, will_leave_application: bool) {
        self.action = ActionPhase::WillBegin {
            will_leave_application,
        };
        self.emit(AdEvent::ActionWillBegin {
            will_leave_application,
        });

        if !will_leave_application {
            self.action = ActionPhase::Began;
            self.emit(AdEvent::ActionDidBegin);
        }
    }

    /// Action finished; ignored unless one was started
    pub fn action_finished(&mut self) {
        if self.action == ActionPhase::Idle {
            debug!("Controller {}: finish without a running action, dropped", self.controller);
            return;
        }
        self.action = ActionPhase::Idle;
        self.emit(AdEvent::ActionDidFinish);
    }

    pub fn action_unable_to_begin(&mut self) {
        self.emit(AdEvent::ActionUnableToBegin);
    }

    pub fn will_leave_application(&mut self) {
        self.emit(AdEvent::WillLeaveApplication);
    }

    fn open_cycle(&mut self, ticket: u64) -> bool {
        if self.last_cycle == Some(ticket) {
            debug!(
                "Controller {}: cycle {} already notified, dropping duplicate",
                self.controller, ticket
            );
            return false;
        }
        self.last_cycle = Some(ticket);
        true
    }

    fn emit(&mut self, event: AdEvent) {
        match self.delegate.as_mut() {
            Some(delegate) => {
                trace!("Controller {}: delivering {:?}", self.controller, event);
                delegate.dispatch(&event);
            }
            None => trace!("Controller {}: no delegate for {:?}", self.controller, event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording() -> (AdDelegate, Arc<Mutex<Vec<AdEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let delegate = AdDelegate::new().on_event(move |e| sink.lock().unwrap().push(e.clone()));
        (delegate, events)
    }

    #[test]
    fn test_one_outcome_per_cycle() {
        let (delegate, events) = recording();
        let mut notifier = DelegateNotifier::new(ControllerId::next());
        notifier.set_delegate(Some(delegate));

        assert!(notifier.cycle_loaded(1));
        assert!(!notifier.cycle_failed(1, &AdError::NoAdsLoaded));
        assert!(notifier.cycle_failed(2, &AdError::NoAdsLoaded));

        assert_eq!(
            *events.lock().unwrap(),
            vec![AdEvent::DidLoad, AdEvent::DidFailToReceiveAd(AdError::NoAdsLoaded)]
        );
    }

    #[test]
    fn test_leave_application_skips_did_begin() {
        let (delegate, events) = recording();
        let mut notifier = DelegateNotifier::new(ControllerId::next());
        notifier.set_delegate(Some(delegate));

        notifier.action_began(true);
        notifier.action_finished();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                AdEvent::ActionWillBegin {
                    will_leave_application: true
                },
                AdEvent::ActionDidFinish,
            ]
        );
    }

    #[test]
    fn test_finish_without_action_is_dropped() {
        let (delegate, events) = recording();
        let mut notifier = DelegateNotifier::new(ControllerId::next());
        notifier.set_delegate(Some(delegate));

        notifier.action_finished();
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_specific_handlers() {
        let loads = Arc::new(Mutex::new(0));
        let leaves = Arc::new(Mutex::new(Vec::new()));
        let (l, w) = (loads.clone(), leaves.clone());

        let mut notifier = DelegateNotifier::new(ControllerId::next());
        notifier.set_delegate(Some(
            AdDelegate::new()
                .on_did_load(move || *l.lock().unwrap() += 1)
                .on_action_will_begin(move |leave| w.lock().unwrap().push(leave)),
        ));

        notifier.cycle_loaded(7);
        notifier.action_began(false);
        notifier.action_unable_to_begin();

        assert_eq!(*loads.lock().unwrap(), 1);
        assert_eq!(*leaves.lock().unwrap(), vec![false]);
    }

    #[test]
    fn test_missing_delegate_drops_silently() {
        let mut notifier = DelegateNotifier::new(ControllerId::next());
        assert!(!notifier.has_delegate());
        assert!(notifier.cycle_loaded(1));
        notifier.action_began(false);
        notifier.action_finished();
    }
}
