//! Auto-refreshing banner controller
//!
//! ## Lifecycle
//!
//! 1. `start_loading()` issues the first request and arms the refresh timer
//! 2. `pump().await` completes requests and fires refresh ticks
//! 3. Each finished cycle (loaded or failed) re-arms the timer one full
//!    interval ahead, so refreshes never overlap a running request
//! 4. `stop_loading()` cancels both, synchronously
//!
//! Rotation swaps ad units: if the id for the new orientation differs from
//! the one being loaded or shown, the running request is superseded. While
//! a user action is in progress the swap is deferred to `end_action()`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::lifecycle::{AdLifecycle, CycleOutcome, LoadState};
use super::{InFlight, detect_location, wait_in_flight};
use crate::action::{ActionKind, ActionStateTracker};
use crate::config::{AdConfig, RefreshConfig};
use crate::error::Result;
use crate::notifier::{AdDelegate, DelegateNotifier};
use crate::orientation::Orientation;
use crate::registry::{ControllerId, ModalRegistry};
use crate::request::AdRequestSpec;
use crate::response::{Creative, classify};
use crate::scheduler::{RefreshScheduler, interval_from_secs};
use crate::targeting::TargetingProfile;
use crate::traits::{AdTransport, LocationSource, TransportResult};

enum Step {
    Completed(u64, TransportResult),
    Tick,
}

/// Banner ad controller
///
/// # Example
///
/// ```rust,ignore
/// let mut banner = BannerController::new(config, transport)?;
/// banner.set_delegate(AdDelegate::new().on_did_load(|| println!("new ad")));
/// banner.start_loading()?;
///
/// loop {
///     tokio::select! {
///         _ = banner.pump() => {}
///         _ = shutdown.recv() => break,
///     }
/// }
/// banner.stop_loading();
/// ```
pub struct BannerController {
    id: ControllerId,
    lifecycle: AdLifecycle,
    refresh: RefreshConfig,
    scheduler: RefreshScheduler,
    transport: Arc<dyn AdTransport>,
    location: Option<Arc<dyn LocationSource>>,
    in_flight: Option<InFlight>,
    actions: ActionStateTracker,
    notifier: DelegateNotifier,
    registry: Arc<ModalRegistry>,
    rotation_deferred: bool,
}

impl BannerController {
    /// Create a stopped banner
    ///
    /// Fails only if `config` is invalid. Missing ad unit ids are reported
    /// by `start_loading()`.
    pub fn new(config: AdConfig, transport: Arc<dyn AdTransport>) -> Result<Self> {
        config.validate()?;

        let id = ControllerId::next();
        let interval = interval_from_secs(config.refresh.interval_secs);

        info!(
            "Banner {} created for {} (transport: {}, refresh: {:?})",
            id,
            config.domain,
            transport.transport_name(),
            interval
        );

        Ok(Self {
            id,
            lifecycle: AdLifecycle::new(id, &config),
            refresh: config.refresh,
            scheduler: RefreshScheduler::new(interval),
            transport,
            location: None,
            in_flight: None,
            actions: ActionStateTracker::new(),
            notifier: DelegateNotifier::new(id),
            registry: ModalRegistry::global(),
            rotation_deferred: false,
        })
    }

    /// Use `registry` instead of the process-wide one
    pub fn with_modal_registry(mut self, registry: Arc<ModalRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Source for auto-detected location targeting
    pub fn with_location_source(mut self, source: Arc<dyn LocationSource>) -> Self {
        self.location = Some(source);
        self
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn set_delegate(&mut self, delegate: AdDelegate) {
        self.notifier.set_delegate(Some(delegate));
    }

    /// Stop delivering events
    pub fn clear_delegate(&mut self) {
        self.notifier.set_delegate(None);
    }

    pub fn request(&self) -> &TargetingProfile {
        self.lifecycle.targeting()
    }

    /// Targeting for subsequent requests
    pub fn request_mut(&mut self) -> &mut TargetingProfile {
        self.lifecycle.targeting_mut()
    }

    pub fn set_ssl(&mut self, ssl: bool) {
        self.lifecycle.set_ssl(ssl);
    }

    /// Change the refresh interval, in seconds
    ///
    /// An already armed tick keeps its deadline; the new interval applies
    /// from the next re-arm. Zero or invalid values disable refresh, and a
    /// later non-zero value resumes it one interval from now.
    pub fn set_ad_change_interval(&mut self, secs: f64) {
        let interval = interval_from_secs(secs);
        self.refresh.interval_secs = interval.as_secs_f64();
        self.scheduler.set_interval(interval);
        debug!("Banner {}: refresh interval set to {:?}", self.id, interval);
    }

    pub fn ad_change_interval(&self) -> std::time::Duration {
        self.scheduler.interval()
    }

    /// Begin loading and auto-refreshing
    ///
    /// A no-op while a request is already in flight.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: a request was issued, or one was already running
    /// - `Err(Error::Config)`: no ad unit id for the current orientation;
    ///   nothing was issued and the timer stays disarmed
    pub fn start_loading(&mut self) -> Result<()> {
        if self.lifecycle.is_loading() {
            debug!("Banner {}: start_loading while loading, ignored", self.id);
            return Ok(());
        }

        if let Err(e) = self.issue_load() {
            warn!("Banner {}: cannot start loading: {}", self.id, e);
            self.scheduler.stop();
            return Err(e);
        }

        if self.refresh.enabled {
            self.scheduler.start(self.scheduler.interval());
        }

        info!("Banner {}: loading started", self.id);
        Ok(())
    }

    /// Cancel the in-flight request and the refresh timer. Idempotent.
    ///
    /// After this returns no load or failure event is delivered for the
    /// cancelled request.
    pub fn stop_loading(&mut self) {
        self.scheduler.stop();
        self.in_flight = None;
        if self.lifecycle.cancel() {
            info!("Banner {}: loading stopped, pending request dropped", self.id);
        }
    }

    /// Drive the banner until one request completes or one tick fires
    ///
    /// Pending forever when the banner is stopped and idle.
    pub async fn pump(&mut self) {
        let step = tokio::select! {
            biased;
            (ticket, result) = wait_in_flight(&mut self.in_flight) => Step::Completed(ticket, result),
            _ = self.scheduler.tick() => Step::Tick,
        };

        match step {
            Step::Completed(ticket, result) => self.handle_completion(ticket, result),
            Step::Tick => self.handle_tick(),
        }
    }

    /// Update the orientation, swapping ad units if needed
    pub fn set_orientation(&mut self, orientation: Orientation) {
        if orientation == self.lifecycle.orientation() {
            return;
        }
        self.lifecycle.set_orientation(orientation);

        if !self.lifecycle.rotation_requires_reload() {
            return;
        }

        if self.actions.is_in_progress() {
            debug!("Banner {}: rotation reload deferred until action ends", self.id);
            self.rotation_deferred = true;
            return;
        }

        self.reload_for_rotation();
    }

    pub fn orientation(&self) -> Orientation {
        self.lifecycle.orientation()
    }

    /// Start a user action on the displayed creative
    ///
    /// Refused, with `ActionUnableToBegin`, unless an ad is loaded and no
    /// other action is running.
    pub fn begin_action(&mut self, will_leave_application: bool) -> bool {
        if self.lifecycle.state() != LoadState::Loaded {
            debug!("Banner {}: action refused, no ad loaded", self.id);
            self.notifier.action_unable_to_begin();
            return false;
        }

        if !self.actions.begin(will_leave_application) {
            debug!("Banner {}: action refused, another is in progress", self.id);
            self.notifier.action_unable_to_begin();
            return false;
        }

        let kind = ActionKind::from_will_leave(will_leave_application);
        self.registry.register(self.id, kind);
        self.notifier.action_began(will_leave_application);
        true
    }

    /// Finish the running action; ignored if none is running
    pub fn end_action(&mut self) {
        if !self.actions.end() {
            return;
        }
        self.registry.unregister(self.id);
        self.notifier.action_finished();

        if std::mem::take(&mut self.rotation_deferred) && self.lifecycle.rotation_requires_reload()
        {
            self.reload_for_rotation();
        }
    }

    /// Whether the host may rotate right now
    pub fn should_autorotate(&self) -> bool {
        !self.actions.is_modal()
    }

    pub fn is_action_in_progress(&self) -> bool {
        self.actions.is_in_progress()
    }

    pub fn is_loaded(&self) -> bool {
        self.lifecycle.is_loaded()
    }

    pub fn load_state(&self) -> LoadState {
        self.lifecycle.state()
    }

    /// Creative from the last successful load
    pub fn creative(&self) -> Option<&Creative> {
        self.lifecycle.creative()
    }

    /// Request currently in flight
    pub fn pending_request(&self) -> Option<&AdRequestSpec> {
        self.lifecycle.pending_request()
    }

    /// When the next refresh fires, if armed
    pub fn next_refresh_at(&self) -> Option<tokio::time::Instant> {
        self.scheduler.deadline()
    }

    fn issue_load(&mut self) -> Result<()> {
        let location = self.location_reading();
        if let Some(dispatch) = self.lifecycle.begin(location.as_ref())? {
            self.in_flight = Some(InFlight::issue(&self.transport, dispatch));
        }
        Ok(())
    }

    fn reload_for_rotation(&mut self) {
        self.scheduler.reset();
        let location = self.location_reading();
        match self.lifecycle.supersede(location.as_ref()) {
            Ok(dispatch) => {
                info!(
                    "Banner {}: orientation changed, loading {}",
                    self.id,
                    dispatch.request.ad_unit_id()
                );
                self.in_flight = Some(InFlight::issue(&self.transport, dispatch));
            }
            Err(e) => warn!("Banner {}: rotation reload failed: {}", self.id, e),
        }
    }

    fn handle_completion(&mut self, ticket: u64, result: TransportResult) {
        let outcome = self.lifecycle.complete(ticket, classify(result));

        match outcome {
            Some(CycleOutcome::Loaded { ticket }) => {
                info!("Banner {}: ad loaded", self.id);
                self.notifier.cycle_loaded(ticket);
            }
            Some(CycleOutcome::Failed { ticket, error }) => {
                warn!("Banner {}: ad request failed: {} ({})", self.id, error, error.code());
                self.notifier.cycle_failed(ticket, &error);
            }
            None => return,
        }

        self.scheduler.reset();
    }

    fn handle_tick(&mut self) {
        if self.lifecycle.is_loading() {
            debug!("Banner {}: refresh tick while loading, skipped", self.id);
            return;
        }

        debug!("Banner {}: refresh tick", self.id);
        if let Err(e) = self.issue_load() {
            warn!("Banner {}: refresh failed, stopping: {}", self.id, e);
            self.scheduler.stop();
        }
    }

    fn location_reading(&self) -> Option<crate::traits::LocationReading> {
        detect_location(
            self.location.as_ref(),
            self.lifecycle.targeting().autodetect_location,
        )
    }
}

impl Drop for BannerController {
    fn drop(&mut self) {
        if self.actions.is_in_progress() {
            self.registry.unregister(self.id);
        }
        debug!("Banner {} dropped", self.id);
    }
}

impl std::fmt::Debug for BannerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BannerController")
            .field("id", &self.id)
            .field("state", &self.lifecycle.state())
            .field("orientation", &self.lifecycle.orientation())
            .field("in_flight", &self.in_flight)
            .field("action", &self.actions.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::traits::AdResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    const BODY: &str = r#"{"ads":{"count":1,"ad":[{"adunitid":1,"type":"html","html":"<p/>"}]}}"#;

    struct Fixed(Mutex<Vec<String>>);

    #[async_trait]
    impl AdTransport for Fixed {
        async fn fetch(&self, request: &AdRequestSpec) -> TransportResult {
            self.0.lock().unwrap().push(request.ad_unit_id().to_string());
            Ok(AdResponse::ok(BODY))
        }

        fn transport_name(&self) -> &'static str {
            "fixed"
        }
    }

    struct Down;

    #[async_trait]
    impl AdTransport for Down {
        async fn fetch(&self, _request: &AdRequestSpec) -> TransportResult {
            Err(TransportError::Unreachable("connection refused".into()))
        }

        fn transport_name(&self) -> &'static str {
            "down"
        }
    }

    fn banner(transport: Arc<dyn AdTransport>) -> BannerController {
        let config = AdConfig::with_ad_units("ads.example.com", "A1", "A2");
        BannerController::new(config, transport)
            .unwrap()
            .with_modal_registry(ModalRegistry::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_then_refresh() {
        let transport = Arc::new(Fixed(Mutex::new(Vec::new())));
        let mut banner = banner(transport.clone());

        banner.start_loading().unwrap();
        banner.pump().await;
        assert!(banner.is_loaded());

        let armed = banner.next_refresh_at().unwrap();
        assert_eq!(armed - tokio::time::Instant::now(), Duration::from_secs(30));

        // Tick issues the next request, completion follows
        banner.pump().await;
        assert_eq!(banner.load_state(), LoadState::Loading);
        banner.pump().await;
        assert!(banner.is_loaded());

        assert_eq!(*transport.0.lock().unwrap(), vec!["A1", "A1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_refreshing() {
        let mut banner = banner(Arc::new(Down));

        banner.start_loading().unwrap();
        banner.pump().await;

        assert_eq!(banner.load_state(), LoadState::Failed);
        assert!(banner.next_refresh_at().is_some());
    }

    #[tokio::test]
    async fn test_empty_ids_fail_start() {
        let config = AdConfig::with_ad_units("ads.example.com", "", "");
        let mut banner = BannerController::new(config, Arc::new(Down)).unwrap();

        assert!(banner.start_loading().unwrap_err().is_config());
        assert_eq!(banner.load_state(), LoadState::Idle);
        assert!(banner.next_refresh_at().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_requires_loaded_ad() {
        let mut banner = banner(Arc::new(Fixed(Mutex::new(Vec::new()))));
        assert!(!banner.begin_action(false));

        banner.start_loading().unwrap();
        banner.pump().await;

        assert!(banner.begin_action(false));
        assert!(!banner.should_autorotate());
        assert!(!banner.begin_action(true));

        banner.end_action();
        assert!(banner.should_autorotate());
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_application_allows_rotation() {
        let mut banner = banner(Arc::new(Fixed(Mutex::new(Vec::new()))));
        banner.start_loading().unwrap();
        banner.pump().await;

        assert!(banner.begin_action(true));
        assert!(banner.should_autorotate());
        assert!(banner.is_action_in_progress());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AdConfig::with_ad_units("", "A1", "");
        assert!(BannerController::new(config, Arc::new(Down)).is_err());
    }
}
