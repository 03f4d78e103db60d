//! Full-screen interstitial controller
//!
//! One request per `load_ad()`, no auto-refresh. A loaded creative is
//! shown with `present_loaded_ad()`, which consumes it: presenting again
//! requires another successful load.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::lifecycle::{AdLifecycle, CycleOutcome, LoadState};
use super::{InFlight, detect_location, wait_in_flight};
use crate::action::{ActionKind, ActionStateTracker};
use crate::config::{AdConfig, PresentationOptions};
use crate::error::Result;
use crate::notifier::{AdDelegate, DelegateNotifier};
use crate::orientation::Orientation;
use crate::registry::{ControllerId, ModalRegistry};
use crate::request::AdRequestSpec;
use crate::response::{Creative, classify};
use crate::targeting::TargetingProfile;
use crate::traits::{AdTransport, LocationSource};

/// A creative handed to the host for display
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub creative: Creative,
    pub options: PresentationOptions,
}

/// Interstitial ad controller
pub struct InterstitialController {
    id: ControllerId,
    lifecycle: AdLifecycle,
    presentation: PresentationOptions,
    transport: Arc<dyn AdTransport>,
    location: Option<Arc<dyn LocationSource>>,
    in_flight: Option<InFlight>,
    actions: ActionStateTracker,
    notifier: DelegateNotifier,
    registry: Arc<ModalRegistry>,
}

impl InterstitialController {
    pub fn new(config: AdConfig, transport: Arc<dyn AdTransport>) -> Result<Self> {
        config.validate()?;

        let id = ControllerId::next();
        info!(
            "Interstitial {} created for {} (transport: {})",
            id,
            config.domain,
            transport.transport_name()
        );

        Ok(Self {
            id,
            lifecycle: AdLifecycle::new(id, &config),
            presentation: config.presentation,
            transport,
            location: None,
            in_flight: None,
            actions: ActionStateTracker::new(),
            notifier: DelegateNotifier::new(id),
            registry: ModalRegistry::global(),
        })
    }

    /// Use `registry` instead of the process-wide one
    pub fn with_modal_registry(mut self, registry: Arc<ModalRegistry>) -> Self {
        self.registry = registry;
        self
    }

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

    pub fn clear_delegate(&mut self) {
        self.notifier.set_delegate(None);
    }

    pub fn request(&self) -> &TargetingProfile {
        self.lifecycle.targeting()
    }

    pub fn request_mut(&mut self) -> &mut TargetingProfile {
        self.lifecycle.targeting_mut()
    }

    pub fn set_ssl(&mut self, ssl: bool) {
        self.lifecycle.set_ssl(ssl);
    }

    /// Orientation used to pick the ad unit for the next load
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.lifecycle.set_orientation(orientation);
    }

    pub fn orientation(&self) -> Orientation {
        self.lifecycle.orientation()
    }

    pub fn presentation_options(&self) -> PresentationOptions {
        self.presentation
    }

    /// Takes effect on the next presentation
    pub fn set_presentation_options(&mut self, options: PresentationOptions) -> Result<()> {
        options.validate()?;
        self.presentation = options;
        Ok(())
    }

    /// Request one interstitial
    ///
    /// A no-op while a request is in flight. Loading while a previous ad is
    /// still on screen is allowed.
    pub fn load_ad(&mut self) -> Result<()> {
        let location = detect_location(
            self.location.as_ref(),
            self.lifecycle.targeting().autodetect_location,
        );

        match self.lifecycle.begin(location.as_ref()) {
            Ok(Some(dispatch)) => {
                info!("Interstitial {}: loading {}", self.id, dispatch.request.ad_unit_id());
                self.in_flight = Some(InFlight::issue(&self.transport, dispatch));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!("Interstitial {}: cannot load: {}", self.id, e);
                Err(e)
            }
        }
    }

    /// Abandon the in-flight request, if any; no event is delivered for it
    pub fn cancel_load(&mut self) {
        self.in_flight = None;
        if self.lifecycle.is_loading() && self.lifecycle.cancel() {
            info!("Interstitial {}: load cancelled", self.id);
        }
    }

    /// Drive the in-flight request to completion
    ///
    /// Pending forever when nothing is in flight.
    pub async fn pump(&mut self) {
        let (ticket, result) = wait_in_flight(&mut self.in_flight).await;

        match self.lifecycle.complete(ticket, classify(result)) {
            Some(CycleOutcome::Loaded { ticket }) => {
                info!("Interstitial {}: ad loaded", self.id);
                self.notifier.cycle_loaded(ticket);
            }
            Some(CycleOutcome::Failed { ticket, error }) => {
                warn!("Interstitial {}: ad request failed: {} ({})", self.id, error, error.code());
                self.notifier.cycle_failed(ticket, &error);
            }
            None => {}
        }
    }

    /// Show the loaded ad
    ///
    /// Returns `None`, and changes nothing, unless an ad is loaded. If a
    /// presentation is already on screen the call is refused with
    /// `ActionUnableToBegin`.
    pub fn present_loaded_ad(&mut self) -> Option<Presentation> {
        if !self.lifecycle.is_loaded() {
            debug!("Interstitial {}: nothing loaded to present", self.id);
            return None;
        }

        if self.actions.is_in_progress() {
            debug!("Interstitial {}: already presenting", self.id);
            self.notifier.action_unable_to_begin();
            return None;
        }

        let creative = self.lifecycle.consume()?;
        self.actions.begin(false);
        self.registry.register(self.id, ActionKind::Modal);
        self.notifier.action_began(false);

        info!("Interstitial {}: presented", self.id);
        Some(Presentation {
            creative,
            options: self.presentation,
        })
    }

    /// The user tapped through to another application
    pub fn notify_will_leave_application(&mut self) {
        if !self.actions.is_in_progress() {
            debug!("Interstitial {}: leave-application without presentation", self.id);
            return;
        }
        self.notifier.will_leave_application();
    }

    /// The presentation was dismissed; ignored if nothing is presented
    pub fn finish_presentation(&mut self) {
        if !self.actions.end() {
            return;
        }
        self.registry.unregister(self.id);
        self.notifier.action_finished();
        info!("Interstitial {}: dismissed", self.id);
    }

    /// Whether the host may rotate right now
    ///
    /// Overlay presentations with the close widget pinned to the creative
    /// cannot follow a rotation.
    pub fn should_autorotate(&self) -> bool {
        if !self.actions.is_in_progress() || !self.presentation.use_overlay {
            return true;
        }
        !self.presentation.close_position.is_ad_anchored()
    }

    /// Whether any controller on the process-wide registry shows a modal ad
    pub fn is_modal_ad_presented() -> bool {
        ModalRegistry::global().is_modal_ad_presented()
    }

    pub fn is_presenting(&self) -> bool {
        self.actions.is_in_progress()
    }

    pub fn is_loaded(&self) -> bool {
        self.lifecycle.is_loaded()
    }

    pub fn load_state(&self) -> LoadState {
        self.lifecycle.state()
    }

    pub fn pending_request(&self) -> Option<&AdRequestSpec> {
        self.lifecycle.pending_request()
    }
}

impl Drop for InterstitialController {
    fn drop(&mut self) {
        if self.actions.is_in_progress() {
            self.registry.unregister(self.id);
        }
        debug!("Interstitial {} dropped", self.id);
    }
}

impl std::fmt::Debug for InterstitialController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterstitialController")
            .field("id", &self.id)
            .field("state", &self.lifecycle.state())
            .field("in_flight", &self.in_flight)
            .field("presenting", &self.actions.is_in_progress())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClosePosition;
    use crate::traits::{AdResponse, TransportResult};
    use async_trait::async_trait;

    struct OneAd;

    #[async_trait]
    impl AdTransport for OneAd {
        async fn fetch(&self, _request: &AdRequestSpec) -> TransportResult {
            Ok(AdResponse::ok(
                r#"{"ads":{"count":1,"ad":[{"type":"html","html":"<p/>"}]}}"#,
            ))
        }

        fn transport_name(&self) -> &'static str {
            "one-ad"
        }
    }

    fn interstitial(presentation: PresentationOptions) -> InterstitialController {
        let config =
            AdConfig::with_ad_units("ads.example.com", "I1", "").presentation(presentation);
        InterstitialController::new(config, Arc::new(OneAd))
            .unwrap()
            .with_modal_registry(ModalRegistry::new())
    }

    #[tokio::test]
    async fn test_present_requires_load() {
        let mut ad = interstitial(PresentationOptions::default());
        assert!(ad.present_loaded_ad().is_none());

        ad.load_ad().unwrap();
        ad.pump().await;
        assert!(ad.is_loaded());

        let shown = ad.present_loaded_ad().unwrap();
        assert_eq!(shown.creative.html.as_deref(), Some("<p/>"));
        assert_eq!(ad.load_state(), LoadState::Idle);
        assert!(ad.present_loaded_ad().is_none());

        ad.finish_presentation();
        assert!(!ad.is_presenting());
    }

    #[tokio::test]
    async fn test_overlay_with_anchored_close_blocks_rotation() {
        let options = PresentationOptions {
            close_position: ClosePosition::AdTopLeft,
            use_overlay: true,
            ..PresentationOptions::default()
        };
        let mut ad = interstitial(options);
        assert!(ad.should_autorotate());

        ad.load_ad().unwrap();
        ad.pump().await;
        ad.present_loaded_ad().unwrap();
        assert!(!ad.should_autorotate());

        ad.finish_presentation();
        assert!(ad.should_autorotate());
    }

    #[tokio::test]
    async fn test_modal_presentation_rotates() {
        let mut ad = interstitial(PresentationOptions::default());
        ad.load_ad().unwrap();
        ad.pump().await;
        ad.present_loaded_ad().unwrap();
        assert!(ad.should_autorotate());
    }

    #[test]
    fn test_presentation_options_validated() {
        let mut ad = interstitial(PresentationOptions::default());
        let bad = PresentationOptions {
            background_opacity: -0.1,
            ..PresentationOptions::default()
        };
        assert!(ad.set_presentation_options(bad).is_err());
        assert_eq!(ad.presentation_options().background_opacity, 0.7);
    }
}
