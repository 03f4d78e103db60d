//! Load state machine shared by banners and interstitials
//!
//! [`AdLifecycle`] is synchronous and performs no I/O. It decides whether a
//! request may be issued, hands out request tickets, and accepts or rejects
//! completions. The async controllers wrap it with a transport, a timer and
//! a notifier.
//!
//! ```text
//!            start / tick                 creative
//!   Idle ───────────────────▶ Loading ───────────────▶ Loaded
//!    ▲                         │  ▲ ╲                    │
//!    │        stop (any state) │  │  ╲ error / no ads    │ start / tick
//!    └─────────────────────────┘  │   ▼                  │
//!                                 └─ Failed ◀────────────┘
//! ```
//!
//! Tickets make cancellation logical: a completion is accepted only if its
//! ticket matches the pending request, so anything finishing after
//! `cancel()` or a superseding request is inert.

use tracing::debug;

use crate::config::AdConfig;
use crate::error::{AdError, Result};
use crate::orientation::{AdUnitPair, Orientation};
use crate::registry::ControllerId;
use crate::request::{AdRequestSpec, RequestBuilder, Scheme};
use crate::response::Creative;
use crate::targeting::TargetingProfile;
use crate::traits::LocationReading;

/// Load state of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// A request the controller must hand to its transport
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub ticket: u64,
    pub request: AdRequestSpec,
}

/// Accepted completion of a request cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Loaded { ticket: u64 },
    Failed { ticket: u64, error: AdError },
}

#[derive(Debug)]
struct PendingLoad {
    ticket: u64,
    request: AdRequestSpec,
}

#[derive(Debug)]
struct LoadedCreative {
    ad_unit_id: String,
    creative: Creative,
}

/// Synchronous core of every controller
#[derive(Debug)]
pub struct AdLifecycle {
    id: ControllerId,
    domain: String,
    pair: AdUnitPair,
    ssl: bool,
    targeting: TargetingProfile,
    orientation: Orientation,
    state: LoadState,
    last_ticket: u64,
    pending: Option<PendingLoad>,
    loaded: Option<LoadedCreative>,
}

impl AdLifecycle {
    pub fn new(id: ControllerId, config: &AdConfig) -> Self {
        Self {
            id,
            domain: config.domain.clone(),
            pair: config.ad_units.to_pair(),
            ssl: config.ssl,
            targeting: TargetingProfile::default(),
            orientation: Orientation::default(),
            state: LoadState::Idle,
            last_ticket: 0,
            pending: None,
            loaded: None,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn pair(&self) -> &AdUnitPair {
        &self.pair
    }

    pub fn targeting(&self) -> &TargetingProfile {
        &self.targeting
    }

    pub fn targeting_mut(&mut self) -> &mut TargetingProfile {
        &mut self.targeting
    }

    /// Applies to requests built after the call
    pub fn set_ssl(&mut self, ssl: bool) {
        self.ssl = ssl;
    }

    pub fn ssl(&self) -> bool {
        self.ssl
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Request currently awaiting completion
    pub fn pending_request(&self) -> Option<&AdRequestSpec> {
        self.pending.as_ref().map(|p| &p.request)
    }

    /// Most recently loaded creative, until consumed
    pub fn creative(&self) -> Option<&Creative> {
        self.loaded.as_ref().map(|l| &l.creative)
    }

    /// Start a cycle unless one is already running
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Dispatch))`: state is now `Loading`; issue the request
    /// - `Ok(None)`: already `Loading`, nothing to do
    /// - `Err(Error::Config)`: no usable id or domain; state unchanged
    pub fn begin(&mut self, location: Option<&LocationReading>) -> Result<Option<Dispatch>> {
        if self.is_loading() {
            debug!("Controller {}: already loading, request not issued", self.id);
            return Ok(None);
        }
        self.dispatch(location).map(Some)
    }

    /// Replace any pending request with a fresh one
    ///
    /// Used when the resolved id changes under a running cycle. The old
    /// ticket is invalidated, so its completion will be ignored.
    pub fn supersede(&mut self, location: Option<&LocationReading>) -> Result<Dispatch> {
        if let Some(old) = &self.pending {
            debug!(
                "Controller {}: superseding request {} for {}",
                self.id,
                old.ticket,
                old.request.ad_unit_id()
            );
        }
        self.dispatch(location)
    }

    fn dispatch(&mut self, location: Option<&LocationReading>) -> Result<Dispatch> {
        let ad_unit_id = self.pair.resolve(self.orientation)?;
        let builder = RequestBuilder::new(
            self.domain.clone(),
            Scheme::for_ssl(self.ssl),
            self.pair.mode(),
        );
        let request = builder.build(ad_unit_id, &self.targeting, location)?;

        self.last_ticket += 1;
        let ticket = self.last_ticket;
        self.pending = Some(PendingLoad {
            ticket,
            request: request.clone(),
        });
        self.state = LoadState::Loading;

        debug!(
            "Controller {}: request {} for {} -> {}",
            self.id,
            ticket,
            request.ad_unit_id(),
            request.url()
        );

        Ok(Dispatch { ticket, request })
    }

    /// Accept the completion of request `ticket`
    ///
    /// Returns `None` for stale tickets; the caller must not notify.
    pub fn complete(
        &mut self,
        ticket: u64,
        result: std::result::Result<Creative, AdError>,
    ) -> Option<CycleOutcome> {
        let pending = match self.pending.take() {
            Some(pending) if pending.ticket == ticket => pending,
            other => {
                self.pending = other;
                debug!("Controller {}: ignoring stale completion {}", self.id, ticket);
                return None;
            }
        };

        match result {
            Ok(creative) => {
                self.state = LoadState::Loaded;
                self.loaded = Some(LoadedCreative {
                    ad_unit_id: pending.request.ad_unit_id().to_string(),
                    creative,
                });
                Some(CycleOutcome::Loaded { ticket })
            }
            Err(error) => {
                self.state = LoadState::Failed;
                Some(CycleOutcome::Failed { ticket, error })
            }
        }
    }

    /// Drop the pending request and go `Idle`. Idempotent.
    ///
    /// Returns whether a request was pending.
    pub fn cancel(&mut self) -> bool {
        self.state = LoadState::Idle;
        self.pending.take().is_some()
    }

    /// Take the loaded creative for presentation
    ///
    /// Only succeeds while `Loaded`; afterwards the controller is `Idle` and
    /// needs another successful load before anything can be presented.
    pub fn consume(&mut self) -> Option<Creative> {
        if !self.is_loaded() {
            return None;
        }
        self.state = LoadState::Idle;
        self.loaded.take().map(|l| l.creative)
    }

    /// Whether the id for the current orientation differs from the one
    /// being loaded or shown
    pub fn rotation_requires_reload(&self) -> bool {
        let Ok(resolved) = self.pair.resolve(self.orientation) else {
            return false;
        };

        let active = match self.state {
            LoadState::Loading => self.pending.as_ref().map(|p| p.request.ad_unit_id()),
            LoadState::Loaded => self.loaded.as_ref().map(|l| l.ad_unit_id.as_str()),
            LoadState::Idle | LoadState::Failed => None,
        };

        active.is_some_and(|id| id != resolved)
    }
}
