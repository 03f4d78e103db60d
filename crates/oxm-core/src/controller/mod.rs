//! Ad controllers
//!
//! A controller owns everything needed to run ads for one placement:
//!
//! ```text
//!                ┌──────────────────────┐
//!   host calls ─▶│   Banner / Inter-    │── AdEvent ──▶ AdDelegate
//!                │   stitialController  │
//!                └──────────────────────┘
//!                  │        │        │
//!       ┌──────────┘        │        └───────────┐
//!       ▼                   ▼                    ▼
//! ┌─────────────┐   ┌───────────────┐   ┌────────────────┐
//! │ AdLifecycle │   │ AdTransport   │   │ RefreshSched.  │
//! │ (state)     │   │ (in flight)   │   │ (banner only)  │
//! └─────────────┘   └───────────────┘   └────────────────┘
//! ```
//!
//! ## Driving a controller
//!
//! Controllers never spawn. The in-flight request and the refresh timer are
//! plain fields that only make progress inside `pump().await`, which the
//! host calls from its own loop. Every state transition and every delegate
//! callback therefore happens on the host's task, and `stop_loading()` can
//! cancel synchronously by dropping the request future.

pub mod banner;
pub mod interstitial;
pub mod lifecycle;

pub use banner::BannerController;
pub use interstitial::{InterstitialController, Presentation};
pub use lifecycle::{AdLifecycle, CycleOutcome, Dispatch, LoadState};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::traits::{AdTransport, LocationReading, LocationSource, TransportResult};

type FetchFuture = Pin<Box<dyn Future<Output = TransportResult> + Send>>;

/// A request handed to the transport, tagged with its lifecycle ticket
pub(crate) struct InFlight {
    ticket: u64,
    future: FetchFuture,
}

impl InFlight {
    /// Build the fetch future; nothing runs until it is polled
    pub(crate) fn issue(transport: &Arc<dyn AdTransport>, dispatch: Dispatch) -> Self {
        let transport = Arc::clone(transport);
        let Dispatch { ticket, request } = dispatch;
        debug!(
            "Issuing request {} via {}",
            ticket,
            transport.transport_name()
        );

        Self {
            ticket,
            future: Box::pin(async move { transport.fetch(&request).await }),
        }
    }
}

impl std::fmt::Debug for InFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight").field("ticket", &self.ticket).finish()
    }
}

/// Wait for the request in `slot` and clear it
///
/// Pending forever when the slot is empty. Cancel-safe: if this future is
/// dropped the request stays in the slot and is resumed by the next call.
pub(crate) async fn wait_in_flight(slot: &mut Option<InFlight>) -> (u64, TransportResult) {
    let Some(in_flight) = slot.as_mut() else {
        return std::future::pending().await;
    };

    let result = (&mut in_flight.future).await;
    let ticket = in_flight.ticket;
    *slot = None;
    (ticket, result)
}

/// Read the location source if the profile allows it
pub(crate) fn detect_location(
    source: Option<&Arc<dyn LocationSource>>,
    autodetect: bool,
) -> Option<LocationReading> {
    if !autodetect {
        return None;
    }
    source.and_then(|s| s.last_known())
}
