// # oxm-core
//
// Ad lifecycle core for the OXM ad-serving SDK.
//
// ## Architecture Overview
//
// This library runs the request/refresh/present cycle for banner and
// interstitial placements:
// - **RequestBuilder**: turns targeting into an ad request URL
// - **RefreshScheduler**: banner auto-refresh timer
// - **ActionStateTracker**: one user action at a time per controller
// - **BannerController / InterstitialController**: the lifecycle state
//   machines, driven by the host through `pump().await`
// - **DelegateNotifier**: ordered delivery of `AdEvent`s to the host
// - **ModalRegistry**: cross-controller "is a modal ad on screen" answer
//
// ## Design Principles
//
// 1. **No I/O in the core**: HTTP and location come in through traits
// 2. **Single task**: controllers never spawn; the host drives them
// 3. **Synchronous cancellation**: `stop_loading()` drops the request
//    future, so nothing is delivered for it afterwards
// 4. **Library-First**: the probe binary is a thin wrapper

pub mod action;
pub mod config;
pub mod console;
pub mod controller;
pub mod error;
pub mod notifier;
pub mod orientation;
pub mod registry;
pub mod request;
pub mod response;
pub mod scheduler;
pub mod targeting;
pub mod traits;

// Re-export core types for convenience
pub use action::{ActionKind, ActionState, ActionStateTracker};
pub use config::{AdConfig, AdUnitConfig, ClosePosition, PresentationOptions, RefreshConfig};
pub use console::{ConsoleLayer, DebugConsole};
pub use controller::{BannerController, InterstitialController, LoadState, Presentation};
pub use error::{AdError, Error, Result, TransportError};
pub use notifier::{AdDelegate, AdEvent};
pub use orientation::{AdUnitPair, IdMode, Orientation};
pub use registry::{ControllerId, ModalRegistry};
pub use request::{AdRequestSpec, RequestBuilder, Scheme};
pub use response::Creative;
pub use scheduler::RefreshScheduler;
pub use targeting::{Coordinates, Ethnicity, Gender, MaritalStatus, NetworkType, TargetingProfile};
pub use traits::{AdResponse, AdTransport, LocationReading, LocationSource, NoLocation};
