//! Contract Test: Action Lifecycle
//!
//! User actions on a banner follow a strict event sequence and only one may
//! run at a time.
//!
//! Constraints verified:
//! - `ActionWillBegin` → `ActionDidBegin` → `ActionDidFinish` for in-app actions
//! - `ActionDidBegin` is suppressed when leaving the application
//! - A second action is refused with `ActionUnableToBegin`
//! - Modal actions block rotation and show up in the modal registry
//! - A rotation during an action is applied when the action ends

mod common;

use common::*;
use oxm_core::{AdEvent, BannerController, LoadState, ModalRegistry, Orientation};
use std::sync::Arc;

async fn loaded_banner(
    registry: Arc<ModalRegistry>,
) -> (BannerController, EventLog, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new();
    let (delegate, log) = recording_delegate();
    let mut banner = BannerController::new(test_config("A1", "A2"), transport.clone())
        .unwrap()
        .with_modal_registry(registry);
    banner.set_delegate(delegate);

    banner.start_loading().unwrap();
    banner.pump().await;
    assert!(banner.is_loaded());
    log.clear();

    (banner, log, transport)
}

#[tokio::test(start_paused = true)]
async fn in_app_action_sequence() {
    let registry = ModalRegistry::new();
    let (mut banner, log, _) = loaded_banner(registry.clone()).await;

    assert!(banner.begin_action(false));
    assert!(banner.is_action_in_progress());
    assert!(!banner.should_autorotate());
    assert!(registry.is_modal_ad_presented());

    banner.end_action();
    assert!(!banner.is_action_in_progress());
    assert!(banner.should_autorotate());
    assert!(!registry.is_modal_ad_presented());

    assert_eq!(
        log.events(),
        vec![
            AdEvent::ActionWillBegin {
                will_leave_application: false
            },
            AdEvent::ActionDidBegin,
            AdEvent::ActionDidFinish,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn leave_application_suppresses_did_begin() {
    let registry = ModalRegistry::new();
    let (mut banner, log, _) = loaded_banner(registry.clone()).await;

    assert!(banner.begin_action(true));
    assert!(banner.should_autorotate());
    assert!(!registry.is_modal_ad_presented());
    banner.end_action();

    assert_eq!(
        log.events(),
        vec![
            AdEvent::ActionWillBegin {
                will_leave_application: true
            },
            AdEvent::ActionDidFinish,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn second_action_is_refused() {
    let (mut banner, log, _) = loaded_banner(ModalRegistry::new()).await;

    assert!(banner.begin_action(false));
    assert!(!banner.begin_action(false));
    assert!(!banner.begin_action(true));

    assert_eq!(log.count(&AdEvent::ActionUnableToBegin), 2);
    assert_eq!(log.count(&AdEvent::ActionDidBegin), 1);
}

#[tokio::test(start_paused = true)]
async fn action_needs_loaded_ad() {
    let transport = ScriptedTransport::new();
    let (delegate, log) = recording_delegate();
    let mut banner = BannerController::new(test_config("A1", ""), transport)
        .unwrap()
        .with_modal_registry(ModalRegistry::new());
    banner.set_delegate(delegate);

    assert!(!banner.begin_action(false));
    assert_eq!(log.events(), vec![AdEvent::ActionUnableToBegin]);
}

#[tokio::test(start_paused = true)]
async fn end_without_action_is_ignored() {
    let (mut banner, log, _) = loaded_banner(ModalRegistry::new()).await;
    banner.end_action();
    assert!(log.is_empty());
}

#[tokio::test(start_paused = true)]
async fn rotation_deferred_until_action_ends() {
    let (mut banner, log, transport) = loaded_banner(ModalRegistry::new()).await;

    assert!(banner.begin_action(false));
    banner.set_orientation(Orientation::LandscapeLeft);

    // Still showing A1, nothing requested
    assert_eq!(banner.load_state(), LoadState::Loaded);
    assert!(banner.pending_request().is_none());

    banner.end_action();
    assert_eq!(banner.pending_request().unwrap().ad_unit_id(), "A2");

    banner.pump().await;
    assert!(banner.is_loaded());
    assert_eq!(transport.requested(), vec!["A1", "A2"]);
    assert_eq!(log.count(&AdEvent::DidLoad), 1);
}
