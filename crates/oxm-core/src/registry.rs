//! Registry of modal ad sessions
//!
//! Hosts that present interstitials as overlays must refuse to rotate while
//! any ad is on screen. That question spans every controller, so the answer
//! lives here instead of on a single instance.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use oxm_core::ModalRegistry;
//!
//! // Share one registry between the controllers that should be observed together
//! let registry = ModalRegistry::new();
//! let interstitial = InterstitialController::new(config, transport)?
//!     .with_modal_registry(registry.clone());
//!
//! if registry.is_modal_ad_presented() {
//!     return interstitial.should_autorotate();
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::action::ActionKind;

/// Process-unique controller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(u64);

impl ControllerId {
    /// Allocate the next id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared set of controllers with an action in progress
///
/// ## Thread Safety
///
/// Controllers are single-task, but several of them may live on different
/// tasks and share one registry, so access goes through an RwLock.
#[derive(Debug, Default)]
pub struct ModalRegistry {
    sessions: RwLock<HashMap<ControllerId, ActionKind>>,
}

impl ModalRegistry {
    /// Create a new empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registry shared by controllers that were not given one explicitly
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ModalRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(ModalRegistry::new).clone()
    }

    /// Record that `id` has an action of `kind` in progress
    pub fn register(&self, id: ControllerId, kind: ActionKind) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(id, kind);
        debug!("Controller {} registered {:?} session", id, kind);
    }

    /// Remove `id`; returns whether it was registered
    pub fn unregister(&self, id: ControllerId) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(&id).is_some()
    }

    /// True iff any registered controller shows full-screen content
    pub fn is_modal_ad_presented(&self) -> bool {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.values().any(|kind| *kind == ActionKind::Modal)
    }

    /// Check if a controller has a session
    pub fn has_session(&self, id: ControllerId) -> bool {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.contains_key(&id)
    }

    /// Number of active sessions of any kind
    pub fn len(&self) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration() {
        let registry = ModalRegistry::new();
        let a = ControllerId::next();
        let b = ControllerId::next();

        assert!(!registry.is_modal_ad_presented());

        registry.register(a, ActionKind::LeaveApplication);
        assert!(registry.has_session(a));
        assert!(!registry.is_modal_ad_presented());

        registry.register(b, ActionKind::Modal);
        assert!(registry.is_modal_ad_presented());
        assert_eq!(registry.len(), 2);

        assert!(registry.unregister(b));
        assert!(!registry.unregister(b));
        assert!(!registry.is_modal_ad_presented());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ControllerId::next();
        let b = ControllerId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_global_is_shared() {
        let first = ModalRegistry::global();
        let second = ModalRegistry::global();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
