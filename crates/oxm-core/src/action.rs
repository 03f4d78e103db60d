//! User-triggered action tracking
//!
//! An action is anything a creative starts on user interaction: an in-app
//! browser, an expanded MRAID view, a presented interstitial, or a hand-off
//! to another application. Only one may be in progress per controller.

/// Whether an action is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    None,
    InProgress,
}

/// What kind of action is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Full-screen content shown inside the app
    Modal,
    /// Control is handed to another application
    LeaveApplication,
}

impl ActionKind {
    pub fn from_will_leave(will_leave_application: bool) -> Self {
        if will_leave_application {
            ActionKind::LeaveApplication
        } else {
            ActionKind::Modal
        }
    }
}

/// Tracks the single action a controller may have in progress
#[derive(Debug, Default)]
pub struct ActionStateTracker {
    current: Option<ActionKind>,
}

impl ActionStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start an action
    ///
    /// Returns `false` without changing state if one is already in
    /// progress. On `true` the caller owes exactly one [`end`](Self::end).
    pub fn begin(&mut self, will_leave_application: bool) -> bool {
        if self.current.is_some() {
            return false;
        }
        self.current = Some(ActionKind::from_will_leave(will_leave_application));
        true
    }

    /// Finish the current action; `false` if none was running
    pub fn end(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn state(&self) -> ActionState {
        match self.current {
            Some(_) => ActionState::InProgress,
            None => ActionState::None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.current.is_some()
    }

    pub fn kind(&self) -> Option<ActionKind> {
        self.current
    }

    /// Whether a full-screen action is showing inside the app
    pub fn is_modal(&self) -> bool {
        self.current == Some(ActionKind::Modal)
    }
}
