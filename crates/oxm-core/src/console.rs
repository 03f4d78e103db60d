//! In-app debug console
//!
//! An append-only, timestamped log a host can show on screen while
//! integrating the SDK. Disabled until [`DebugConsole::enable`] is called.
//!
//! Core log lines reach the console through [`ConsoleLayer`], installed
//! next to the host's usual formatter:
//!
//! ```rust,ignore
//! use tracing_subscriber::prelude::*;
//!
//! let console = DebugConsole::shared();
//! console.enable();
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(ConsoleLayer::new(console.clone()))
//!     .init();
//! ```

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

type Observer = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct ConsoleState {
    enabled: bool,
    lines: Vec<String>,
    observer: Option<Observer>,
}

/// Timestamped message log with a single observer
#[derive(Default)]
pub struct DebugConsole {
    state: Mutex<ConsoleState>,
}

impl DebugConsole {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Process-wide console, created on first use
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<DebugConsole>> = OnceLock::new();
        SHARED.get_or_init(DebugConsole::new).clone()
    }

    pub fn enable(&self) {
        self.lock().enabled = true;
    }

    /// Stop recording; the existing log is kept
    pub fn disable(&self) {
        self.lock().enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn clear(&self) {
        self.lock().lines.clear();
    }

    /// Entire log, one message per line
    pub fn full_log(&self) -> String {
        self.lock().lines.join("\n")
    }

    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive each new message, already timestamped
    ///
    /// Replaces any previous observer. Called outside the console lock, so
    /// the observer may read the console.
    pub fn set_observer(&self, observer: impl Fn(&str) + Send + Sync + 'static) {
        self.lock().observer = Some(Arc::new(observer));
    }

    pub fn clear_observer(&self) {
        self.lock().observer = None;
    }

    /// Record `message` if enabled
    pub fn append(&self, message: &str) {
        let (line, observer) = {
            let mut state = self.lock();
            if !state.enabled {
                return;
            }
            let line = format!("{} {}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"), message);
            state.lines.push(line.clone());
            (line, state.observer.clone())
        };

        if let Some(observer) = observer {
            observer(&line);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DebugConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("DebugConsole")
            .field("enabled", &state.enabled)
            .field("lines", &state.lines.len())
            .field("observer", &state.observer.is_some())
            .finish()
    }
}

/// `tracing` layer that mirrors events into a [`DebugConsole`]
#[derive(Debug, Clone)]
pub struct ConsoleLayer {
    console: Arc<DebugConsole>,
}

impl ConsoleLayer {
    pub fn new(console: Arc<DebugConsole>) -> Self {
        Self { console }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !self.console.is_enabled() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        self.console.append(&format!(
            "{} {}: {}",
            meta.level(),
            meta.target(),
            visitor.finish()
        ));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
