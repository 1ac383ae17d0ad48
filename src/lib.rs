//! # clickloop
//!
//! Record mouse clicks, then replay them in a loop with per-click drift.
//!
//! ## Features
//!
//! - Capture primary clicks from any observed input source, skipping
//!   exclusion zones (typically the controlling window's own buttons)
//! - Repeated clicks at the same pixel coalesce into a double click
//! - Looped replay with per-record delay, per-cycle offset and a global step time
//! - Scroll actions alongside clicks
//! - Single-key hotkeys (`d`, `y`, `c`, `q`, `Q`)
//! - JSON macro files
//!
//! ## Quick Start
//!
//! ```no_run
//! use clickloop::{ChannelSource, Controller, DryRunInjector, InputEvent, Button};
//! use std::sync::Arc;
//!
//! let (pointer, pointer_feed) = ChannelSource::new();
//! let (keyboard, _keyboard_feed) = ChannelSource::new();
//! let controller = Arc::new(Controller::new(
//!     Box::new(pointer),
//!     Box::new(keyboard),
//!     Arc::new(DryRunInjector::new()),
//! ));
//!
//! controller.toggle_recording().unwrap();
//! pointer_feed.send(InputEvent::mouse_pressed(Button::Left, 200, 300));
//! // ... later
//! controller.toggle_recording().unwrap();
//! controller.start_replay().unwrap();
//! ```
//!
//! ## Architecture
//!
//! All shared state lives in one [`SessionState`]. Recording and replaying
//! are two values of a single mode, so they are mutually exclusive by
//! construction. Listeners push events on their own threads; the replay loop
//! runs on a thread of its own and is cancelled cooperatively.

pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod exclusion;
pub mod hotkey;
pub mod injector;
pub mod persist;
pub mod record;
pub mod replay;
pub mod source;
pub mod state;

// Re-exports
pub use capture::{CaptureOutcome, CaptureSession};
pub use config::{Config, load_config};
pub use controller::{Controller, Status};
pub use error::{Error, Result};
pub use event::{Button, EventKind, InputEvent, Key, KeyEvent, PointerEvent};
pub use exclusion::{ExclusionZoneSet, Rect};
pub use hotkey::{HotkeyAction, HotkeyRouter};
pub use injector::{DryRunInjector, InjectedAction, InputInjector};
pub use record::{ClickKind, ClickRecord, ClickSequence, MouseButton, RecordField};
pub use replay::{
    FinishReason, ReplayConfig, ReplayEngine, ReplayEvent, ReplayReport, ReplayStart,
};
pub use source::{ChannelSource, EventHandler, InputFeed, InputSource, ListenFlow};
pub use state::{Mode, SessionState};
