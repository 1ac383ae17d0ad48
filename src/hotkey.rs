//! Single-key hotkeys, active while the keyboard listener runs.
//!
//! | Key | Action |
//! |-----|--------|
//! | `d` | toggle recording |
//! | `y` | toggle replay |
//! | `c` | clear recorded clicks |
//! | `q` | stop recording (if on) |
//! | `Q` | stop everything and end the keyboard listener |
//!
//! Keys without a printable character are ignored.

use crate::controller::Controller;
use crate::event::{InputEvent, Key};
use crate::source::{EventHandler, ListenFlow};
use std::sync::{Arc, Weak};

/// A control action bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    /// `q`: stop recording if it is on.
    StopRecording,
    /// `Q`: stop everything and end the keyboard listener.
    Exit,
    /// `d`
    ToggleRecording,
    /// `y`
    ToggleReplay,
    /// `c`: drop every recorded click.
    Clear,
}

impl HotkeyAction {
    /// The action bound to `key`, if any.
    pub fn for_key(key: &Key) -> Option<Self> {
        match key.char()? {
            'q' => Some(HotkeyAction::StopRecording),
            'Q' => Some(HotkeyAction::Exit),
            'd' => Some(HotkeyAction::ToggleRecording),
            'y' => Some(HotkeyAction::ToggleReplay),
            'c' => Some(HotkeyAction::Clear),
            _ => None,
        }
    }
}

/// Routes key presses to a [`Controller`].
///
/// Holds the controller weakly: the controller owns the keyboard listener
/// that owns this router.
pub struct HotkeyRouter {
    controller: Weak<Controller>,
}

impl HotkeyRouter {
    /// Create a router for `controller`.
    pub fn new(controller: &Arc<Controller>) -> Self {
        Self {
            controller: Arc::downgrade(controller),
        }
    }

    /// Perform whatever `key` is bound to.
    pub fn handle_key(&self, key: &Key) -> ListenFlow {
        let Some(action) = HotkeyAction::for_key(key) else {
            return ListenFlow::Continue;
        };
        let Some(controller) = self.controller.upgrade() else {
            return ListenFlow::Stop;
        };
        log::debug!("Hotkey {key:?} -> {action:?}");

        let result = match action {
            HotkeyAction::StopRecording => controller.stop_recording().map(|_| ()),
            HotkeyAction::Exit => {
                log::info!("Exiting listeners.");
                if let Err(e) = controller.stop_capture_and_replay() {
                    log::warn!("Error stopping listeners: {e}");
                }
                return ListenFlow::Stop;
            }
            HotkeyAction::ToggleRecording => controller.toggle_recording().map(|_| ()),
            HotkeyAction::ToggleReplay => controller.toggle_replay().map(|_| ()),
            HotkeyAction::Clear => {
                controller.clear();
                Ok(())
            }
        };

        if let Err(e) = result {
            log::warn!("Hotkey {action:?} failed: {e}");
        }
        ListenFlow::Continue
    }
}

impl EventHandler for HotkeyRouter {
    fn handle_event(&self, event: &InputEvent) -> ListenFlow {
        match event.key() {
            Some(key_event) => self.handle_key(&key_event.key),
            None => ListenFlow::Continue,
        }
    }
}
