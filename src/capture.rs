//! Click capture: turns observed pointer presses into recorded clicks.
//!
//! Only primary-button presses are recorded, and only while recording is on.
//! Presses inside an exclusion zone are dropped. A press at exactly the same
//! pixel as the previous single click promotes that click to a double click
//! instead of adding a record, no matter how much time passed in between.

use crate::error::Result;
use crate::event::{Button, InputEvent, PointerEvent};
use crate::exclusion::Rect;
use crate::record::{ClickKind, ClickRecord, MouseButton};
use crate::source::{InputSource, ListenFlow};
use crate::state::SessionState;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What a pointer event did to the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A new single click was appended.
    Recorded,
    /// The previous click became a double click.
    Coalesced,
    /// The press fell inside an exclusion zone.
    Excluded,
    /// Not a primary press, or recording is off.
    Ignored,
}

/// Apply one pointer event to the session.
pub fn record_pointer(state: &SessionState, event: &PointerEvent) -> CaptureOutcome {
    if event.button != Button::Left || !event.pressed || !state.is_recording() {
        return CaptureOutcome::Ignored;
    }

    let (x, y) = (event.x, event.y);
    if state.is_excluded(x, y) {
        log::debug!("Ignored click at ({x}, {y}) inside an exclusion zone");
        return CaptureOutcome::Excluded;
    }

    state.with_clicks(|clicks| {
        if let Some(last) = clicks.last_mut()
            && last.x == x
            && last.y == y
            && last.kind() == ClickKind::Single
        {
            last.set_double_click(true);
            log::info!("Converted click at ({x}, {y}) to double click");
            return CaptureOutcome::Coalesced;
        }

        clicks.push(ClickRecord::click(x, y, MouseButton::Left));
        log::info!("Recorded click at: ({x}, {y})");
        CaptureOutcome::Recorded
    })
}

fn stop_listening(pointer: &mut Box<dyn InputSource>) -> Result<()> {
    if pointer.is_running() {
        pointer.stop()?;
        log::info!("Mouse listener stopped");
    }
    Ok(())
}

/// Owns the pointer listener and the recording toggle.
pub struct CaptureSession {
    state: Arc<SessionState>,
    pointer: Mutex<Box<dyn InputSource>>,
}

impl CaptureSession {
    /// Create a session over `state`, observing clicks through `pointer`.
    pub fn new(state: Arc<SessionState>, pointer: Box<dyn InputSource>) -> Self {
        Self {
            state,
            pointer: Mutex::new(pointer),
        }
    }

    fn pointer(&self) -> MutexGuard<'_, Box<dyn InputSource>> {
        self.pointer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flip recording on or off. Returns the new recording value.
    ///
    /// Turning recording on ends any replay and starts the pointer listener
    /// if it is not already running. Turning it off stops the listener. The
    /// listener lock is held across the mode change, so a concurrent replay
    /// start always sees the listener in the state that matches the mode.
    pub fn toggle_recording(&self) -> Result<bool> {
        let mut pointer = self.pointer();
        let recording = self.state.toggle_recording();
        if recording {
            if let Err(e) = self.start_listening(&mut pointer) {
                self.state.stop_recording();
                return Err(e);
            }
            log::info!("Recording started");
        } else {
            stop_listening(&mut pointer)?;
            log::info!("Recording stopped");
        }
        Ok(recording)
    }

    /// Turn recording off if it is on. Returns whether it was on.
    pub fn stop_recording(&self) -> Result<bool> {
        let mut pointer = self.pointer();
        let was_recording = self.state.stop_recording();
        if was_recording {
            log::info!("Stopped recording...");
        }
        stop_listening(&mut pointer)?;
        Ok(was_recording)
    }

    /// Feed a pointer event directly, bypassing the listener.
    pub fn on_pointer_event(&self, event: &PointerEvent) -> CaptureOutcome {
        record_pointer(&self.state, event)
    }

    /// Drop every recorded click, whether or not recording is on.
    pub fn clear(&self) {
        self.state.clear_clicks();
        log::info!("Click positions cleared.");
    }

    /// Replace all exclusion zones.
    pub fn set_exclusions<I>(&self, zones: I)
    where
        I: IntoIterator,
        I::Item: Into<Rect>,
    {
        let zones: Vec<Rect> = zones.into_iter().map(Into::into).collect();
        log::debug!("Registered {} exclusion zones", zones.len());
        self.state.set_exclusions(zones);
    }

    /// Remove every exclusion zone.
    pub fn clear_exclusions(&self) {
        self.state.clear_exclusions();
    }

    fn start_listening(&self, pointer: &mut Box<dyn InputSource>) -> Result<()> {
        if pointer.is_running() {
            return Ok(());
        }
        let state = self.state.clone();
        pointer.start(Box::new(move |event: &InputEvent| {
            if let Some(pointer) = event.pointer() {
                record_pointer(&state, pointer);
            }
            ListenFlow::Continue
        }))?;
        log::info!("Mouse listener started for recording");
        Ok(())
    }

    /// Stop the pointer listener if it is running.
    pub fn stop_listening(&self) -> Result<()> {
        stop_listening(&mut self.pointer())
    }

    /// Stop the pointer listener unless recording is on.
    ///
    /// Used when a replay starts: if recording won a race against the replay
    /// start, its listener stays up.
    pub fn stop_listening_unless_recording(&self) -> Result<()> {
        let mut pointer = self.pointer();
        if self.state.is_recording() {
            return Ok(());
        }
        stop_listening(&mut pointer)
    }

    /// Whether the pointer listener is running.
    pub fn is_listening(&self) -> bool {
        self.pointer().is_running()
    }
}
