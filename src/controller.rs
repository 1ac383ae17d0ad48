//! The session object a UI (or the hotkey router) drives.
//!
//! [`Controller`] owns the shared state, the pointer and keyboard listeners,
//! the capture session and the replay engine. It is what the presentation
//! layer holds on to: toggles, status, record edits and file operations all
//! go through it.

use crate::capture::CaptureSession;
use crate::config::{Config, step_time_from_secs};
use crate::error::{Error, Result};
use crate::exclusion::Rect;
use crate::hotkey::HotkeyRouter;
use crate::injector::InputInjector;
use crate::persist;
use crate::record::{ClickRecord, ClickSequence, RecordField};
use crate::replay::{ReplayConfig, ReplayEngine, ReplayEvent, ReplayReport, ReplayStart};
use crate::source::InputSource;
use crate::state::SessionState;
use std::fmt;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Snapshot of everything the status line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub recording: bool,
    pub replaying: bool,
    pub clicks: usize,
    pub exclusions: usize,
    pub keyboard_listener: bool,
    pub pointer_listener: bool,
}

fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Recording: {} | Replaying: {} | Clicks recorded: {} | Button exclusions: {} | \
             Keyboard Listener: {} | Mouse Listener: {}",
            on_off(self.recording),
            on_off(self.replaying),
            self.clicks,
            self.exclusions,
            on_off(self.keyboard_listener),
            on_off(self.pointer_listener),
        )
    }
}

/// Owns one recording/replay session.
pub struct Controller {
    state: Arc<SessionState>,
    capture: CaptureSession,
    replay: ReplayEngine,
    keyboard: Mutex<Box<dyn InputSource>>,
    injector: Arc<dyn InputInjector>,
}

impl Controller {
    /// Build a controller with default replay settings.
    pub fn new(
        pointer: Box<dyn InputSource>,
        keyboard: Box<dyn InputSource>,
        injector: Arc<dyn InputInjector>,
    ) -> Self {
        Self::with_replay_config(pointer, keyboard, injector, ReplayConfig::default())
    }

    /// Build a controller with explicit replay settings.
    pub fn with_replay_config(
        pointer: Box<dyn InputSource>,
        keyboard: Box<dyn InputSource>,
        injector: Arc<dyn InputInjector>,
        replay: ReplayConfig,
    ) -> Self {
        let state = Arc::new(SessionState::new());
        Self {
            capture: CaptureSession::new(state.clone(), pointer),
            replay: ReplayEngine::new(state.clone(), injector.clone(), replay),
            keyboard: Mutex::new(keyboard),
            injector,
            state,
        }
    }

    /// Build a controller from loaded settings.
    pub fn from_config(
        pointer: Box<dyn InputSource>,
        keyboard: Box<dyn InputSource>,
        injector: Arc<dyn InputInjector>,
        config: &Config,
    ) -> Result<Self> {
        let controller = Self::with_replay_config(
            pointer,
            keyboard,
            injector,
            config.replay.to_replay_config(),
        );
        controller.state.set_step_time(config.step_duration()?);
        Ok(controller)
    }

    fn keyboard(&self) -> MutexGuard<'_, Box<dyn InputSource>> {
        self.keyboard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shared session state.
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// The capture half of the session.
    pub fn capture(&self) -> &CaptureSession {
        &self.capture
    }

    /// The replay half of the session.
    pub fn replay(&self) -> &ReplayEngine {
        &self.replay
    }

    /// Check if recording is on.
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    /// Check if a replay is running.
    pub fn is_replaying(&self) -> bool {
        self.state.is_replaying()
    }

    /// Copy of the recorded sequence.
    pub fn clicks(&self) -> ClickSequence {
        self.state.clicks()
    }

    /// Number of recorded clicks.
    pub fn click_count(&self) -> usize {
        self.state.click_count()
    }

    /// Flip recording. Turning it on ends any replay.
    pub fn toggle_recording(&self) -> Result<bool> {
        self.capture.toggle_recording()
    }

    /// Turn recording off and stop the pointer listener. Returns whether it was on.
    pub fn stop_recording(&self) -> Result<bool> {
        self.capture.stop_recording()
    }

    /// Start replaying. Ends recording and stops the pointer listener.
    pub fn start_replay(&self) -> Result<ReplayStart> {
        let started = self.replay.start()?;
        if started == ReplayStart::Started {
            self.capture.stop_listening_unless_recording()?;
        }
        Ok(started)
    }

    /// Ask the running replay to stop. Returns whether one was running.
    pub fn stop_replay(&self) -> bool {
        self.replay.stop()
    }

    /// Start replay if idle, stop it if running. Returns whether it runs afterwards.
    pub fn toggle_replay(&self) -> Result<bool> {
        if self.replay.stop() {
            return Ok(false);
        }
        Ok(self.start_replay()? == ReplayStart::Started)
    }

    /// Block until the replay thread exits.
    pub fn wait_replay(&self) -> Option<ReplayReport> {
        self.replay.wait()
    }

    /// Receive replay progress events from now on.
    pub fn subscribe(&self) -> Receiver<ReplayEvent> {
        self.replay.subscribe()
    }

    /// Drop every recorded click.
    pub fn clear(&self) {
        self.capture.clear();
    }

    /// Replace all exclusion zones.
    pub fn set_exclusions<I>(&self, zones: I)
    where
        I: IntoIterator,
        I::Item: Into<Rect>,
    {
        self.capture.set_exclusions(zones);
    }

    /// Remove every exclusion zone.
    pub fn clear_exclusions(&self) {
        self.capture.clear_exclusions();
    }

    /// Edit one field of one record from UI text.
    pub fn edit_click(&self, index: usize, field: RecordField, text: &str) -> Result<()> {
        self.state
            .with_clicks(|clicks| clicks.edit(index, field, text))
            .inspect_err(|e| log::warn!("Rejected edit: {e}"))
    }

    /// Remove and return the record at `index`.
    pub fn remove_click(&self, index: usize) -> Result<ClickRecord> {
        self.state.with_clicks(|clicks| clicks.remove(index))
    }

    /// Append a scroll of `amount` at the pointer's current position.
    pub fn add_scroll_at_cursor(&self, amount: i32) -> Result<ClickRecord> {
        let (x, y) = self.injector.current_position()?;
        let record = ClickRecord::scroll(x, y, amount);
        self.state.with_clicks(|clicks| clicks.push(record.clone()));
        log::info!("Added scroll {amount} at: ({x}, {y})");
        Ok(record)
    }

    /// Current pause after each injected action.
    pub fn step_time(&self) -> Duration {
        self.state.step_time()
    }

    /// Set the pause after each injected action, in seconds.
    pub fn set_step_time(&self, secs: f64) -> Result<()> {
        let step = step_time_from_secs(secs)?;
        self.state.set_step_time(step);
        log::debug!("Step time updated to: {secs} seconds");
        Ok(())
    }

    /// Same as [`set_step_time`](Self::set_step_time), from raw UI text.
    pub fn set_step_time_str(&self, text: &str) -> Result<()> {
        let secs: f64 = text.trim().parse().map_err(|_| {
            log::warn!("Invalid step time value");
            Error::InvalidFieldEdit {
                field: "step_time".into(),
                value: text.to_string(),
                reason: "not a number".into(),
            }
        })?;
        self.set_step_time(secs)
    }

    /// Write the sequence to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::save(&self.state.clicks(), path)
    }

    /// Replace the sequence with the contents of `path`. On error nothing changes.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<usize> {
        let clicks = persist::load(path)?;
        let count = clicks.len();
        self.state.replace_clicks(clicks);
        Ok(count)
    }

    /// Start routing hotkeys from the keyboard listener.
    pub fn start_keyboard_listener(self: &Arc<Self>) -> Result<()> {
        let mut keyboard = self.keyboard();
        if keyboard.is_running() {
            return Ok(());
        }
        keyboard.start(Box::new(HotkeyRouter::new(self)))?;
        log::info!("Keyboard listener started");
        Ok(())
    }

    /// Stop routing hotkeys. Does nothing if the listener is not running.
    pub fn stop_keyboard_listener(&self) -> Result<()> {
        let mut keyboard = self.keyboard();
        if keyboard.is_running() {
            keyboard.stop()?;
            log::info!("Keyboard listener stopped");
        }
        Ok(())
    }

    /// Check if the keyboard listener is running.
    pub fn keyboard_listening(&self) -> bool {
        self.keyboard().is_running()
    }

    /// Check if the pointer listener is running.
    pub fn pointer_listening(&self) -> bool {
        self.capture.is_listening()
    }

    /// End replay and recording and stop the pointer listener.
    /// The keyboard listener is left alone.
    pub fn stop_capture_and_replay(&self) -> Result<()> {
        self.state.set_idle();
        self.capture.stop_listening()
    }

    /// Stop everything, both listeners included.
    pub fn stop_all(&self) -> Result<()> {
        self.stop_capture_and_replay()?;
        self.stop_keyboard_listener()
    }

    /// Snapshot of the session for the status line.
    pub fn status(&self) -> Status {
        Status {
            recording: self.state.is_recording(),
            replaying: self.state.is_replaying(),
            clicks: self.state.click_count(),
            exclusions: self.state.exclusion_count(),
            keyboard_listener: self.keyboard_listening(),
            pointer_listener: self.capture.is_listening(),
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Err(e) = self.stop_all() {
            log::warn!("Error stopping listeners: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Button, PointerEvent};
    use crate::injector::DryRunInjector;
    use crate::source::ChannelSource;

    fn controller_at(x: i32, y: i32) -> Controller {
        let (pointer, _) = ChannelSource::new();
        let (keyboard, _) = ChannelSource::new();
        Controller::new(
            Box::new(pointer),
            Box::new(keyboard),
            Arc::new(DryRunInjector::at(x, y)),
        )
    }

    #[test]
    fn test_status_line() {
        let controller = controller_at(0, 0);
        controller.set_exclusions([(0, 0, 10, 10)]);
        assert_eq!(
            controller.status().to_string(),
            "Recording: OFF | Replaying: OFF | Clicks recorded: 0 | Button exclusions: 1 | \
             Keyboard Listener: OFF | Mouse Listener: OFF"
        );

        controller.toggle_recording().unwrap();
        let status = controller.status();
        assert!(status.recording);
        assert!(status.pointer_listener);
    }

    #[test]
    fn test_add_scroll_at_cursor() {
        let controller = controller_at(640, 360);
        let record = controller.add_scroll_at_cursor(-4).unwrap();
        assert!(record.is_scroll);
        assert_eq!((record.x, record.y, record.scroll_amount), (640, 360, -4));
        assert_eq!(controller.click_count(), 1);
    }

    #[test]
    fn test_step_time_validation() {
        let controller = controller_at(0, 0);
        controller.set_step_time(0.25).unwrap();
        assert_eq!(controller.step_time(), Duration::from_millis(250));

        assert!(controller.set_step_time(20.0).is_err());
        assert!(controller.set_step_time_str("abc").is_err());
        assert_eq!(controller.step_time(), Duration::from_millis(250));

        controller.set_step_time_str(" 0.5 ").unwrap();
        assert_eq!(controller.step_time(), Duration::from_millis(500));
    }

    #[test]
    fn test_failed_load_keeps_sequence() {
        let controller = controller_at(0, 0);
        controller.toggle_recording().unwrap();
        controller.capture().on_pointer_event(&PointerEvent {
            x: 1,
            y: 1,
            button: Button::Left,
            pressed: true,
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[{\"x\": 1").unwrap();

        assert!(matches!(
            controller.load(&path),
            Err(Error::MalformedData { .. })
        ));
        assert_eq!(controller.click_count(), 1);
    }

    #[test]
    fn test_edit_click_rejects_bad_value() {
        let controller = controller_at(0, 0);
        controller.add_scroll_at_cursor(2).unwrap();
        assert!(controller.edit_click(0, RecordField::Delay, "soon").is_err());
        controller.edit_click(0, RecordField::Delay, "1.5").unwrap();
        assert_eq!(controller.clicks().get(0).unwrap().delay, 1.5);
    }

    #[test]
    fn test_start_replay_stops_pointer_listener() {
        let controller = controller_at(0, 0);
        controller.add_scroll_at_cursor(1).unwrap();
        controller.toggle_recording().unwrap();
        assert!(controller.pointer_listening());

        assert_eq!(controller.start_replay().unwrap(), ReplayStart::Started);
        assert!(!controller.pointer_listening());
        assert!(!controller.is_recording());

        controller.stop_replay();
        controller.wait_replay();
    }

    #[test]
    fn test_racing_record_and_replay_keep_listener_in_step() {
        let controller = controller_at(0, 0);
        controller.add_scroll_at_cursor(1).unwrap();
        controller.edit_click(0, RecordField::Delay, "5").unwrap();

        for _ in 0..50 {
            std::thread::scope(|s| {
                s.spawn(|| controller.toggle_recording().unwrap());
                s.spawn(|| controller.start_replay().unwrap());
            });
            assert_eq!(controller.pointer_listening(), controller.is_recording());
            assert!(!(controller.is_recording() && controller.is_replaying()));

            controller.stop_all().unwrap();
            controller.wait_replay();
        }
    }
}
