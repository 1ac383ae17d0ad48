//! Shared session state: mode, recorded sequence, exclusion zones and pacing.
//!
//! Everything that the UI thread, the listener threads and the replay thread
//! touch lives in one [`SessionState`] behind an `Arc`. Recording and replaying
//! are a single [`Mode`] value under one lock, so they can never both be on.
//! Each replay run gets its own id; a loop only keeps going while the mode
//! still names its run, which rules out a stale loop resuming after a quick
//! stop/start pair.

use crate::exclusion::{ExclusionZoneSet, Rect};
use crate::record::ClickSequence;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

/// Default pause applied after every injected action.
pub const DEFAULT_STEP_TIME: Duration = Duration::from_millis(100);

/// What the session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Neither recording nor replaying.
    Idle,
    /// Primary clicks are being captured.
    Recording,
    /// A replay loop identified by `run` is active.
    Replaying { run: u64 },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide session state.
#[derive(Debug)]
pub struct SessionState {
    mode: Mutex<Mode>,
    mode_changed: Condvar,
    clicks: Mutex<ClickSequence>,
    exclusions: RwLock<ExclusionZoneSet>,
    step_time: Mutex<Duration>,
    cycle: AtomicU32,
    last_run: AtomicU64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Create an idle session with no clicks and the default step time.
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(Mode::Idle),
            mode_changed: Condvar::new(),
            clicks: Mutex::new(ClickSequence::new()),
            exclusions: RwLock::new(ExclusionZoneSet::new()),
            step_time: Mutex::new(DEFAULT_STEP_TIME),
            cycle: AtomicU32::new(0),
            last_run: AtomicU64::new(0),
        }
    }

    fn set_mode(&self, guard: &mut MutexGuard<'_, Mode>, mode: Mode) {
        **guard = mode;
        self.mode_changed.notify_all();
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        *lock(&self.mode)
    }

    /// Check if recording is on.
    pub fn is_recording(&self) -> bool {
        self.mode() == Mode::Recording
    }

    /// Check if a replay is running.
    pub fn is_replaying(&self) -> bool {
        matches!(self.mode(), Mode::Replaying { .. })
    }

    /// Flip recording. Turning it on ends any replay. Returns the new value.
    pub fn toggle_recording(&self) -> bool {
        let mut mode = lock(&self.mode);
        if *mode == Mode::Recording {
            self.set_mode(&mut mode, Mode::Idle);
            false
        } else {
            self.set_mode(&mut mode, Mode::Recording);
            true
        }
    }

    /// Turn recording off. Returns whether it was on.
    pub fn stop_recording(&self) -> bool {
        let mut mode = lock(&self.mode);
        if *mode == Mode::Recording {
            self.set_mode(&mut mode, Mode::Idle);
            true
        } else {
            false
        }
    }

    /// Enter replay mode with a fresh run id, ending any recording.
    ///
    /// Returns `None` if a replay is already active.
    pub fn begin_replay(&self) -> Option<u64> {
        let mut mode = lock(&self.mode);
        if matches!(*mode, Mode::Replaying { .. }) {
            return None;
        }
        let run = self.last_run.fetch_add(1, Ordering::SeqCst) + 1;
        self.cycle.store(0, Ordering::SeqCst);
        self.set_mode(&mut mode, Mode::Replaying { run });
        Some(run)
    }

    /// Request the active replay to stop. Returns whether one was active.
    pub fn end_replay(&self) -> bool {
        let mut mode = lock(&self.mode);
        if matches!(*mode, Mode::Replaying { .. }) {
            self.set_mode(&mut mode, Mode::Idle);
            true
        } else {
            false
        }
    }

    /// Leave replay mode if `run` is still the active run.
    pub fn finish_run(&self, run: u64) {
        let mut mode = lock(&self.mode);
        if *mode == (Mode::Replaying { run }) {
            self.set_mode(&mut mode, Mode::Idle);
        }
    }

    /// Whether `run` is the active replay.
    pub fn is_run_active(&self, run: u64) -> bool {
        self.mode() == Mode::Replaying { run }
    }

    /// Sleep up to `timeout`, waking early if `run` stops being active.
    /// Returns whether the run is still active afterwards.
    pub fn pause_run(&self, run: u64, timeout: Duration) -> bool {
        let active = Mode::Replaying { run };
        let guard = lock(&self.mode);
        let (guard, _) = self
            .mode_changed
            .wait_timeout_while(guard, timeout, |mode| *mode == active)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == active
    }

    /// Turn both recording and replaying off.
    pub fn set_idle(&self) {
        let mut mode = lock(&self.mode);
        if *mode != Mode::Idle {
            self.set_mode(&mut mode, Mode::Idle);
        }
    }

    /// Run `f` with exclusive access to the recorded sequence.
    pub fn with_clicks<R>(&self, f: impl FnOnce(&mut ClickSequence) -> R) -> R {
        f(&mut lock(&self.clicks))
    }

    /// Copy of the recorded sequence.
    pub fn clicks(&self) -> ClickSequence {
        lock(&self.clicks).clone()
    }

    /// Number of recorded clicks.
    pub fn click_count(&self) -> usize {
        lock(&self.clicks).len()
    }

    /// Replace the whole sequence.
    pub fn replace_clicks(&self, clicks: ClickSequence) {
        *lock(&self.clicks) = clicks;
    }

    /// Remove every recorded click.
    pub fn clear_clicks(&self) {
        lock(&self.clicks).clear();
    }

    /// Whether `(x, y)` lies in an exclusion zone.
    pub fn is_excluded(&self, x: i32, y: i32) -> bool {
        self.exclusions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(x, y)
    }

    /// Replace every exclusion zone.
    pub fn set_exclusions(&self, zones: Vec<Rect>) {
        self.exclusions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(zones);
    }

    /// Remove every exclusion zone.
    pub fn clear_exclusions(&self) {
        self.exclusions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of exclusion zones.
    pub fn exclusion_count(&self) -> usize {
        self.exclusions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Pause applied after each injected action.
    pub fn step_time(&self) -> Duration {
        *lock(&self.step_time)
    }

    /// Set the pause applied after each injected action.
    pub fn set_step_time(&self, step: Duration) {
        *lock(&self.step_time) = step;
    }

    /// 1-based cycle number of the current (or last) replay run.
    pub fn cycle_count(&self) -> u32 {
        self.cycle.load(Ordering::SeqCst)
    }

    pub(crate) fn next_cycle(&self) -> u32 {
        self.cycle.fetch_add(1, Ordering::SeqCst) + 1
    }
}
