//! Looped replay of the recorded sequence.
//!
//! Each cycle walks the sequence in order. A record's position drifts by its
//! own offset once per completed cycle, so cycle `n` performs it at
//! `(x + offset_x * (n - 1), y + offset_y * (n - 1))`. After every injected
//! action the loop pauses for the session step time, and after each record it
//! waits out that record's delay.
//!
//! Cancellation is cooperative. [`ReplayEngine::stop`] only flips the session
//! mode; the loop checks it before every record and between cycles. All
//! waits inside the loop wake as soon as the mode changes, so a stop lands
//! without sitting out a long delay. An injection call already in progress
//! still completes.
//!
//! # Example
//!
//! ```no_run
//! use clickloop::injector::DryRunInjector;
//! use clickloop::record::{ClickRecord, MouseButton};
//! use clickloop::replay::{ReplayConfig, ReplayEngine};
//! use clickloop::state::SessionState;
//! use std::sync::Arc;
//!
//! let state = Arc::new(SessionState::new());
//! state.with_clicks(|c| c.push(ClickRecord::click(100, 100, MouseButton::Left)));
//!
//! let engine = ReplayEngine::new(state, Arc::new(DryRunInjector::new()), ReplayConfig::default());
//! engine.start().unwrap();
//! let report = engine.wait().unwrap();
//! println!("{} cycles", report.cycles);
//! ```

use crate::error::{Error, Result};
use crate::injector::InputInjector;
use crate::record::{ClickKind, ClickRecord};
use crate::state::SessionState;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Cycle ceiling applied unless configured otherwise.
pub const DEFAULT_MAX_CYCLES: u32 = 100;

/// Tunables for the replay loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Stop after this many cycles even if nobody asked to. `None` = no limit.
    pub max_cycles: Option<u32>,
    /// Pause between moving the pointer and scrolling.
    pub settle: Duration,
    /// Pause between cycles.
    pub cycle_pause: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_cycles: Some(DEFAULT_MAX_CYCLES),
            settle: Duration::from_millis(20),
            cycle_pause: Duration::from_millis(100),
        }
    }
}

/// Why a replay loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishReason {
    /// Stopped on request (stop, toggle, or recording turned on).
    #[default]
    Stopped,
    /// Reached [`ReplayConfig::max_cycles`].
    CycleLimit,
    /// The sequence was empty.
    Empty,
}

/// Summary of one replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Cycles started.
    pub cycles: u32,
    pub clicks: u32,
    pub double_clicks: u32,
    pub scrolls: u32,
    /// Injection calls that failed and were skipped.
    pub failures: u32,
    pub reason: FinishReason,
}

/// Progress notifications from a running replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEvent {
    /// A new cycle began (1-based).
    CycleStarted(u32),
    Clicked { x: i32, y: i32 },
    DoubleClicked { x: i32, y: i32 },
    Scrolled { x: i32, y: i32, amount: i32 },
    /// The record at `index` could not be performed and was skipped.
    InjectionFailed { index: usize, message: String },
    /// A start was requested with an empty sequence.
    NothingToReplay,
    /// The loop exited.
    Finished(ReplayReport),
}

/// Result of [`ReplayEngine::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStart {
    /// A new replay thread is running.
    Started,
    /// A replay was already running; nothing changed.
    AlreadyRunning,
    /// The sequence is empty; nothing changed.
    NothingToReplay,
}

#[derive(Default)]
struct Notifier {
    senders: Mutex<Vec<Sender<ReplayEvent>>>,
    #[cfg(feature = "tokio")]
    async_senders: Mutex<Vec<tokio::sync::mpsc::UnboundedSender<ReplayEvent>>>,
}

impl Notifier {
    fn emit(&self, event: ReplayEvent) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|s| s.send(event.clone()).is_ok());
        }
        #[cfg(feature = "tokio")]
        if let Ok(mut senders) = self.async_senders.lock() {
            senders.retain(|s| s.send(event.clone()).is_ok());
        }
    }
}

/// Owns the replay thread.
pub struct ReplayEngine {
    state: Arc<SessionState>,
    injector: Arc<dyn InputInjector>,
    config: Mutex<ReplayConfig>,
    notifier: Arc<Notifier>,
    worker: Mutex<Option<JoinHandle<ReplayReport>>>,
}

impl ReplayEngine {
    /// Create a stopped engine replaying `state`'s sequence through `injector`.
    pub fn new(
        state: Arc<SessionState>,
        injector: Arc<dyn InputInjector>,
        config: ReplayConfig,
    ) -> Self {
        Self {
            state,
            injector,
            config: Mutex::new(config),
            notifier: Arc::new(Notifier::default()),
            worker: Mutex::new(None),
        }
    }

    fn worker(&self) -> MutexGuard<'_, Option<JoinHandle<ReplayReport>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current loop settings.
    pub fn config(&self) -> ReplayConfig {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes effect on the next [`start`](Self::start).
    pub fn set_config(&self, config: ReplayConfig) {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Start replaying on a background thread.
    ///
    /// Ends any recording. Does nothing if a replay is already running or the
    /// sequence is empty.
    pub fn start(&self) -> Result<ReplayStart> {
        let mut worker = self.worker();
        if self.state.is_replaying() {
            log::info!("Replay already running");
            return Ok(ReplayStart::AlreadyRunning);
        }
        if self.state.click_count() == 0 {
            log::info!("No clicks recorded to replay");
            self.notifier.emit(ReplayEvent::NothingToReplay);
            return Ok(ReplayStart::NothingToReplay);
        }

        let Some(run) = self.state.begin_replay() else {
            log::info!("Replay already running");
            return Ok(ReplayStart::AlreadyRunning);
        };

        // The previous loop has already seen its run end; reap it.
        if let Some(previous) = worker.take() {
            previous
                .join()
                .map_err(|_| Error::ThreadError("replay thread panicked".into()))?;
        }

        let replay = ReplayLoop {
            state: self.state.clone(),
            injector: self.injector.clone(),
            notifier: self.notifier.clone(),
            config: self.config(),
            run,
        };
        let handle = thread::Builder::new()
            .name("clickloop-replay".into())
            .spawn(move || replay.run())
            .map_err(|e| {
                self.state.finish_run(run);
                Error::ThreadError(format!("failed to spawn replay thread: {e}"))
            })?;
        *worker = Some(handle);

        log::info!("Started replay...");
        Ok(ReplayStart::Started)
    }

    /// Ask the running replay to stop. Returns whether one was running.
    pub fn stop(&self) -> bool {
        let stopped = self.state.end_replay();
        if stopped {
            log::info!("Replay stopped");
        }
        stopped
    }

    /// Start if idle, stop if running. Returns whether a replay is running afterwards.
    pub fn toggle(&self) -> Result<bool> {
        if self.stop() {
            return Ok(false);
        }
        Ok(self.start()? == ReplayStart::Started)
    }

    /// Block until the current (or last) replay thread exits.
    ///
    /// Returns `None` if no replay was started since the last wait.
    pub fn wait(&self) -> Option<ReplayReport> {
        let handle = self.worker().take()?;
        handle.join().ok()
    }

    /// Check if a replay is running.
    pub fn is_running(&self) -> bool {
        self.state.is_replaying()
    }

    /// 1-based number of the cycle in progress (or last run's final cycle).
    pub fn cycle_count(&self) -> u32 {
        self.state.cycle_count()
    }

    /// Receive progress events from now on.
    pub fn subscribe(&self) -> Receiver<ReplayEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut senders) = self.notifier.senders.lock() {
            senders.push(tx);
        }
        rx
    }

    /// Receive progress events on a tokio channel.
    #[cfg(feature = "tokio")]
    pub fn subscribe_async(&self) -> tokio::sync::mpsc::UnboundedReceiver<ReplayEvent> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        if let Ok(mut senders) = self.notifier.async_senders.lock() {
            senders.push(tx);
        }
        rx
    }
}

impl Drop for ReplayEngine {
    fn drop(&mut self) {
        self.stop();
        let _ = self.wait();
    }
}

struct ReplayLoop {
    state: Arc<SessionState>,
    injector: Arc<dyn InputInjector>,
    notifier: Arc<Notifier>,
    config: ReplayConfig,
    run: u64,
}

impl ReplayLoop {
    fn active(&self) -> bool {
        self.state.is_run_active(self.run)
    }

    /// Wait up to `duration`; `false` means the run was stopped meanwhile.
    fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.active();
        }
        self.state.pause_run(self.run, duration)
    }

    /// Step time applied after every injected action.
    fn pace(&self) {
        self.pause(self.state.step_time());
    }

    fn run(self) -> ReplayReport {
        let mut report = ReplayReport::default();

        if self.state.click_count() == 0 {
            log::info!("No clicks recorded to replay");
            self.notifier.emit(ReplayEvent::NothingToReplay);
            report.reason = FinishReason::Empty;
            self.state.finish_run(self.run);
            return report;
        }

        let reason = loop {
            if !self.active() {
                break FinishReason::Stopped;
            }

            let cycle = self.state.next_cycle();
            report.cycles = cycle;
            log::info!("Starting replay cycle #{cycle}");
            self.notifier.emit(ReplayEvent::CycleStarted(cycle));

            let mut index = 0;
            while let Some(record) = self.state.with_clicks(|c| c.get(index).cloned()) {
                if !self.active() {
                    break;
                }
                self.perform(index, &record, cycle, &mut report);
                if !self.wait_delay(&record) {
                    break;
                }
                index += 1;
            }

            if !self.active() {
                break FinishReason::Stopped;
            }
            if self.config.max_cycles.is_some_and(|max| cycle >= max) {
                log::info!("Reached the {cycle}-cycle limit");
                break FinishReason::CycleLimit;
            }
            if !self.pause(self.config.cycle_pause) {
                break FinishReason::Stopped;
            }
        };
        report.reason = reason;

        self.state.finish_run(self.run);
        log::info!("Replay finished");
        self.notifier.emit(ReplayEvent::Finished(report.clone()));
        report
    }

    fn wait_delay(&self, record: &ClickRecord) -> bool {
        if record.delay <= 0.0 {
            return true;
        }
        match Duration::try_from_secs_f64(record.delay) {
            Ok(delay) => self.pause(delay),
            Err(e) => {
                log::warn!("Skipping unusable delay {}: {e}", record.delay);
                self.active()
            }
        }
    }

    fn perform(&self, index: usize, record: &ClickRecord, cycle: u32, report: &mut ReplayReport) {
        let (x, y) = record.position_at(cycle);
        let result = match record.kind() {
            ClickKind::Scroll => self.scroll_at(x, y, record.scroll_amount).map(|()| {
                report.scrolls += 1;
                log::info!("Scrolled {} at: ({x}, {y})", record.scroll_amount);
                ReplayEvent::Scrolled {
                    x,
                    y,
                    amount: record.scroll_amount,
                }
            }),
            ClickKind::Double => self.injector.double_click(x, y).map(|()| {
                report.double_clicks += 1;
                log::info!("Double-clicked at: ({x}, {y})");
                ReplayEvent::DoubleClicked { x, y }
            }),
            ClickKind::Single => self.injector.click(x, y).map(|()| {
                report.clicks += 1;
                log::info!("Clicked at: ({x}, {y})");
                ReplayEvent::Clicked { x, y }
            }),
        };

        match result {
            Ok(event) => {
                self.pace();
                self.notifier.emit(event);
            }
            Err(e) => {
                report.failures += 1;
                match record.kind() {
                    ClickKind::Scroll => log::warn!("Scroll failed: {e}"),
                    _ => log::warn!("Click failed at ({x}, {y}): {e}"),
                }
                self.notifier.emit(ReplayEvent::InjectionFailed {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    /// Some drivers ignore coordinates on scroll, so move there first.
    fn scroll_at(&self, x: i32, y: i32, amount: i32) -> Result<()> {
        self.injector.move_to(x, y)?;
        self.pace();
        thread::sleep(self.config.settle);
        self.injector.scroll(amount)
    }
}
