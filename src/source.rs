//! Observed input sources and the handlers they push events into.
//!
//! An [`InputSource`] owns one background listener. Pointer observation and
//! keyboard observation each get their own source so they can be started and
//! stopped independently. Handlers run on the source's thread.
//!
//! [`ChannelSource`] is the bundled implementation: whatever produces raw
//! events (an OS hook, a UI toolkit, a test) pushes them through an
//! [`InputFeed`], and the source dispatches them to its handler while running.
//!
//! # Example
//!
//! ```no_run
//! use clickloop::source::{ChannelSource, InputSource, ListenFlow};
//! use clickloop::event::{Button, InputEvent};
//!
//! let (mut source, feed) = ChannelSource::new();
//! source
//!     .start(Box::new(|event: &InputEvent| {
//!         println!("{:?}", event.kind);
//!         ListenFlow::Continue
//!     }))
//!     .unwrap();
//!
//! feed.send(InputEvent::mouse_pressed(Button::Left, 10, 20));
//! source.stop().unwrap();
//! ```

use crate::error::{Error, Result};
use crate::event::InputEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// Whether a listener keeps running after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenFlow {
    Continue,
    /// Terminate the listener that delivered the event.
    Stop,
}

/// Trait for handling input events.
pub trait EventHandler: Send + Sync {
    /// Called on the listener thread for every observed event.
    fn handle_event(&self, event: &InputEvent) -> ListenFlow;
}

/// Implement EventHandler for closures.
impl<F> EventHandler for F
where
    F: Fn(&InputEvent) -> ListenFlow + Send + Sync,
{
    fn handle_event(&self, event: &InputEvent) -> ListenFlow {
        self(event)
    }
}

/// A startable, stoppable stream of input events.
pub trait InputSource: Send {
    /// Start delivering events to `handler` on a background thread.
    ///
    /// Fails with [`Error::AlreadyRunning`] if the source is already running.
    fn start(&mut self, handler: Box<dyn EventHandler>) -> Result<()>;

    /// Stop delivering events.
    ///
    /// Fails with [`Error::NotRunning`] if the source is not running.
    fn stop(&mut self) -> Result<()>;

    /// Check if the source is currently delivering events.
    fn is_running(&self) -> bool;
}

/// Producer side of a [`ChannelSource`].
#[derive(Debug, Clone)]
pub struct InputFeed {
    sender: Sender<InputEvent>,
}

impl InputFeed {
    /// Push an event. Returns `false` once the source has been dropped.
    pub fn send(&self, event: InputEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// How often the dispatch thread re-checks its running flag while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// An [`InputSource`] fed by an [`InputFeed`].
pub struct ChannelSource {
    sender: Sender<InputEvent>,
    receiver: Arc<Mutex<Receiver<InputEvent>>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    thread_id: Option<ThreadId>,
}

impl ChannelSource {
    /// Create a stopped source and the feed that drives it.
    pub fn new() -> (Self, InputFeed) {
        let (sender, receiver) = mpsc::channel();
        let source = Self {
            sender: sender.clone(),
            receiver: Arc::new(Mutex::new(receiver)),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            thread_id: None,
        };
        (source, InputFeed { sender })
    }

    /// Another producer handle for this source.
    pub fn feed(&self) -> InputFeed {
        InputFeed {
            sender: self.sender.clone(),
        }
    }

    fn reap_finished(&mut self) -> Result<()> {
        if let Some(handle) = self.thread_handle.take() {
            handle
                .join()
                .map_err(|_| Error::ThreadError("failed to join listener thread".into()))?;
        }
        self.thread_id = None;
        Ok(())
    }
}

impl InputSource for ChannelSource {
    fn start(&mut self, handler: Box<dyn EventHandler>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        // A listener that stopped itself leaves its handle behind.
        self.reap_finished()?;

        // Events pushed while nobody was listening are not observed.
        {
            let receiver = self
                .receiver
                .lock()
                .map_err(|_| Error::ThreadError("feed mutex poisoned".into()))?;
            while receiver.try_recv().is_ok() {}
        }

        let running = self.running.clone();
        let receiver = self.receiver.clone();
        let handle = thread::spawn(move || {
            let Ok(receiver) = receiver.lock() else {
                running.store(false, Ordering::SeqCst);
                return;
            };
            while running.load(Ordering::SeqCst) {
                match receiver.recv_timeout(POLL_INTERVAL) {
                    Ok(event) => {
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }
                        if handler.handle_event(&event) == ListenFlow::Stop {
                            log::debug!("listener stopped by its handler");
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            running.store(false, Ordering::SeqCst);
        });

        self.thread_id = Some(handle.thread().id());
        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(Error::NotRunning);
        }

        // Stopping from inside our own handler: the loop exits on its own.
        if self.thread_id == Some(thread::current().id()) {
            return Ok(());
        }

        self.reap_finished()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for ChannelSource {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}
