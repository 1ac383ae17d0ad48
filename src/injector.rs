//! Synthetic input injection.
//!
//! The replay engine only talks to an [`InputInjector`]; wiring it to a real
//! OS backend is left to the embedding application. [`DryRunInjector`]
//! performs nothing and keeps a log of what it was asked to do, which is what
//! the CLI's dry-run mode and the tests use.

use crate::error::Result;
use std::sync::Mutex;

/// Performs clicks, scrolls and pointer moves at screen coordinates.
///
/// Any call may fail with [`crate::Error::Injection`].
pub trait InputInjector: Send + Sync {
    /// Single primary-button click at `(x, y)`.
    fn click(&self, x: i32, y: i32) -> Result<()>;

    /// Double primary-button click at `(x, y)`.
    fn double_click(&self, x: i32, y: i32) -> Result<()>;

    /// Scroll the wheel at the current pointer position. Positive scrolls up.
    fn scroll(&self, amount: i32) -> Result<()>;

    /// Move the pointer to `(x, y)`.
    fn move_to(&self, x: i32, y: i32) -> Result<()>;

    /// Current pointer position.
    fn current_position(&self) -> Result<(i32, i32)>;
}

/// One call made against an injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedAction {
    Click { x: i32, y: i32 },
    DoubleClick { x: i32, y: i32 },
    Scroll { amount: i32 },
    MoveTo { x: i32, y: i32 },
}

/// An injector that only records and logs the actions it receives.
#[derive(Debug, Default)]
pub struct DryRunInjector {
    actions: Mutex<Vec<InjectedAction>>,
    position: Mutex<(i32, i32)>,
}

impl DryRunInjector {
    /// Create an injector with the virtual pointer at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the virtual pointer at `(x, y)`.
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            position: Mutex::new((x, y)),
        }
    }

    /// Snapshot of every action so far, in call order.
    pub fn actions(&self) -> Vec<InjectedAction> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Coordinates of every click and double click, in call order.
    pub fn click_positions(&self) -> Vec<(i32, i32)> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                InjectedAction::Click { x, y } | InjectedAction::DoubleClick { x, y } => {
                    Some((x, y))
                }
                _ => None,
            })
            .collect()
    }

    fn push(&self, action: InjectedAction) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.push(action);
        }
    }

    fn set_position(&self, x: i32, y: i32) {
        if let Ok(mut pos) = self.position.lock() {
            *pos = (x, y);
        }
    }
}

impl InputInjector for DryRunInjector {
    fn click(&self, x: i32, y: i32) -> Result<()> {
        log::info!("[dry-run] click at ({x}, {y})");
        self.set_position(x, y);
        self.push(InjectedAction::Click { x, y });
        Ok(())
    }

    fn double_click(&self, x: i32, y: i32) -> Result<()> {
        log::info!("[dry-run] double click at ({x}, {y})");
        self.set_position(x, y);
        self.push(InjectedAction::DoubleClick { x, y });
        Ok(())
    }

    fn scroll(&self, amount: i32) -> Result<()> {
        log::info!("[dry-run] scroll {amount}");
        self.push(InjectedAction::Scroll { amount });
        Ok(())
    }

    fn move_to(&self, x: i32, y: i32) -> Result<()> {
        log::debug!("[dry-run] move to ({x}, {y})");
        self.set_position(x, y);
        self.push(InjectedAction::MoveTo { x, y });
        Ok(())
    }

    fn current_position(&self) -> Result<(i32, i32)> {
        Ok(self.position.lock().map(|p| *p).unwrap_or((0, 0)))
    }
}
