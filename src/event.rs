//! Input events raised by an observed input source.

/// Mouse button identifiers as reported by the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Left mouse button (Button 1).
    Left,
    /// Right mouse button (Button 2).
    Right,
    /// Middle mouse button (Button 3).
    Middle,
    /// Extra button 1 (typically back).
    Button4,
    /// Extra button 2 (typically forward).
    Button5,
    /// Unknown or unsupported button.
    Unknown(u8),
}

/// A keyboard key. Only [`Key::Char`] carries a printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A key that produced a printable character (case already applied).
    Char(char),
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,
    Shift,
    Control,
    Alt,
    Meta,
    /// Function key F1..F24.
    Function(u8),
    /// Anything else, by raw platform code.
    Other(u32),
}

impl Key {
    /// The printable character for this key, if any.
    pub fn char(&self) -> Option<char> {
        match self {
            Key::Char(c) => Some(*c),
            _ => None,
        }
    }
}

/// A pointer button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    /// X coordinate (screen coordinates).
    pub x: i32,
    /// Y coordinate (screen coordinates).
    pub y: i32,
    pub button: Button,
    /// `true` for press, `false` for release.
    pub pressed: bool,
}

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
}

/// Payload of an [`InputEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Mouse button press or release.
    Pointer(PointerEvent),
    /// Key press.
    Key(KeyEvent),
}

/// A complete input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: EventKind,
}

impl InputEvent {
    fn new(kind: EventKind) -> Self {
        Self { kind }
    }

    /// Create a mouse pressed event.
    pub fn mouse_pressed(button: Button, x: i32, y: i32) -> Self {
        Self::new(EventKind::Pointer(PointerEvent {
            x,
            y,
            button,
            pressed: true,
        }))
    }

    /// Create a mouse released event.
    pub fn mouse_released(button: Button, x: i32, y: i32) -> Self {
        Self::new(EventKind::Pointer(PointerEvent {
            x,
            y,
            button,
            pressed: false,
        }))
    }

    /// Create a key pressed event.
    pub fn key_pressed(key: Key) -> Self {
        Self::new(EventKind::Key(KeyEvent { key }))
    }

    /// Shorthand for a printable key press.
    pub fn char_pressed(c: char) -> Self {
        Self::key_pressed(Key::Char(c))
    }

    /// Get pointer data if this is a pointer event.
    pub fn pointer(&self) -> Option<&PointerEvent> {
        match &self.kind {
            EventKind::Pointer(p) => Some(p),
            EventKind::Key(_) => None,
        }
    }

    /// Get keyboard data if this is a key event.
    pub fn key(&self) -> Option<&KeyEvent> {
        match &self.kind {
            EventKind::Key(k) => Some(k),
            EventKind::Pointer(_) => None,
        }
    }
}
