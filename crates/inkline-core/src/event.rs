#![forbid(unsafe_code)]

//! Key event types.
//!
//! A [`KeyEvent`] is the decoded form of one logical keypress. The closed set
//! of keys is [`KeyCode`]; printable characters carry their rune inside
//! [`KeyCode::Char`], so a rune can never be attached to a non-character key.
//!
//! # Design Notes
//!
//! - Ctrl-combinations (bytes 0x01-0x1A) decode to `Char('a'..='z')` with
//!   [`Modifiers::CTRL`] set.
//! - The bytes that double as Enter, Backspace and Tab never produce a
//!   Ctrl-combination; they always decode to the special key.
//! - Space has its own key code rather than `Char(' ')`.

use std::fmt;

use bitflags::bitflags;

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// The key that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a new key event without modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Ctrl-combination for a lowercase letter.
    #[must_use]
    pub const fn ctrl_char(c: char) -> Self {
        Self::new(KeyCode::Char(c)).with_modifiers(Modifiers::CTRL)
    }

    /// Check if this is a specific character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    /// The rune payload, present only for [`KeyCode::Char`].
    #[must_use]
    pub const fn rune(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) => Some(c),
            _ => None,
        }
    }

    /// Check if Ctrl modifier is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }
}

impl From<KeyCode> for KeyEvent {
    fn from(code: KeyCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl() {
            f.write_str("ctrl+")?;
        }
        fmt::Display::fmt(&self.code, f)
    }
}

/// Key codes for keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable character key.
    Char(char),

    /// Enter/Return key.
    Enter,

    /// Backspace key.
    Backspace,

    /// Tab key.
    Tab,

    /// Escape key.
    Escape,

    /// Space bar.
    Space,

    /// Up arrow key.
    Up,

    /// Down arrow key.
    Down,

    /// Left arrow key.
    Left,

    /// Right arrow key.
    Right,

    /// Function key (F1-F12).
    F(u8),

    /// Home key.
    Home,

    /// End key.
    End,

    /// Insert key.
    Insert,

    /// Delete key.
    Delete,

    /// Page Up key.
    PageUp,

    /// Page Down key.
    PageDown,
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{c}"),
            Self::Enter => f.write_str("enter"),
            Self::Backspace => f.write_str("backspace"),
            Self::Tab => f.write_str("tab"),
            Self::Escape => f.write_str("esc"),
            Self::Space => f.write_str("space"),
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
            Self::F(n) => write!(f, "f{n}"),
            Self::Home => f.write_str("home"),
            Self::End => f.write_str("end"),
            Self::Insert => f.write_str("insert"),
            Self::Delete => f.write_str("delete"),
            Self::PageUp => f.write_str("pgup"),
            Self::PageDown => f.write_str("pgdown"),
        }
    }
}

bitflags! {
    /// Modifier keys that can be held during a key event.
    ///
    /// The byte decoder can only observe Ctrl (via the C0 control range);
    /// other modifiers are not representable in the legacy encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE = 0b0000;
        /// Control key.
        const CTRL = 0b0100;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}
