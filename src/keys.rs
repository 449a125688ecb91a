//! Key events as the detector sees them: Keystroke, Modifiers, KeyCode
//!
//! Character keys keep their case: the detection buffer is case-preserving.
//! Chord checks (undo, redo, show-all) lowercase the character themselves.

use std::fmt;

/// Modifier keys held during a keystroke
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Cmd on macOS, Win elsewhere
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers::from_flags(false, false, false, false);
    pub const CTRL: Modifiers = Modifiers::from_flags(true, false, false, false);
    pub const SHIFT: Modifiers = Modifiers::from_flags(false, true, false, false);
    pub const ALT: Modifiers = Modifiers::from_flags(false, false, true, false);
    pub const META: Modifiers = Modifiers::from_flags(false, false, false, true);

    /// The platform's shortcut modifier: Cmd on macOS, Ctrl elsewhere
    pub const PRIMARY: Modifiers = if cfg!(target_os = "macos") {
        Modifiers::META
    } else {
        Modifiers::CTRL
    };

    const fn from_flags(ctrl: bool, shift: bool, alt: bool, meta: bool) -> Self {
        Self {
            ctrl,
            shift,
            alt,
            meta,
        }
    }

    pub const fn is_empty(self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.meta)
    }

    /// Whether the keystroke is a shortcut rather than text input. Shift
    /// alone still types.
    pub const fn has_shortcut_modifier(self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers::from_flags(
            self.ctrl || rhs.ctrl,
            self.shift || rhs.shift,
            self.alt || rhs.alt,
            self.meta || rhs.meta,
        )
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let held = [
            (self.ctrl, "Ctrl"),
            (self.shift, "Shift"),
            (self.alt, "Alt"),
            (self.meta, "Meta"),
        ];
        let names: Vec<&str> = held
            .iter()
            .filter_map(|&(on, name)| on.then_some(name))
            .collect();
        f.write_str(&names.join("+"))
    }
}

/// Logical key, independent of layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A character key (case preserved)
    Char(char),
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Space,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

/// Named keys: display name first, then accepted aliases
const NAMED_KEYS: &[(KeyCode, &[&str])] = &[
    (KeyCode::Enter, &["Enter", "return"]),
    (KeyCode::Escape, &["Escape", "esc"]),
    (KeyCode::Tab, &["Tab"]),
    (KeyCode::Backspace, &["Backspace", "bs", "back"]),
    (KeyCode::Delete, &["Delete", "del"]),
    (KeyCode::Space, &["Space"]),
    (KeyCode::Up, &["Up", "arrowup"]),
    (KeyCode::Down, &["Down", "arrowdown"]),
    (KeyCode::Left, &["Left", "arrowleft"]),
    (KeyCode::Right, &["Right", "arrowright"]),
    (KeyCode::Home, &["Home"]),
    (KeyCode::End, &["End"]),
    (KeyCode::PageUp, &["PageUp", "pgup"]),
    (KeyCode::PageDown, &["PageDown", "pgdn", "pgdown"]),
];

impl KeyCode {
    /// Arrow keys and Tab, which an open suggestion list may claim
    pub fn navigation(self) -> Option<NavDirection> {
        match self {
            KeyCode::Up => Some(NavDirection::Up),
            KeyCode::Down => Some(NavDirection::Down),
            KeyCode::Left => Some(NavDirection::Left),
            KeyCode::Right => Some(NavDirection::Right),
            KeyCode::Tab => Some(NavDirection::Next),
            _ => None,
        }
    }

    /// Look up a named key, case-insensitively
    fn from_name(name: &str) -> Option<KeyCode> {
        NAMED_KEYS
            .iter()
            .find(|(_, names)| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            .map(|&(key, _)| key)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let KeyCode::Char(c) = self {
            return write!(f, "{}", c);
        }
        let name = NAMED_KEYS
            .iter()
            .find(|(key, _)| key == self)
            .and_then(|(_, names)| names.first())
            .copied()
            .unwrap_or("?");
        f.write_str(name)
    }
}

/// Direction forwarded to collaborators for navigation keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavDirection {
    Up,
    Down,
    Left,
    Right,
    /// Tab
    Next,
}

/// A single keystroke: a key with modifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Keystroke {
    pub key: KeyCode,
    pub mods: Modifiers,
}

impl Keystroke {
    pub const fn new(key: KeyCode, mods: Modifiers) -> Self {
        Self { key, mods }
    }

    /// Unmodified press of `key`
    pub const fn key(key: KeyCode) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Keystroke that types `c`. A space becomes [`KeyCode::Space`].
    pub fn char(c: char) -> Self {
        Self::key(if c == ' ' { KeyCode::Space } else { KeyCode::Char(c) })
    }

    /// The character this keystroke inserts, if it is plain text input
    pub fn text_char(&self) -> Option<char> {
        if self.mods.has_shortcut_modifier() {
            return None;
        }
        match self.key {
            KeyCode::Char(c) => Some(c),
            KeyCode::Space => Some(' '),
            _ => None,
        }
    }

    fn is_chord_z(&self) -> bool {
        matches!(self.key, KeyCode::Char(c) if c.eq_ignore_ascii_case(&'z'))
            && (self.mods.ctrl || self.mods.meta)
            && !self.mods.alt
    }

    /// Ctrl+Z or Cmd+Z, without Shift
    pub fn is_undo_chord(&self) -> bool {
        self.is_chord_z() && !self.mods.shift
    }

    /// Ctrl+Shift+Z or Cmd+Shift+Z. Never treated as undo.
    pub fn is_redo_chord(&self) -> bool {
        self.is_chord_z() && self.mods.shift
    }

    /// Ctrl+Space: ask collaborators to list every macro
    pub fn is_show_all_chord(&self) -> bool {
        self.key == KeyCode::Space && self.mods.ctrl && !self.mods.alt && !self.mods.meta
    }
}

impl fmt::Display for Keystroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.is_empty() {
            return write!(f, "{}", self.key);
        }
        write!(f, "{}+{}", self.mods, self.key)
    }
}

/// Errors that can occur when parsing key strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    InvalidKey(String),
}

impl fmt::Display for KeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyParseError::InvalidKey(k) => write!(f, "Invalid key: {}", k),
        }
    }
}

impl std::error::Error for KeyParseError {}

/// Parse a key string like "ctrl+shift+z" or "esc" into a Keystroke
pub fn parse_key_string(key_str: &str) -> Result<Keystroke, KeyParseError> {
    let invalid = |why: &str| KeyParseError::InvalidKey(format!("{}: {}", why, key_str));
    let mut mods = Modifiers::NONE;
    let mut key = None;

    for part in key_str.split('+') {
        let modifier = match part.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Some(Modifiers::CTRL),
            "shift" => Some(Modifiers::SHIFT),
            "alt" | "option" | "opt" => Some(Modifiers::ALT),
            "meta" | "super" | "win" => Some(Modifiers::META),
            "cmd" | "primary" => Some(Modifiers::PRIMARY),
            _ => None,
        };
        if let Some(m) = modifier {
            mods = mods | m;
            continue;
        }
        if key.is_some() {
            return Err(invalid("More than one key"));
        }

        let mut chars = part.chars();
        key = match (chars.next(), chars.next()) {
            (Some(' '), None) => Some(KeyCode::Space),
            (Some(c), None) => Some(KeyCode::Char(c)),
            _ => Some(KeyCode::from_name(part).ok_or_else(|| invalid("Unknown key"))?),
        };
    }

    key.map(|key| Keystroke::new(key, mods))
        .ok_or_else(|| invalid("No key"))
}
