//! Headless typing host.
//!
//! [`TypingSession`] plays the part of an editor around a [`Detector`]: it
//! runs each key through `key_down`, applies the default edit when the key
//! passes through, then calls `input`. Time is simulated, advancing by a
//! fixed interval per keystroke, so timer behavior is reproducible.

use std::time::{Duration, Instant};

use crate::detector::{Detector, KeyOutcome};
use crate::keys::{KeyCode, Keystroke};
use crate::surface::{Selection, SurfaceRef};

/// Simulated delay between keystrokes; shorter than the confirm delay
pub const DEFAULT_KEY_INTERVAL: Duration = Duration::from_millis(50);

pub struct TypingSession {
    detector: Detector,
    surface: SurfaceRef,
    now: Instant,
    interval: Duration,
}

impl TypingSession {
    pub fn new(detector: Detector, surface: SurfaceRef) -> Self {
        Self {
            detector,
            surface,
            now: Instant::now(),
            interval: DEFAULT_KEY_INTERVAL,
        }
    }

    /// Set the simulated time between keystrokes (builder pattern)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut Detector {
        &mut self.detector
    }

    pub fn surface(&self) -> &SurfaceRef {
        &self.surface
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn text(&self) -> String {
        self.surface.borrow().text()
    }

    /// Give the session's surface focus
    pub fn focus(&mut self) {
        self.detector.focus(&self.surface, self.now);
    }

    /// Take focus away from the surface
    pub fn blur(&mut self) {
        self.detector.blur(&self.surface, self.now);
    }

    /// Press one key
    pub fn press(&mut self, key: Keystroke) -> KeyOutcome {
        self.now += self.interval;
        let outcome = self.detector.key_down(&self.surface, key, self.now);
        if outcome == KeyOutcome::PassThrough && apply_default(&self.surface, key) {
            self.detector.input(&self.surface, self.now);
        }
        outcome
    }

    /// Type every character of `text`; `'\n'` presses Enter
    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            let key = match c {
                '\n' => Keystroke::key(KeyCode::Enter),
                '\t' => Keystroke::key(KeyCode::Tab),
                c => Keystroke::char(c),
            };
            self.press(key);
        }
    }

    /// Let simulated time pass, firing due timers
    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
        self.detector.tick(self.now);
    }

    /// Run until no timer is pending
    pub fn settle(&mut self) {
        while let Some(deadline) = self.detector.next_deadline() {
            self.now = self.now.max(deadline);
            self.detector.tick(self.now);
        }
    }

    pub fn undo(&mut self) -> bool {
        self.detector.undo_last_replacement(&self.surface)
    }
}

/// Apply what a plain text control does for `key`. Returns whether the text
/// changed.
pub fn apply_default(surface: &SurfaceRef, key: Keystroke) -> bool {
    let mut s = surface.borrow_mut();
    let len = s.len_chars();
    let selection = s.selection().clamped(len);
    let caret = selection.cursor();

    let insert = match key.key {
        KeyCode::Enter if !key.mods.has_shortcut_modifier() => {
            if s.kind().is_single_line() {
                return false;
            }
            Some('\n')
        }
        _ => key.text_char(),
    };

    if let Some(c) = insert {
        let range = selection.range();
        if s.splice(range.clone(), &c.to_string()).is_err() {
            return false;
        }
        s.set_cursor(range.start + 1);
        return true;
    }

    let delete = match key.key {
        KeyCode::Backspace if !selection.is_collapsed() => Some(selection.range()),
        KeyCode::Backspace if caret > 0 => Some(caret - 1..caret),
        KeyCode::Delete if !selection.is_collapsed() => Some(selection.range()),
        KeyCode::Delete if caret < len => Some(caret..caret + 1),
        _ => None,
    };
    if let Some(range) = delete {
        let start = range.start;
        if s.splice(range, "").is_err() {
            return false;
        }
        s.set_cursor(start);
        return true;
    }

    let moved = match key.key {
        KeyCode::Left => Some(caret.saturating_sub(1)),
        KeyCode::Right => Some((caret + 1).min(len)),
        KeyCode::Home | KeyCode::Up | KeyCode::PageUp => Some(0),
        KeyCode::End | KeyCode::Down | KeyCode::PageDown => Some(len),
        _ => None,
    };
    if let Some(offset) = moved {
        s.set_selection(Selection::collapsed(offset));
    }
    false
}
