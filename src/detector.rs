//! The detection engine.
//!
//! [`Detector`] wires the detection state machine, the ambiguity resolver and
//! the replacement engine together and is the only type hosts talk to.
//!
//! # Key handling
//!
//! Every key goes through two phases:
//!
//! 1. [`Detector::key_down`] runs before the host applies the key's default
//!    edit. Commits triggered by commit keys, fallback commits, navigation,
//!    Escape and undo happen here. The returned [`KeyOutcome`] says whether
//!    the host must suppress the default edit.
//! 2. [`Detector::input`] runs after the default edit landed. The buffer is
//!    extended or shortened here, re-checked against the surface text, and
//!    exact matches commit (or are parked behind the confirm timer).
//!
//! Timers never fire on their own. Hosts call [`Detector::tick`] when
//! [`Detector::next_deadline`] passes; every entry point also ticks first, so
//! a timer that came due before a key is handled before that key.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Instant;

use crate::catalog::{Macro, MacroCatalog};
use crate::config::EngineConfig;
use crate::detect::{
    ConfirmDecision, ConfirmScheduler, DetectionState, DetectorActions, TimerPurpose, TimerToken,
    Timers,
};
use crate::keys::{KeyCode, Keystroke};
use crate::replace::ReplacementEngine;
use crate::surface::{same_surface, Surface, SurfaceRef};

/// What the host should do with a key after [`Detector::key_down`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Apply the default edit, then call [`Detector::input`]
    PassThrough,
    /// Suppress the default edit
    Handled,
}

impl KeyOutcome {
    fn from_handled(handled: bool) -> Self {
        if handled {
            KeyOutcome::Handled
        } else {
            KeyOutcome::PassThrough
        }
    }

    pub fn is_handled(self) -> bool {
        self == KeyOutcome::Handled
    }
}

/// Key seen in `key_down` whose effect is evaluated in `input`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingInput {
    Char(char),
    Backspace,
}

pub struct Detector {
    config: EngineConfig,
    catalog: MacroCatalog,
    state: DetectionState,
    engine: ReplacementEngine,
    confirm: ConfirmScheduler,
    timers: Timers,
    actions: Box<dyn DetectorActions>,
    site: Option<String>,
    surface: Option<Weak<RefCell<dyn Surface>>>,
    pending_input: Option<PendingInput>,
    initialized: bool,
}

impl Detector {
    pub fn new(config: EngineConfig, actions: Box<dyn DetectorActions>) -> Self {
        Self {
            catalog: MacroCatalog::new(Vec::new(), &config.trigger_prefixes),
            state: DetectionState::inactive(),
            engine: ReplacementEngine::new(config.history_capacity),
            confirm: ConfirmScheduler::new(config.confirm_delay()),
            timers: Timers::new(),
            actions,
            site: None,
            surface: None,
            pending_input: None,
            initialized: false,
            config,
        }
    }

    /// Start handling keys. Until then every key passes through.
    pub fn initialize(&mut self) {
        self.initialized = true;
        tracing::info!(
            "Detector initialized with {} macros, prefixes {:?}",
            self.catalog.len(),
            self.config.trigger_prefixes
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Replace the macro catalog. An in-flight buffer is left as is.
    pub fn set_macros(&mut self, macros: Vec<Macro>) {
        self.catalog = MacroCatalog::new(macros, &self.config.trigger_prefixes);
        tracing::debug!("Catalog replaced: {} macros", self.catalog.len());
    }

    pub fn catalog(&self) -> &MacroCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration. Takes effect from the next key event.
    pub fn set_config(&mut self, config: EngineConfig) {
        if config.trigger_prefixes != self.config.trigger_prefixes {
            self.catalog = self.catalog.reindex(&config.trigger_prefixes);
        }
        self.engine
            .history_mut()
            .set_capacity(config.history_capacity);
        self.confirm.set_delay(config.confirm_delay());
        self.config = config;
        tracing::debug!("Config updated: {:?}", self.config);
    }

    /// Set the site the focused surface belongs to
    pub fn set_site(&mut self, site: Option<String>) {
        self.site = site;
    }

    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    fn is_disabled(&self) -> bool {
        self.site
            .as_deref()
            .is_some_and(|site| self.config.is_site_disabled(site))
    }

    pub fn state(&self) -> DetectionState {
        self.state.clone()
    }

    /// Stop all timers, drop detection state and clear every history entry
    pub fn destroy(&mut self) {
        self.timers.cancel_all();
        self.confirm.cancel(&mut self.timers);
        self.state.reset();
        self.engine.history_mut().clear_all();
        self.surface = None;
        self.pending_input = None;
        self.initialized = false;
        tracing::info!("Detector destroyed");
    }

    /// Earliest timer deadline, for hosts that schedule their own wake-ups
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Fire every timer due at `now`, earliest first
    pub fn tick(&mut self, now: Instant) {
        for token in self.timers.take_due(now) {
            match token.purpose {
                TimerPurpose::Confirm => self.fire_confirm(token, now),
                TimerPurpose::BlurCancel => {
                    tracing::debug!("Blur grace period elapsed");
                    self.cancel_detection();
                }
            }
        }
    }

    /// Focus moved to `surface`
    pub fn focus(&mut self, surface: &SurfaceRef, now: Instant) {
        self.tick(now);
        self.track(surface);
        self.timers.cancel_purpose(TimerPurpose::BlurCancel);
    }

    /// `surface` lost focus; detection is cancelled after a grace period
    pub fn blur(&mut self, surface: &SurfaceRef, now: Instant) {
        self.tick(now);
        let current = self
            .current_surface()
            .is_some_and(|cur| same_surface(&cur, surface));
        if current && self.state.is_active() {
            self.timers.schedule(
                TimerPurpose::BlurCancel,
                now,
                self.config.blur_cancel_delay(),
            );
        }
    }

    /// First phase of a key event, before the host's default edit
    pub fn key_down(&mut self, surface: &SurfaceRef, key: Keystroke, now: Instant) -> KeyOutcome {
        self.tick(now);
        self.pending_input = None;
        if !self.initialized {
            return KeyOutcome::PassThrough;
        }
        self.track(surface);

        if self.is_disabled() {
            self.cancel_detection();
            return KeyOutcome::PassThrough;
        }

        if key.is_redo_chord() {
            return KeyOutcome::PassThrough;
        }
        if key.is_undo_chord() {
            let handled = self.engine.history().has_history(surface)
                && self.undo_last_replacement(surface);
            return KeyOutcome::from_handled(handled);
        }
        if key.is_show_all_chord() {
            let position = self.buffer_position(surface);
            let buffer = self.state.buffer().to_string();
            return KeyOutcome::from_handled(self.actions.on_show_all_requested(&buffer, position));
        }

        if !surface.borrow().selection().is_collapsed() {
            self.cancel_detection();
            return KeyOutcome::PassThrough;
        }

        if self.state.is_active() {
            self.key_down_active(surface, key, now)
        } else {
            self.key_down_inactive(key);
            KeyOutcome::PassThrough
        }
    }

    fn key_down_inactive(&mut self, key: Keystroke) {
        self.pending_input = match key.key {
            KeyCode::Backspace => Some(PendingInput::Backspace),
            _ => key.text_char().map(PendingInput::Char),
        };
    }

    fn key_down_active(&mut self, surface: &SurfaceRef, key: Keystroke, now: Instant) -> KeyOutcome {
        if key.key == KeyCode::Escape {
            let handled = self.actions.on_cancel_requested();
            self.cancel_detection();
            return KeyOutcome::from_handled(handled);
        }
        if key.key == KeyCode::Backspace {
            self.pending_input = Some(PendingInput::Backspace);
            return KeyOutcome::PassThrough;
        }
        if key.mods.has_shortcut_modifier() {
            return KeyOutcome::PassThrough;
        }

        let commit_key = self.config.commit_key_mode && self.config.is_commit_key(key.key);

        if let Some(direction) = key.key.navigation() {
            if self.actions.on_navigation_requested(direction) {
                return KeyOutcome::Handled;
            }
            if commit_key {
                return self.commit_key_pressed(surface, now);
            }
            self.cancel_detection();
            return KeyOutcome::PassThrough;
        }
        if commit_key {
            return self.commit_key_pressed(surface, now);
        }

        match key.key {
            KeyCode::Enter => {
                if self.confirm.pending().is_some() {
                    let buffer = self.state.buffer().to_string();
                    return KeyOutcome::from_handled(self.commit(surface, &buffer, None, now));
                }
                let buffer = self.state.buffer().to_string();
                if self.actions.on_commit_requested(&buffer) {
                    return KeyOutcome::Handled;
                }
                self.cancel_detection();
                KeyOutcome::PassThrough
            }
            KeyCode::Home | KeyCode::End | KeyCode::PageUp | KeyCode::PageDown => {
                self.cancel_detection();
                KeyOutcome::PassThrough
            }
            _ => {
                if let Some(c) = key.text_char() {
                    self.char_down(surface, c, now);
                }
                KeyOutcome::PassThrough
            }
        }
    }

    /// A character is about to be typed while detecting
    fn char_down(&mut self, surface: &SurfaceRef, c: char, now: Instant) {
        let parked = self
            .confirm
            .pending()
            .is_some_and(|p| p.buffer == self.state.buffer());

        if parked {
            let mut extended = self.state.buffer().to_string();
            extended.push(c);
            if c.is_whitespace() || !self.catalog.is_prefix_of_any(&extended) {
                // The parked match can no longer grow: commit it, then let
                // the character land after the expansion.
                let buffer = self.state.buffer().to_string();
                tracing::debug!("Fallback commit of '{}' on '{}'", buffer, c);
                self.commit(surface, &buffer, None, now);
                self.pending_input = Some(PendingInput::Char(c));
                return;
            }
        }

        if c.is_whitespace() {
            self.cancel_detection();
            return;
        }
        self.pending_input = Some(PendingInput::Char(c));
    }

    fn commit_key_pressed(&mut self, surface: &SurfaceRef, now: Instant) -> KeyOutcome {
        let buffer = self.state.buffer().to_string();
        if self.catalog.exact(&buffer).is_some() {
            return KeyOutcome::from_handled(self.commit(surface, &buffer, None, now));
        }
        if self.actions.on_commit_requested(&buffer) {
            return KeyOutcome::Handled;
        }
        self.cancel_detection();
        KeyOutcome::PassThrough
    }

    /// Second phase of a key event, after the host's default edit. Also call
    /// it for edits that did not come from a key (paste, IME) so the buffer
    /// is re-checked against the surface.
    pub fn input(&mut self, surface: &SurfaceRef, now: Instant) {
        self.tick(now);
        let pending = self.pending_input.take();
        if !self.initialized || self.is_disabled() {
            return;
        }
        self.track(surface);

        if !surface.borrow().selection().is_collapsed() {
            self.cancel_detection();
            return;
        }

        match pending {
            Some(PendingInput::Char(c)) => self.char_input(surface, c, now),
            Some(PendingInput::Backspace) => self.backspace_input(surface),
            None => {
                if self.state.is_active() && !self.buffer_matches(surface) {
                    tracing::debug!("Surface changed under the buffer");
                    self.cancel_detection();
                }
            }
        }
    }

    fn char_input(&mut self, surface: &SurfaceRef, c: char, now: Instant) {
        if self.state.is_active() {
            let mut extended = self.state.buffer().to_string();
            extended.push(c);
            let restart = self.config.is_prefix(c) && !self.catalog.is_prefix_of_any(&extended);
            if restart {
                self.confirm.cancel(&mut self.timers);
                self.state.start(c);
            } else {
                self.state.push(c);
            }

            if !self.buffer_matches(surface) {
                self.cancel_detection();
                return;
            }
            let position = self.buffer_position(surface);
            if restart {
                tracing::debug!("Detection restarted at '{}'", c);
                self.actions.on_detection_started(self.state.buffer(), position);
            } else {
                tracing::trace!("Buffer now '{}'", self.state.buffer());
                self.actions.on_detection_updated(self.state.buffer(), position);
            }
        } else if self.config.is_prefix(c) {
            self.state.start(c);
            if !self.buffer_matches(surface) {
                self.state.reset();
                return;
            }
            let position = self.buffer_position(surface);
            tracing::debug!("Detection started at offset {}", position);
            self.actions.on_detection_started(self.state.buffer(), position);
        } else {
            return;
        }

        self.evaluate(surface, now);
    }

    /// Commit or park an exact match (immediate mode only)
    fn evaluate(&mut self, surface: &SurfaceRef, now: Instant) {
        if self.config.commit_key_mode {
            return;
        }
        let buffer = self.state.buffer().to_string();
        if self.catalog.exact(&buffer).is_none() {
            if self.confirm.pending().is_some_and(|p| p.buffer != buffer) {
                self.confirm.cancel(&mut self.timers);
            }
            return;
        }

        let selection = surface.borrow().selection();
        let decision = self
            .confirm
            .decide(&self.catalog, &buffer, selection, &mut self.timers, now);
        if decision == ConfirmDecision::CommitNow {
            self.commit(surface, &buffer, None, now);
        }
    }

    fn backspace_input(&mut self, surface: &SurfaceRef) {
        if !self.state.is_active() {
            self.rederive(surface);
            return;
        }

        self.state.pop();
        self.confirm.cancel(&mut self.timers);
        let starts_with_prefix = self
            .state
            .buffer()
            .chars()
            .next()
            .is_some_and(|c| self.config.is_prefix(c));
        if !starts_with_prefix || !self.buffer_matches(surface) {
            self.cancel_detection();
            return;
        }
        let position = self.buffer_position(surface);
        self.actions.on_detection_updated(self.state.buffer(), position);
    }

    /// Recover a buffer after an erase: the nearest prefix inside the
    /// whitespace-delimited run that ends at the caret.
    fn rederive(&mut self, surface: &SurfaceRef) {
        let max = self.catalog.max_trigger_len();
        if max == 0 {
            return;
        }
        let tail = {
            let s = surface.borrow();
            let caret = s.selection().cursor();
            s.slice(caret.saturating_sub(max)..caret)
        };

        let run_start = tail
            .char_indices()
            .filter(|(_, c)| c.is_whitespace())
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        let run = &tail[run_start..];
        let Some(idx) = run.rfind(|c: char| self.config.is_prefix(c)) else {
            return;
        };
        let candidate = &run[idx..];
        if !self.catalog.is_prefix_of_any(candidate) {
            return;
        }

        self.state.resume(candidate.to_string());
        let position = self.buffer_position(surface);
        tracing::debug!("Recovered buffer '{}' at offset {}", candidate, position);
        self.actions.on_detection_started(self.state.buffer(), position);
    }

    fn fire_confirm(&mut self, token: TimerToken, now: Instant) {
        let Some(pending) = self.confirm.expire(token) else {
            return;
        };
        let still_exact = self.state.is_active()
            && self.state.buffer() == pending.buffer
            && self.catalog.exact(&pending.buffer).is_some();
        if !still_exact {
            tracing::trace!("Confirm for '{}' expired after state moved on", pending.buffer);
            return;
        }
        let Some(surface) = self.current_surface() else {
            self.cancel_detection();
            return;
        };

        tracing::debug!("Confirm timer fired for '{}'", pending.buffer);
        let caret_ok =
            surface.borrow().selection().is_collapsed() && self.buffer_matches(&surface);
        let end = if caret_ok {
            None
        } else {
            Some(pending.selection.cursor())
        };
        self.commit(&surface, &pending.buffer, end, now);
    }

    /// Replace `buffer` with its macro. `end` overrides the caret as the
    /// offset the command ends at.
    fn commit(&mut self, surface: &SurfaceRef, buffer: &str, end: Option<usize>, now: Instant) -> bool {
        let Some(m) = self.catalog.exact(buffer).cloned() else {
            return false;
        };
        self.confirm.cancel(&mut self.timers);

        let result = match end {
            Some(end) => self
                .engine
                .replace_command_at(surface, buffer, end, &m, now),
            None => self.engine.replace_command(surface, buffer, &m, now),
        };
        match result {
            Ok(_) => {
                tracing::info!("Committed '{}' as macro '{}'", buffer, m.id);
                self.finish_commit(&m.id);
                true
            }
            Err(e) => {
                tracing::debug!("Commit of '{}' failed: {}", buffer, e);
                self.cancel_detection();
                false
            }
        }
    }

    fn finish_commit(&mut self, macro_id: &str) {
        self.confirm.cancel(&mut self.timers);
        self.timers.cancel_purpose(TimerPurpose::BlurCancel);
        self.state.reset();
        self.actions.on_macro_committed(macro_id);
    }

    /// Cancel detection. Safe to call when nothing is active.
    fn cancel_detection(&mut self) {
        self.confirm.cancel(&mut self.timers);
        self.timers.cancel_purpose(TimerPurpose::BlurCancel);
        if self.state.reset() {
            tracing::debug!("Detection cancelled");
            self.actions.on_detection_cancelled();
        }
    }

    fn current_surface(&self) -> Option<SurfaceRef> {
        self.surface.as_ref().and_then(Weak::upgrade)
    }

    /// Remember `surface` as the one being typed into. Switching surfaces
    /// cancels detection on the old one.
    fn track(&mut self, surface: &SurfaceRef) {
        let same = self
            .current_surface()
            .is_some_and(|cur| same_surface(&cur, surface));
        if same {
            return;
        }
        if self.state.is_active() {
            tracing::debug!("Surface switched while detecting");
            self.cancel_detection();
        }
        self.timers.cancel_purpose(TimerPurpose::BlurCancel);
        self.surface = Some(Rc::downgrade(surface));
    }

    /// Whether the text right before the caret is the buffer
    fn buffer_matches(&self, surface: &SurfaceRef) -> bool {
        let s = surface.borrow();
        let caret = s.selection().cursor();
        let n = self.state.len_chars();
        caret >= n && caret <= s.len_chars() && s.slice(caret - n..caret) == self.state.buffer()
    }

    /// Offset where the buffer starts
    fn buffer_position(&self, surface: &SurfaceRef) -> usize {
        let caret = surface.borrow().selection().cursor();
        caret.saturating_sub(self.state.len_chars())
    }

    /// Undo the last replacement on `surface`
    pub fn undo_last_replacement(&mut self, surface: &SurfaceRef) -> bool {
        match self.engine.history_mut().undo(surface) {
            Ok(Some(undone)) => {
                tracing::info!("Undid replacement ({:?}), caret at {}", undone.kind, undone.cursor);
                if self
                    .current_surface()
                    .is_some_and(|cur| same_surface(&cur, surface))
                {
                    self.cancel_detection();
                }
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::debug!("Undo did not apply: {}", e);
                false
            }
        }
    }

    /// Clear one surface's history, or all of it with `None`
    pub fn clear_undo_history(&mut self, surface: Option<&SurfaceRef>) {
        self.engine.history_mut().clear(surface);
    }

    pub fn undo_history_len(&self) -> usize {
        self.engine.history().len()
    }

    pub fn has_undo_history(&self, surface: &SurfaceRef) -> bool {
        self.engine.history().has_history(surface)
    }

    /// Commit `macro_id` over `buffer`, which must end at the caret. Used by
    /// pickers that choose a macro for a partially typed command.
    pub fn insert_replacing_buffer(
        &mut self,
        surface: &SurfaceRef,
        macro_id: &str,
        buffer: &str,
        now: Instant,
    ) -> bool {
        self.tick(now);
        let Some(m) = self.catalog.get(macro_id).cloned() else {
            tracing::debug!("Unknown macro '{}'", macro_id);
            return false;
        };
        match self.engine.replace_command(surface, buffer, &m, now) {
            Ok(_) => {
                self.finish_commit(&m.id);
                true
            }
            Err(e) => {
                tracing::debug!("Insert of '{}' over '{}' failed: {}", m.id, buffer, e);
                false
            }
        }
    }

    /// Insert `macro_id` at the caret without replacing anything
    pub fn insert_at_cursor(&mut self, surface: &SurfaceRef, macro_id: &str, now: Instant) -> bool {
        self.tick(now);
        let Some(m) = self.catalog.get(macro_id).cloned() else {
            tracing::debug!("Unknown macro '{}'", macro_id);
            return false;
        };
        match self.engine.insert_at_cursor(surface, &m, now) {
            Ok(_) => {
                self.finish_commit(&m.id);
                true
            }
            Err(e) => {
                tracing::debug!("Insert of '{}' failed: {}", m.id, e);
                false
            }
        }
    }
}
