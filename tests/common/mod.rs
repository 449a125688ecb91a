//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use textmacro::keys::parse_key_string;
use textmacro::surface::shared;
use textmacro::{
    Detector, DetectorActions, EngineConfig, Keystroke, Macro, NavDirection, NoopActions,
    RichRegion, SurfaceRef, TextField, TypingSession,
};

/// Everything a [`RecordingActions`] saw, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(String, usize),
    Updated(String, usize),
    Cancelled,
    Committed(String),
    CommitRequested(String),
    Navigation(NavDirection),
    CancelRequested,
    ShowAll(String, usize),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// Collaborator that records every callback and handles the requests it is
/// told to handle
#[derive(Debug, Clone, Default)]
pub struct RecordingActions {
    pub events: EventLog,
    pub handle_commit: bool,
    pub handle_navigation: bool,
    pub handle_cancel: bool,
    pub handle_show_all: bool,
}

impl RecordingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> EventLog {
        self.events.clone()
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl DetectorActions for RecordingActions {
    fn on_detection_started(&mut self, buffer: &str, position: usize) {
        self.push(Event::Started(buffer.to_string(), position));
    }

    fn on_detection_updated(&mut self, buffer: &str, position: usize) {
        self.push(Event::Updated(buffer.to_string(), position));
    }

    fn on_detection_cancelled(&mut self) {
        self.push(Event::Cancelled);
    }

    fn on_macro_committed(&mut self, macro_id: &str) {
        self.push(Event::Committed(macro_id.to_string()));
    }

    fn on_commit_requested(&mut self, buffer: &str) -> bool {
        self.push(Event::CommitRequested(buffer.to_string()));
        self.handle_commit
    }

    fn on_navigation_requested(&mut self, direction: NavDirection) -> bool {
        self.push(Event::Navigation(direction));
        self.handle_navigation
    }

    fn on_cancel_requested(&mut self) -> bool {
        self.push(Event::CancelRequested);
        self.handle_cancel
    }

    fn on_show_all_requested(&mut self, buffer: &str, position: usize) -> bool {
        self.push(Event::ShowAll(buffer.to_string(), position));
        self.handle_show_all
    }
}

/// `/h` is a strict prefix of `/hello`; `brb` has no prefix of its own
pub fn sample_macros() -> Vec<Macro> {
    vec![
        Macro::new("h", "/h", "Hi"),
        Macro::new("hello", "/hello", "Hello, World!"),
        Macro::new("sig", "/sig", "Regards,\nHelge").with_html("Regards,<br><b>Helge</b>"),
        Macro::new("addr", "/addr", "1 Main St\nSpringfield"),
        Macro::new("brb", "brb", "be right back"),
    ]
}

pub fn detector_with(config: EngineConfig, actions: Box<dyn DetectorActions>) -> Detector {
    let mut detector = Detector::new(config, actions);
    detector.set_macros(sample_macros());
    detector.initialize();
    detector
}

pub fn detector(config: EngineConfig) -> Detector {
    detector_with(config, Box::new(NoopActions))
}

pub fn commit_key_config() -> EngineConfig {
    EngineConfig {
        commit_key_mode: true,
        ..Default::default()
    }
}

/// Multi-line field session with the caret at the end of `text`
pub fn plain_session(text: &str) -> TypingSession {
    session_on(EngineConfig::default(), shared(TextField::multi_line(text)))
}

pub fn single_line_session(text: &str) -> TypingSession {
    session_on(EngineConfig::default(), shared(TextField::single_line(text)))
}

pub fn session_on(config: EngineConfig, surface: SurfaceRef) -> TypingSession {
    let mut session = TypingSession::new(detector(config), surface);
    session.focus();
    session
}

/// Session over a recording collaborator
pub fn recorded_session(
    config: EngineConfig,
    actions: RecordingActions,
    text: &str,
) -> (TypingSession, EventLog) {
    let log = actions.log();
    let surface: SurfaceRef = shared(TextField::multi_line(text));
    let mut session = TypingSession::new(detector_with(config, Box::new(actions)), surface);
    session.focus();
    (session, log)
}

/// Rich region session, returning the typed handle for markup checks
pub fn rich_session(markup: &str) -> (TypingSession, Rc<RefCell<RichRegion>>) {
    let region = shared(RichRegion::from_markup(markup));
    let session = session_on(EngineConfig::default(), region.clone());
    (session, region)
}

/// Parse a key name like "esc" or "ctrl+z"
pub fn key(name: &str) -> Keystroke {
    parse_key_string(name).unwrap()
}
