//! Detection state machine and ambiguity resolution, driven through
//! [`TypingSession`] the way a host would drive the detector.

mod common;

use std::time::Duration;

use common::{
    commit_key_config, key, plain_session, recorded_session, session_on, Event, RecordingActions,
};
use textmacro::surface::{shared, Selection, TextField};
use textmacro::{CommitKey, EngineConfig, KeyOutcome, NavDirection, SurfaceRef};

// ============================================================================
// Buffer tracking
// ============================================================================

#[test]
fn test_prefix_starts_detection() {
    let mut session = plain_session("");
    session.type_text("/");
    let state = session.detector().state();
    assert!(state.is_active());
    assert_eq!(state.buffer(), "/");
}

#[test]
fn test_buffer_preserves_case() {
    let mut session = plain_session("");
    session.type_text("/HeL");
    assert_eq!(session.detector().state().buffer(), "/HeL");
    assert_eq!(session.text(), "/HeL");
}

#[test]
fn test_plain_characters_do_not_start_detection() {
    let mut session = plain_session("");
    session.type_text("hello");
    assert!(!session.detector().state().is_active());
    assert_eq!(session.text(), "hello");
}

#[test]
fn test_whitespace_cancels_detection() {
    let mut session = plain_session("");
    session.type_text("/he ");
    assert!(!session.detector().state().is_active());
    assert_eq!(session.text(), "/he ");
}

#[test]
fn test_prefix_inside_buffer_restarts_detection() {
    let mut session = plain_session("");
    session.type_text("/zz/");
    assert_eq!(session.detector().state().buffer(), "/");

    session.type_text("hello");
    assert_eq!(session.text(), "/zzHello, World!");
}

#[test]
fn test_command_without_prefix_is_reachable_with_prefix() {
    let mut session = plain_session("");
    session.type_text("/brb");
    assert_eq!(session.text(), "be right back");
}

#[test]
fn test_callbacks_report_buffer_start() {
    let (mut session, log) = recorded_session(EngineConfig::default(), RecordingActions::new(), "ab ");
    session.type_text("/z");

    let events = log.borrow();
    assert_eq!(events[0], Event::Started("/".to_string(), 3));
    assert_eq!(events[1], Event::Updated("/z".to_string(), 3));
}

// ============================================================================
// Immediate mode and ambiguity
// ============================================================================

#[test]
fn test_unambiguous_match_commits_immediately() {
    let mut session = plain_session("");
    session.type_text("/hello");
    assert_eq!(session.text(), "Hello, World!");
    assert!(!session.detector().state().is_active());
    assert_eq!(session.detector().undo_history_len(), 1);
}

#[test]
fn test_typing_after_commit_lands_after_expansion() {
    let mut session = plain_session("");
    session.type_text("/hello ");
    assert_eq!(session.text(), "Hello, World! ");
}

#[test]
fn test_ambiguous_match_waits_for_timer() {
    let mut session = plain_session("");
    session.type_text("/h");
    assert_eq!(session.text(), "/h");
    assert!(session.detector().next_deadline().is_some());

    session.advance(Duration::from_millis(100));
    assert_eq!(session.text(), "/h");

    session.settle();
    assert_eq!(session.text(), "Hi");
    assert!(!session.detector().state().is_active());
}

#[test]
fn test_continuing_typing_cancels_pending_confirm() {
    let mut session = plain_session("");
    session.type_text("/he");
    assert_eq!(session.detector().next_deadline(), None);

    session.settle();
    assert_eq!(session.text(), "/he");
    assert!(session.detector().state().is_active());
}

#[test]
fn test_whitespace_forces_fallback_commit() {
    let mut session = plain_session("");
    session.type_text("/h ");
    assert_eq!(session.text(), "Hi ");
    assert_eq!(session.detector().next_deadline(), None);
}

#[test]
fn test_non_matching_continuation_forces_fallback_commit() {
    let mut session = plain_session("");
    session.type_text("/hx");
    assert_eq!(session.text(), "Hix");
}

#[test]
fn test_enter_commits_parked_match() {
    let mut session = plain_session("");
    session.type_text("/h");
    assert_eq!(session.press(key("enter")), KeyOutcome::Handled);
    assert_eq!(session.text(), "Hi");
}

#[test]
fn test_confirm_delay_follows_config() {
    let config = EngineConfig {
        confirm_delay_ms: 1000,
        ..Default::default()
    };
    let mut session = session_on(config, shared(TextField::multi_line("")));
    session.type_text("/h");
    session.advance(Duration::from_millis(600));
    assert_eq!(session.text(), "/h");
    session.advance(Duration::from_millis(500));
    assert_eq!(session.text(), "Hi");
}

#[test]
fn test_parked_commit_keeps_moved_caret() {
    let mut session = plain_session("x ");
    session.type_text("/h");
    session.surface().borrow_mut().set_cursor(0);

    session.settle();
    assert_eq!(session.text(), "x Hi");
    assert_eq!(session.surface().borrow().selection(), Selection::collapsed(0));
}

// ============================================================================
// Commit-key mode
// ============================================================================

#[test]
fn test_commit_key_mode_waits_for_commit_key() {
    let mut session = session_on(commit_key_config(), shared(TextField::multi_line("")));
    session.type_text("/hello");
    assert_eq!(session.text(), "/hello");
    assert_eq!(session.detector().next_deadline(), None);

    assert_eq!(session.press(key("space")), KeyOutcome::Handled);
    assert_eq!(session.text(), "Hello, World!");
}

#[test]
fn test_commit_key_mode_commits_strict_prefix() {
    let mut session = session_on(commit_key_config(), shared(TextField::multi_line("")));
    session.type_text("/h");
    assert_eq!(session.press(key("enter")), KeyOutcome::Handled);
    assert_eq!(session.text(), "Hi");
}

#[test]
fn test_configured_commit_keys() {
    let config = EngineConfig {
        commit_keys: vec![CommitKey::Tab],
        ..commit_key_config()
    };
    let mut session = session_on(config, shared(TextField::multi_line("")));
    session.type_text("/hello");
    assert_eq!(session.press(key("tab")), KeyOutcome::Handled);
    assert_eq!(session.text(), "Hello, World!");

    session.type_text(" /h");
    session.press(key("space"));
    assert_eq!(session.text(), "Hello, World! /h ");
}

#[test]
fn test_commit_key_without_match_cancels() {
    let mut session = session_on(commit_key_config(), shared(TextField::multi_line("")));
    session.type_text("/zz");
    assert_eq!(session.press(key("space")), KeyOutcome::PassThrough);
    assert_eq!(session.text(), "/zz ");
    assert!(!session.detector().state().is_active());
}

#[test]
fn test_commit_request_handled_by_collaborator() {
    let actions = RecordingActions {
        handle_commit: true,
        ..Default::default()
    };
    let (mut session, log) = recorded_session(commit_key_config(), actions, "");
    session.type_text("/hel");

    assert_eq!(session.press(key("space")), KeyOutcome::Handled);
    assert_eq!(session.detector().state().buffer(), "/hel");
    assert!(log
        .borrow()
        .contains(&Event::CommitRequested("/hel".to_string())));

    let surface = session.surface().clone();
    let now = session.now();
    assert!(session
        .detector_mut()
        .insert_replacing_buffer(&surface, "hello", "/hel", now));
    assert_eq!(session.text(), "Hello, World!");
    assert!(!session.detector().state().is_active());
    assert_eq!(log.borrow().last(), Some(&Event::Committed("hello".to_string())));
}

// ============================================================================
// Cancellation and navigation
// ============================================================================

#[test]
fn test_escape_cancels_detection() {
    let (mut session, log) = recorded_session(EngineConfig::default(), RecordingActions::new(), "");
    session.type_text("/he");

    assert_eq!(session.press(key("esc")), KeyOutcome::PassThrough);
    assert!(!session.detector().state().is_active());
    assert_eq!(session.text(), "/he");

    let events = log.borrow();
    let n = events.len();
    assert_eq!(events[n - 2], Event::CancelRequested);
    assert_eq!(events[n - 1], Event::Cancelled);
}

#[test]
fn test_escape_handled_by_collaborator() {
    let actions = RecordingActions {
        handle_cancel: true,
        ..Default::default()
    };
    let (mut session, _log) = recorded_session(EngineConfig::default(), actions, "");
    session.type_text("/he");
    assert_eq!(session.press(key("esc")), KeyOutcome::Handled);
    assert!(!session.detector().state().is_active());
}

#[test]
fn test_navigation_handled_by_collaborator() {
    let actions = RecordingActions {
        handle_navigation: true,
        ..Default::default()
    };
    let (mut session, log) = recorded_session(EngineConfig::default(), actions, "");
    session.type_text("/he");

    assert_eq!(session.press(key("down")), KeyOutcome::Handled);
    assert_eq!(session.detector().state().buffer(), "/he");
    assert!(log.borrow().contains(&Event::Navigation(NavDirection::Down)));
}

#[test]
fn test_unhandled_navigation_cancels() {
    let mut session = plain_session("");
    session.type_text("/he");
    assert_eq!(session.press(key("left")), KeyOutcome::PassThrough);
    assert!(!session.detector().state().is_active());
    assert_eq!(session.surface().borrow().selection(), Selection::collapsed(2));
}

#[test]
fn test_selection_cancels_detection() {
    let mut session = plain_session("");
    session.type_text("/he");
    session
        .surface()
        .borrow_mut()
        .set_selection(Selection::new(0, 2));

    session.press(key("x"));
    assert!(!session.detector().state().is_active());
    assert_eq!(session.text(), "xe");
}

#[test]
fn test_external_edit_under_buffer_cancels() {
    let mut session = plain_session("");
    session.type_text("/he");
    {
        let mut s = session.surface().borrow_mut();
        s.splice(0..3, "paste").unwrap();
        s.set_cursor(5);
    }
    let surface = session.surface().clone();
    let now = session.now();
    session.detector_mut().input(&surface, now);
    assert!(!session.detector().state().is_active());
}

#[test]
fn test_show_all_chord() {
    let actions = RecordingActions {
        handle_show_all: true,
        ..Default::default()
    };
    let (mut session, log) = recorded_session(EngineConfig::default(), actions, "x ");
    session.type_text("/s");

    assert_eq!(session.press(key("ctrl+space")), KeyOutcome::Handled);
    assert!(log.borrow().contains(&Event::ShowAll("/s".to_string(), 2)));
    assert_eq!(session.text(), "x /s");
}

// ============================================================================
// Backspace
// ============================================================================

#[test]
fn test_backspace_shrinks_buffer_without_commit() {
    let mut session = plain_session("");
    session.type_text("/he");

    session.press(key("backspace"));
    assert_eq!(session.detector().state().buffer(), "/h");
    assert_eq!(session.text(), "/h");
    assert_eq!(session.detector().next_deadline(), None);

    session.press(key("backspace"));
    assert_eq!(session.detector().state().buffer(), "/");
}

#[test]
fn test_backspace_over_prefix_cancels() {
    let (mut session, log) = recorded_session(EngineConfig::default(), RecordingActions::new(), "");
    session.type_text("/");
    session.press(key("backspace"));
    assert!(!session.detector().state().is_active());
    assert_eq!(log.borrow().last(), Some(&Event::Cancelled));
}

#[test]
fn test_backspace_recovers_buffer_after_cancel() {
    let mut session = plain_session("");
    session.type_text("/hel ");
    assert!(!session.detector().state().is_active());

    session.press(key("backspace"));
    assert_eq!(session.detector().state().buffer(), "/hel");

    session.type_text("lo");
    assert_eq!(session.text(), "Hello, World!");
}

#[test]
fn test_backspace_recovery_needs_known_trigger() {
    let mut session = plain_session("see a/zz ");
    session.press(key("backspace"));
    assert!(!session.detector().state().is_active());
    assert_eq!(session.text(), "see a/zz");
}

// ============================================================================
// Focus and surfaces
// ============================================================================

#[test]
fn test_blur_cancels_after_grace_period() {
    let mut session = plain_session("");
    session.type_text("/he");
    session.blur();

    session.advance(Duration::from_millis(100));
    assert!(session.detector().state().is_active());

    session.advance(Duration::from_millis(100));
    assert!(!session.detector().state().is_active());
}

#[test]
fn test_refocus_keeps_detection() {
    let mut session = plain_session("");
    session.type_text("/he");
    session.blur();
    session.advance(Duration::from_millis(100));
    session.focus();

    session.advance(Duration::from_millis(500));
    assert_eq!(session.detector().state().buffer(), "/he");
}

#[test]
fn test_focusing_other_surface_cancels() {
    let mut session = plain_session("");
    session.type_text("/he");

    let other: SurfaceRef = shared(TextField::multi_line(""));
    let now = session.now();
    session.detector_mut().focus(&other, now);
    assert!(!session.detector().state().is_active());
}

#[test]
fn test_disabled_site_passes_keys_through() {
    let config = EngineConfig {
        disabled_sites: vec!["example.com".to_string()],
        ..Default::default()
    };
    let mut session = session_on(config, shared(TextField::multi_line("")));
    session
        .detector_mut()
        .set_site(Some("mail.example.com".to_string()));

    session.type_text("/hello");
    assert_eq!(session.text(), "/hello");
    assert!(!session.detector().state().is_active());

    session.detector_mut().set_site(Some("example.org".to_string()));
    session.type_text(" /hello");
    assert_eq!(session.text(), "/hello Hello, World!");
}

#[test]
fn test_destroy_stops_detection() {
    let mut session = plain_session("");
    session.type_text("/h");
    session.detector_mut().destroy();

    assert!(!session.detector().is_initialized());
    assert_eq!(session.detector().next_deadline(), None);
    session.type_text("ello");
    assert_eq!(session.text(), "/hello");
}
