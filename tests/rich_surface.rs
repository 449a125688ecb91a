//! Structured replacement in rich regions and marker-based undo.

mod common;

use std::time::Instant;

use common::{detector, key, rich_session};
use textmacro::surface::{shared, RichRegion, Selection};
use textmacro::{EngineConfig, KeyOutcome, SurfaceRef};

const SIG_MARKUP: &str = "<span data-macro=\"sig\">Regards,<br><b>Helge</b></span>";

// ============================================================================
// Structured insertion
// ============================================================================

#[test]
fn test_typed_command_becomes_marker() {
    let (mut session, region) = rich_session("<p>Thanks </p>");
    session.type_text("/sig");

    assert_eq!(
        region.borrow().to_markup(),
        format!("<p>Thanks {}</p>", SIG_MARKUP)
    );
    assert_eq!(session.text(), "Thanks Regards,\nHelge");
    assert_eq!(
        session.surface().borrow().selection(),
        Selection::collapsed(21)
    );
}

#[test]
fn test_marker_records_provenance() {
    let (mut session, region) = rich_session("");
    session.type_text("/sig");

    let region = region.borrow();
    let markers = region.document().markers();
    assert_eq!(markers.len(), 1);
    let meta = markers[0].1;
    assert_eq!(meta.macro_id, "sig");
    assert_eq!(meta.original_command, "/sig");
    assert!(meta.is_html);
    assert_eq!(session.detector().undo_history_len(), 1);
}

#[test]
fn test_macro_without_html_inserts_plain_text() {
    let (mut session, region) = rich_session("<p>Say </p>");
    session.type_text("/hello");
    assert_eq!(region.borrow().to_markup(), "<p>Say Hello, World!</p>");
    assert!(region.borrow().document().markers().is_empty());
}

#[test]
fn test_fully_covered_formatting_is_removed() {
    let region = shared(RichRegion::from_markup("Hi <i>/sig</i>"));
    let surface: SurfaceRef = region.clone();
    let mut d = detector(EngineConfig::default());

    assert!(d.insert_replacing_buffer(&surface, "sig", "/sig", Instant::now()));
    assert_eq!(region.borrow().to_markup(), format!("Hi {}", SIG_MARKUP));
}

#[test]
fn test_partially_covered_formatting_is_kept() {
    let region = shared(RichRegion::from_markup("<b>Hi /sig</b>"));
    let surface: SurfaceRef = region.clone();
    let mut d = detector(EngineConfig::default());

    assert!(d.insert_replacing_buffer(&surface, "sig", "/sig", Instant::now()));
    assert_eq!(
        region.borrow().to_markup(),
        format!("<b>Hi {}</b>", SIG_MARKUP)
    );
}

#[test]
fn test_multi_line_plain_text_uses_line_breaks() {
    let (mut session, region) = rich_session("<p>Ship to </p>");
    session.type_text("/addr");
    assert_eq!(
        region.borrow().to_markup(),
        "<p>Ship to 1 Main St<br>Springfield</p>"
    );
    assert_eq!(session.text(), "Ship to 1 Main St\nSpringfield");
}

#[test]
fn test_typing_after_marker_stays_outside_it() {
    let (mut session, region) = rich_session("<p>Thanks </p>");
    session.type_text("/sig and bye");
    assert_eq!(
        region.borrow().to_markup(),
        format!("<p>Thanks {} and bye</p>", SIG_MARKUP)
    );
}

// ============================================================================
// Marker undo
// ============================================================================

#[test]
fn test_undo_unwraps_marker() {
    let (mut session, region) = rich_session("<p>Thanks </p>");
    session.type_text("/sig");

    assert_eq!(session.press(key("ctrl+z")), KeyOutcome::Handled);
    assert_eq!(region.borrow().to_markup(), "<p>Thanks /sig</p>");
    assert_eq!(
        session.surface().borrow().selection(),
        Selection::collapsed(11)
    );
    assert_eq!(session.detector().undo_history_len(), 0);
}

#[test]
fn test_marker_undo_survives_earlier_edits() {
    let (mut session, _region) = rich_session("<p>Thanks </p>");
    session.type_text("/sig");
    session
        .surface()
        .borrow_mut()
        .splice(0..0, "Oh ")
        .unwrap();

    assert!(session.undo());
    assert_eq!(session.text(), "Oh Thanks /sig");
}

#[test]
fn test_markers_undo_newest_first() {
    let region = shared(RichRegion::from_markup("<p>/sig and /sig</p>").with_cursor(4));
    let surface: SurfaceRef = region.clone();
    let mut d = detector(EngineConfig::default());
    let now = Instant::now();

    assert!(d.insert_replacing_buffer(&surface, "sig", "/sig", now));
    let end = surface.borrow().len_chars();
    surface.borrow_mut().set_cursor(end);
    assert!(d.insert_replacing_buffer(&surface, "sig", "/sig", now));
    assert_eq!(region.borrow().document().markers().len(), 2);

    assert!(d.undo_last_replacement(&surface));
    assert_eq!(surface.borrow().text(), "Regards,\nHelge and /sig");
    assert!(d.undo_last_replacement(&surface));
    assert_eq!(surface.borrow().text(), "/sig and /sig");
    assert!(!d.undo_last_replacement(&surface));
}

#[test]
fn test_removed_marker_cannot_be_undone() {
    let (mut session, _region) = rich_session("");
    session.type_text("/sig");
    let len = session.surface().borrow().len_chars();
    session
        .surface()
        .borrow_mut()
        .splice(0..len, "gone")
        .unwrap();

    assert!(!session.undo());
    assert_eq!(session.text(), "gone");
    assert_eq!(session.detector().undo_history_len(), 0);
}

#[test]
fn test_marker_undo_keeps_text_typed_after_it() {
    let (mut session, _region) = rich_session("<p>Thanks </p>");
    session.type_text("/sig and bye");

    assert!(session.undo());
    assert_eq!(session.text(), "Thanks /sig and bye");
}

#[test]
fn test_macro_after_marker_undoes_separately() {
    let (mut session, region) = rich_session("");
    session.type_text("/sig /hello");
    assert_eq!(
        region.borrow().to_markup(),
        format!("{} Hello, World!", SIG_MARKUP)
    );

    assert!(session.undo());
    assert_eq!(session.text(), "Regards,\nHelge /hello");
    assert!(session.undo());
    assert_eq!(session.text(), "/sig /hello");
}
