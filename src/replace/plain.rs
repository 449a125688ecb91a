//! Plain replacement over the logical text of any surface.

use std::ops::Range;

use crate::error::ReplaceError;
use crate::surface::Surface;

/// Flatten text for a single-line surface.
///
/// Every run of whitespace, line breaks included, becomes one space. The
/// ends are not trimmed so spacing around the insertion is preserved.
pub fn normalize_single_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Text as it will actually land on `surface`
pub fn prepare_text(surface: &dyn Surface, text: &str) -> String {
    if surface.kind().is_single_line() {
        normalize_single_line(text)
    } else {
        text.to_string()
    }
}

/// Splice `text` over `range`. Returns the offset just past the insertion.
pub(super) fn replace_plain(
    surface: &mut dyn Surface,
    range: Range<usize>,
    text: &str,
) -> Result<usize, ReplaceError> {
    let start = range.start;
    surface.splice(range, text)?;
    Ok(start + text.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::TextField;

    #[test]
    fn test_normalize_collapses_breaks_and_runs() {
        assert_eq!(normalize_single_line("Best,\r\n\n  Helge"), "Best, Helge");
        assert_eq!(normalize_single_line("a\tb"), "a b");
    }

    #[test]
    fn test_normalize_keeps_edge_spacing() {
        assert_eq!(normalize_single_line("\nhi\n"), " hi ");
    }

    #[test]
    fn test_prepare_depends_on_kind() {
        let single = TextField::single_line("");
        let multi = TextField::multi_line("");
        assert_eq!(prepare_text(&single, "a\nb"), "a b");
        assert_eq!(prepare_text(&multi, "a\nb"), "a\nb");
    }

    #[test]
    fn test_replace_plain_returns_end() {
        let mut field = TextField::multi_line("say /hi now");
        let end = replace_plain(&mut field, 4..7, "héllo").unwrap();
        assert_eq!(field.text(), "say héllo now");
        assert_eq!(end, 9);
    }
}
