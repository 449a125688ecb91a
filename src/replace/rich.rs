//! Structured replacement inside a rich document.
//!
//! The replaced range is removed through [`RichDocument::replace_range`],
//! which resolves both boundaries before mutating and drops ancestors the
//! range covers entirely. The macro's markup is parsed into nodes and wrapped
//! in a [`Marker`] so it can later be undone as a unit.

use std::ops::Range;

use crate::catalog::{ContentType, Macro};
use crate::error::ReplaceError;
use crate::surface::{parse_markup, Marker, MarkerMetadata, Node, RichDocument};

/// Result of a rich insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RichInsertion {
    /// Offset just past the marker
    pub end: usize,
    /// Logical text of the inserted content
    pub text: String,
}

/// Build the marker node for `html`
pub fn marker_node(m: &Macro, html: &str, original_command: &str, stamp: u64) -> Node {
    Node::Marker(Marker {
        meta: MarkerMetadata {
            macro_id: m.id.clone(),
            original_command: original_command.to_string(),
            inserted_at: stamp,
            is_html: m.content_type == ContentType::Html,
        },
        children: parse_markup(html),
    })
}

pub(super) fn replace_rich(
    doc: &mut RichDocument,
    range: Range<usize>,
    marker: Node,
) -> Result<RichInsertion, ReplaceError> {
    let text = RichDocument::from_nodes(vec![marker.clone()]).text();
    let end = doc.replace_range(range, vec![marker])?;
    Ok(RichInsertion { end, text })
}
