//! Node tree behind rich-text regions.
//!
//! The logical text of a tree is the concatenation of its text leaves, with
//! `LineBreak` counting as one `'\n'`. Elements and markers add no characters
//! of their own. Every structural lookup goes through [`RichDocument::locate`],
//! which maps a character offset to a leaf path. That keeps the replacement
//! logic testable against synthetic trees.

use std::ops::Range;

use crate::error::ReplaceError;

/// Provenance attached to a marker node wrapping a rich replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMetadata {
    pub macro_id: String,
    /// Trigger text the marker replaced; restored on undo
    pub original_command: String,
    /// Monotonic insertion stamp; higher is newer
    pub inserted_at: u64,
    pub is_html: bool,
}

/// Layout-transparent wrapper around inserted rich content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub meta: MarkerMetadata,
    pub children: Vec<Node>,
}

/// A formatting or block element (`b`, `em`, `p`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &str, children: Vec<Node>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            children,
        }
    }

    /// Add an attribute (builder pattern)
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    LineBreak,
    Element(Element),
    Marker(Marker),
}

impl Node {
    pub fn text(s: &str) -> Self {
        Node::Text(s.to_string())
    }

    /// Nodes for plain `text`, with each `'\n'` as a `LineBreak`
    pub fn plain(text: &str) -> Vec<Node> {
        let mut nodes = Vec::new();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                nodes.push(Node::LineBreak);
            }
            if !line.is_empty() {
                nodes.push(Node::text(line));
            }
        }
        nodes
    }

    pub fn element(tag: &str, children: Vec<Node>) -> Self {
        Node::Element(Element::new(tag, children))
    }

    /// Length of this node's logical text in characters
    pub fn text_len(&self) -> usize {
        match self {
            Node::Text(s) => s.chars().count(),
            Node::LineBreak => 1,
            Node::Element(e) => e.children.iter().map(Node::text_len).sum(),
            Node::Marker(m) => m.children.iter().map(Node::text_len).sum(),
        }
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Node::Text(s) => out.push_str(s),
            Node::LineBreak => out.push('\n'),
            Node::Element(e) => e.children.iter().for_each(|c| c.write_text(out)),
            Node::Marker(m) => m.children.iter().for_each(|c| c.write_text(out)),
        }
    }

    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Element(e) => Some(&e.children),
            Node::Marker(m) => Some(&m.children),
            Node::Text(_) | Node::LineBreak => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Element(e) => Some(&mut e.children),
            Node::Marker(m) => Some(&mut m.children),
            Node::Text(_) | Node::LineBreak => None,
        }
    }
}

/// Which leaf owns an offset that sits exactly on a boundary between two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// The leaf starting at the offset (start of a range)
    Forward,
    /// The leaf ending at the offset (end of a range, caret position)
    Backward,
}

/// A leaf node path plus a character offset inside that leaf.
///
/// An offset on the outer edge of a marker resolves to the marker itself,
/// with `offset` either 0 or the marker's length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: Vec<usize>,
    pub offset: usize,
}

/// Root of a rich-text tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichDocument {
    children: Vec<Node>,
}

impl RichDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Parse an inline markup fragment into a document
    pub fn from_markup(markup: &str) -> Self {
        Self::from_nodes(super::markup::parse_markup(markup))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        self.children.iter().for_each(|c| c.write_text(&mut out));
        out
    }

    pub fn len_chars(&self) -> usize {
        self.children.iter().map(Node::text_len).sum()
    }

    pub fn to_markup(&self) -> String {
        super::markup::write_markup(&self.children)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (&last, parents) = path.split_last()?;
        let mut nodes = &self.children[..];
        for &i in parents {
            nodes = nodes.get(i)?.children()?;
        }
        nodes.get(last)
    }

    fn siblings_mut(&mut self, parent: &[usize]) -> Option<&mut Vec<Node>> {
        let mut nodes = &mut self.children;
        for &i in parent {
            nodes = nodes.get_mut(i)?.children_mut()?;
        }
        Some(nodes)
    }

    /// Logical offset at which the node at `path` starts
    pub fn offset_of(&self, path: &[usize]) -> Option<usize> {
        let mut nodes = &self.children[..];
        let mut offset = 0;
        for &i in path {
            let node = nodes.get(i)?;
            offset += nodes[..i].iter().map(Node::text_len).sum::<usize>();
            nodes = node.children().unwrap_or(&[]);
        }
        Some(offset)
    }

    /// Resolve a logical offset to the leaf that holds it.
    ///
    /// Returns `None` when no leaf covers the offset (empty tree, offset past
    /// the end, or a tree shape that disagrees with its own lengths).
    pub fn locate(&self, offset: usize, bias: Bias) -> Option<Location> {
        let mut path = Vec::new();
        locate_in(&self.children, 0, offset, bias, &mut path)
    }

    /// Replace `range` of the logical text with `content`.
    ///
    /// Both boundaries are resolved before anything is touched, so a failed
    /// lookup leaves the tree unchanged. Ancestors that the range covers
    /// entirely are removed together with their text, and `content` takes
    /// the place of the first covered node. Returns the offset just past the
    /// inserted content.
    pub fn replace_range(
        &mut self,
        range: Range<usize>,
        content: Vec<Node>,
    ) -> Result<usize, ReplaceError> {
        if range.start > range.end || range.end > self.len_chars() {
            return Err(ReplaceError::InvalidRange);
        }
        let inserted: usize = content.iter().map(Node::text_len).sum();

        if range.is_empty() {
            self.insert_at(range.start, content)?;
            return Ok(range.start + inserted);
        }

        let start = self
            .locate(range.start, Bias::Forward)
            .ok_or(ReplaceError::StructuralLookup)?;
        let end = self
            .locate(range.end, Bias::Backward)
            .ok_or(ReplaceError::StructuralLookup)?;

        // End first: it never precedes the start leaf, so the start path stays valid.
        self.split_at(&end);
        self.split_at(&start);

        let mut pending = Some(content);
        remove_covered(&mut self.children, 0, &range, &mut pending);
        if let Some(content) = pending {
            self.insert_at(range.start, content)?;
        }
        Ok(range.start + inserted)
    }

    /// Insert nodes at a caret offset, inside the formatting of the leaf
    /// that ends there. A marker ending there gets the nodes as siblings.
    fn insert_at(&mut self, offset: usize, content: Vec<Node>) -> Result<(), ReplaceError> {
        let (parent, index) = self.insertion_point(offset);
        let siblings = self
            .siblings_mut(&parent)
            .ok_or(ReplaceError::StructuralLookup)?;
        let index = index.min(siblings.len());
        siblings.splice(index..index, content);
        Ok(())
    }

    fn insertion_point(&mut self, offset: usize) -> (Vec<usize>, usize) {
        let backward = if offset > 0 {
            self.locate(offset, Bias::Backward)
        } else {
            None
        };
        let found = backward.or_else(|| self.locate(offset, Bias::Forward));

        let Some(loc) = found else {
            return (Vec::new(), self.children.len());
        };
        let Some((&idx, parent)) = loc.path.split_last() else {
            return (Vec::new(), self.children.len());
        };
        if loc.offset == 0 {
            return (parent.to_vec(), idx);
        }
        self.split_at(&loc);
        (parent.to_vec(), idx + 1)
    }

    /// Split a text leaf so that `loc.offset` falls on a node boundary
    fn split_at(&mut self, loc: &Location) {
        let Some((&idx, parent)) = loc.path.split_last() else {
            return;
        };
        let Some(siblings) = self.siblings_mut(parent) else {
            return;
        };
        if let Some(Node::Text(text)) = siblings.get_mut(idx) {
            let count = text.chars().count();
            if loc.offset > 0 && loc.offset < count {
                let byte = text
                    .char_indices()
                    .nth(loc.offset)
                    .map(|(b, _)| b)
                    .unwrap_or(text.len());
                let tail = text.split_off(byte);
                siblings.insert(idx + 1, Node::Text(tail));
            }
        }
    }

    /// All markers in document order, with their paths
    pub fn markers(&self) -> Vec<(Vec<usize>, &MarkerMetadata)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        collect_markers(&self.children, &mut path, &mut out);
        out
    }

    /// The most recently inserted marker
    pub fn latest_marker(&self) -> Option<(Vec<usize>, &MarkerMetadata)> {
        self.markers()
            .into_iter()
            .max_by_key(|(_, meta)| meta.inserted_at)
    }

    pub fn find_marker(&self, inserted_at: u64) -> Option<Vec<usize>> {
        self.markers()
            .into_iter()
            .find(|(_, meta)| meta.inserted_at == inserted_at)
            .map(|(path, _)| path)
    }

    /// Replace the marker at `path` with a text node holding its original
    /// command. Returns the offset just past the restored text.
    pub fn unwrap_marker_to_text(&mut self, path: &[usize]) -> Option<usize> {
        let start = self.offset_of(path)?;
        let (&idx, parent) = path.split_last()?;
        let siblings = self.siblings_mut(parent)?;
        let command = match siblings.get(idx)? {
            Node::Marker(m) => m.meta.original_command.clone(),
            _ => return None,
        };
        let restored = command.chars().count();
        siblings[idx] = Node::Text(command);
        Some(start + restored)
    }
}

fn locate_in(
    nodes: &[Node],
    base: usize,
    offset: usize,
    bias: Bias,
    path: &mut Vec<usize>,
) -> Option<Location> {
    let mut pos = base;
    for (i, node) in nodes.iter().enumerate() {
        let end = pos + node.text_len();
        let hit = match bias {
            Bias::Forward => pos <= offset && offset < end,
            Bias::Backward => pos < offset && offset <= end,
        };
        if hit {
            path.push(i);
            // A marker is a unit at its edges: nothing typed beside it goes inside
            let marker_edge = matches!(node, Node::Marker(_)) && (offset == pos || offset == end);
            match node.children().filter(|_| !marker_edge) {
                None => {
                    return Some(Location {
                        path: path.clone(),
                        offset: offset - pos,
                    })
                }
                Some(children) => {
                    if let Some(found) = locate_in(children, pos, offset, bias, path) {
                        return Some(found);
                    }
                }
            }
            path.pop();
        }
        pos = end;
    }
    None
}

/// Remove every node that `range` covers entirely. The first such node is
/// replaced by `pending` content. Positions are in pre-removal coordinates.
fn remove_covered(
    children: &mut Vec<Node>,
    base: usize,
    range: &Range<usize>,
    pending: &mut Option<Vec<Node>>,
) {
    let mut pos = base;
    let mut i = 0;
    while i < children.len() {
        let len = children[i].text_len();
        let node_start = pos;
        let node_end = pos + len;
        pos = node_end;

        if len > 0 && range.start <= node_start && node_end <= range.end {
            match pending.take() {
                Some(content) => {
                    let n = content.len();
                    children.splice(i..=i, content);
                    i += n;
                }
                None => {
                    children.remove(i);
                }
            }
            continue;
        }

        let overlaps = node_start < range.end && range.start < node_end;
        if overlaps {
            if let Some(kids) = children[i].children_mut() {
                let had_children = !kids.is_empty();
                remove_covered(kids, node_start, range, pending);
                if had_children && kids.is_empty() {
                    children.remove(i);
                    continue;
                }
            }
        }
        i += 1;
    }
}

fn collect_markers<'a>(
    nodes: &'a [Node],
    path: &mut Vec<usize>,
    out: &mut Vec<(Vec<usize>, &'a MarkerMetadata)>,
) {
    for (i, node) in nodes.iter().enumerate() {
        path.push(i);
        if let Node::Marker(m) = node {
            out.push((path.clone(), &m.meta));
        }
        if let Some(children) = node.children() {
            collect_markers(children, path, out);
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: &str, command: &str, stamp: u64, children: Vec<Node>) -> Node {
        Node::Marker(Marker {
            meta: MarkerMetadata {
                macro_id: id.to_string(),
                original_command: command.to_string(),
                inserted_at: stamp,
                is_html: true,
            },
            children,
        })
    }

    fn doc() -> RichDocument {
        // "Hi <b>bold /sig</b>!"
        RichDocument::from_nodes(vec![
            Node::text("Hi "),
            Node::element("b", vec![Node::text("bold /sig")]),
            Node::text("!"),
        ])
    }

    #[test]
    fn test_text_flattens_leaves() {
        let d = RichDocument::from_nodes(vec![
            Node::text("a"),
            Node::LineBreak,
            Node::element("i", vec![Node::text("b")]),
        ]);
        assert_eq!(d.text(), "a\nb");
        assert_eq!(d.len_chars(), 3);
    }

    #[test]
    fn test_locate_biases_on_boundary() {
        let d = doc();
        // Offset 3 sits between "Hi " and "bold /sig"
        let fwd = d.locate(3, Bias::Forward).unwrap();
        assert_eq!(fwd.path, vec![1, 0]);
        assert_eq!(fwd.offset, 0);

        let back = d.locate(3, Bias::Backward).unwrap();
        assert_eq!(back.path, vec![0]);
        assert_eq!(back.offset, 3);
    }

    #[test]
    fn test_locate_out_of_bounds() {
        assert!(doc().locate(99, Bias::Backward).is_none());
        assert!(RichDocument::new().locate(0, Bias::Forward).is_none());
    }

    #[test]
    fn test_replace_inside_formatting_keeps_ancestor() {
        let mut d = doc();
        let end = d
            .replace_range(8..12, vec![Node::text("Regards")])
            .unwrap();
        assert_eq!(d.text(), "Hi bold Regards!");
        assert_eq!(end, 15);
        assert_eq!(d.to_markup(), "Hi <b>bold Regards</b>!");
    }

    #[test]
    fn test_fully_covered_wrapper_is_removed() {
        let mut d = RichDocument::from_nodes(vec![
            Node::text("x "),
            Node::element("b", vec![Node::element("i", vec![Node::text("/sig")])]),
        ]);
        d.replace_range(2..6, vec![Node::text("Y")]).unwrap();
        assert_eq!(d.children(), &[Node::text("x "), Node::text("Y")]);
    }

    #[test]
    fn test_range_spanning_siblings() {
        let mut d = RichDocument::from_nodes(vec![
            Node::element("b", vec![Node::text("ab")]),
            Node::element("i", vec![Node::text("cd")]),
        ]);
        d.replace_range(1..3, vec![Node::text("X")]).unwrap();
        assert_eq!(d.text(), "aXd");
        assert_eq!(d.to_markup(), "<b>aX</b><i>d</i>");
    }

    #[test]
    fn test_empty_range_inserts_at_caret() {
        let mut d = doc();
        let end = d.replace_range(5..5, vec![Node::text("++")]).unwrap();
        assert_eq!(end, 7);
        assert_eq!(d.to_markup(), "Hi <b>bo++ld /sig</b>!");
    }

    #[test]
    fn test_invalid_range_leaves_tree_untouched() {
        let mut d = doc();
        let before = d.clone();
        assert_eq!(
            d.replace_range(4..40, vec![Node::text("x")]),
            Err(ReplaceError::InvalidRange)
        );
        assert_eq!(d, before);
    }

    #[test]
    fn test_latest_marker_and_unwrap() {
        let mut d = RichDocument::from_nodes(vec![
            marker("a", "/a", 1, vec![Node::text("AAA")]),
            Node::text(" "),
            Node::element("p", vec![marker("b", "/b", 2, vec![Node::text("BB")])]),
        ]);
        let (path, meta) = d.latest_marker().unwrap();
        assert_eq!(meta.macro_id, "b");
        assert_eq!(path, vec![2, 0]);

        let cursor = d.unwrap_marker_to_text(&path).unwrap();
        assert_eq!(d.text(), "AAA /b");
        assert_eq!(cursor, 6);
        assert_eq!(d.markers().len(), 1);
    }

    #[test]
    fn test_offset_of_nested_path() {
        let d = doc();
        assert_eq!(d.offset_of(&[1, 0]), Some(3));
        assert_eq!(d.offset_of(&[2]), Some(12));
        assert_eq!(d.offset_of(&[7]), None);
    }

    #[test]
    fn test_locate_stops_at_marker_edges() {
        // "a" + marker "BB" + "c"
        let d = RichDocument::from_nodes(vec![
            Node::text("a"),
            marker("b", "/b", 1, vec![Node::element("b", vec![Node::text("BB")])]),
            Node::text("c"),
        ]);
        let back = d.locate(3, Bias::Backward).unwrap();
        assert_eq!(back.path, vec![1]);
        assert_eq!(back.offset, 2);

        let fwd = d.locate(1, Bias::Forward).unwrap();
        assert_eq!(fwd.path, vec![1]);
        assert_eq!(fwd.offset, 0);

        let inside = d.locate(2, Bias::Backward).unwrap();
        assert_eq!(inside.path, vec![1, 0, 0]);
    }

    #[test]
    fn test_insert_after_marker_stays_outside() {
        let mut d = RichDocument::from_nodes(vec![Node::element(
            "p",
            vec![
                Node::text("Hi "),
                marker("b", "/b", 1, vec![Node::element("b", vec![Node::text("BB")])]),
            ],
        )]);
        d.replace_range(5..5, vec![Node::text("!")]).unwrap();
        assert_eq!(d.text(), "Hi BB!");

        let path = d.find_marker(1).unwrap();
        d.unwrap_marker_to_text(&path).unwrap();
        assert_eq!(d.text(), "Hi /b!");
    }

    #[test]
    fn test_insert_before_leading_marker() {
        let mut d = RichDocument::from_nodes(vec![marker("b", "/b", 1, vec![Node::text("BB")])]);
        d.replace_range(0..0, vec![Node::text(">")]).unwrap();
        assert_eq!(d.children()[0], Node::text(">"));
        assert_eq!(d.text(), ">BB");
    }

    #[test]
    fn test_plain_nodes_split_lines() {
        assert_eq!(
            Node::plain("a\n\nb"),
            vec![Node::text("a"), Node::LineBreak, Node::LineBreak, Node::text("b")]
        );
        assert!(Node::plain("").is_empty());
    }
}
