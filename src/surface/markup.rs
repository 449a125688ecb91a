//! Inline markup fragments for rich replacements.
//!
//! Lenient tag-soup parsing of the small HTML subset macros use for their
//! structured content: formatting elements, `<br>`, and the common entities.
//! Parsing never fails. Stray closing tags are dropped and unclosed elements
//! are closed at the end of the fragment.

use super::tree::{Element, Node};

/// Parse a markup fragment into nodes
pub fn parse_markup(input: &str) -> Vec<Node> {
    let mut parser = FragmentParser::default();
    let mut rest = input;

    while !rest.is_empty() {
        let tag_end = if rest.starts_with('<') {
            rest.find('>')
        } else {
            None
        };

        match tag_end {
            Some(end) => {
                parser.flush_text();
                parser.tag(&rest[1..end]);
                rest = &rest[end + 1..];
            }
            None => {
                let first = rest.chars().next().map_or(1, char::len_utf8);
                let next = rest[first..]
                    .find('<')
                    .map(|i| i + first)
                    .unwrap_or(rest.len());
                parser.raw_text.push_str(&rest[..next]);
                rest = &rest[next..];
            }
        }
    }

    parser.finish()
}

#[derive(Default)]
struct FragmentParser {
    root: Vec<Node>,
    open: Vec<Element>,
    raw_text: String,
}

impl FragmentParser {
    fn push(&mut self, node: Node) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn flush_text(&mut self) {
        if self.raw_text.is_empty() {
            return;
        }
        let text = decode_entities(&std::mem::take(&mut self.raw_text));
        self.push(Node::Text(text));
    }

    fn tag(&mut self, inner: &str) {
        let inner = inner.trim();
        if inner.starts_with('!') || inner.starts_with('?') || inner.is_empty() {
            return;
        }

        if let Some(name) = inner.strip_prefix('/') {
            self.close(&name.trim().to_ascii_lowercase());
            return;
        }

        let self_closing = inner.ends_with('/');
        let inner = inner.trim_end_matches('/').trim_end();
        let (name, attr_src) = match inner.find(char::is_whitespace) {
            Some(i) => (&inner[..i], &inner[i..]),
            None => (inner, ""),
        };
        let name = name.to_ascii_lowercase();

        match name.as_str() {
            "br" => self.push(Node::LineBreak),
            "img" | "hr" | "input" | "meta" | "link" | "wbr" => {}
            _ => {
                let mut element = Element::new(&name, Vec::new());
                element.attrs = parse_attrs(attr_src);
                if self_closing {
                    self.push(Node::Element(element));
                } else {
                    self.open.push(element);
                }
            }
        }
    }

    fn close(&mut self, name: &str) {
        if !self.open.iter().any(|e| e.tag == name) {
            return;
        }
        while let Some(element) = self.open.pop() {
            let done = element.tag == name;
            self.push(Node::Element(element));
            if done {
                break;
            }
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_text();
        while let Some(element) = self.open.pop() {
            self.push(Node::Element(element));
        }
        self.root
    }
}

fn parse_attrs(src: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = src.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '=' {
                break;
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            match chars.peek().copied() {
                Some(quote @ ('"' | '\'')) => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == quote {
                            break;
                        }
                        value.push(c);
                    }
                }
                _ => {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
            }
        }
        attrs.push((name.to_ascii_lowercase(), decode_entities(&value)));
    }

    attrs
}

fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Escape text for inclusion in markup
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize nodes back to markup. Markers become `<span data-macro="ID">`.
pub(crate) fn write_markup(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(s) => out.push_str(&escape_text(s)),
            Node::LineBreak => out.push_str("<br>"),
            Node::Element(e) => {
                out.push('<');
                out.push_str(&e.tag);
                for (name, value) in &e.attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
                }
                out.push('>');
                write_nodes(&e.children, out);
                out.push_str(&format!("</{}>", e.tag));
            }
            Node::Marker(m) => {
                out.push_str(&format!(
                    "<span data-macro=\"{}\">",
                    escape_attr(&m.meta.macro_id)
                ));
                write_nodes(&m.children, out);
                out.push_str("</span>");
            }
        }
    }
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
