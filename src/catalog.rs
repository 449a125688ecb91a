//! Macro definitions and the trigger index used during detection.
//!
//! Catalog files are YAML or JSON, either a bare list of macros or a map with
//! a `macros` key:
//!
//! ```yaml
//! macros:
//!   - id: sig
//!     command: /sig
//!     text: "Best regards,\nHelge"
//!     html: "Best regards,<br><b>Helge</b>"
//!     content_type: html
//! ```

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// How a macro's expansion is meant to be rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Html,
}

/// A single text macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    pub id: String,
    /// Trigger string, with or without a trigger prefix
    pub command: String,
    /// Plain expansion, used by linear surfaces
    pub text: String,
    /// Structured expansion, used by rich surfaces when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, alias = "contentType")]
    pub content_type: ContentType,
}

impl Macro {
    /// Plain-text macro
    pub fn new(id: &str, command: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            command: command.to_string(),
            text: text.to_string(),
            html: None,
            content_type: ContentType::Text,
        }
    }

    /// Attach structured content (builder pattern)
    pub fn with_html(mut self, html: &str) -> Self {
        self.html = Some(html.to_string());
        self.content_type = ContentType::Html;
        self
    }

    pub fn has_structured_content(&self) -> bool {
        self.html.is_some()
    }
}

/// Root structure of a catalog file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped { macros: Vec<Macro> },
    List(Vec<Macro>),
}

/// Errors that can occur when loading a catalog
#[derive(Debug, Clone)]
pub enum CatalogError {
    IoError(String),
    ParseError(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::IoError(e) => write!(f, "IO error: {}", e),
            CatalogError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Load macros from a `.json`, `.yaml` or `.yml` file
pub fn load_macros_file(path: &Path) -> Result<Vec<Macro>, CatalogError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| CatalogError::IoError(e.to_string()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let macros = if is_json {
        parse_macros_json(&content)?
    } else {
        parse_macros_yaml(&content)?
    };
    tracing::info!("Loaded {} macros from {}", macros.len(), path.display());
    Ok(macros)
}

pub fn parse_macros_yaml(yaml: &str) -> Result<Vec<Macro>, CatalogError> {
    let file: CatalogFile =
        serde_yaml::from_str(yaml).map_err(|e| CatalogError::ParseError(e.to_string()))?;
    Ok(file.into_macros())
}

pub fn parse_macros_json(json: &str) -> Result<Vec<Macro>, CatalogError> {
    let file: CatalogFile =
        serde_json::from_str(json).map_err(|e| CatalogError::ParseError(e.to_string()))?;
    Ok(file.into_macros())
}

impl CatalogFile {
    fn into_macros(self) -> Vec<Macro> {
        match self {
            CatalogFile::Wrapped { macros } | CatalogFile::List(macros) => macros,
        }
    }
}

/// Macros indexed by their effective trigger string.
///
/// A command that already starts with a configured prefix is indexed as-is.
/// Any other command is indexed once per prefix as `prefix + command`.
#[derive(Debug, Clone, Default)]
pub struct MacroCatalog {
    macros: Vec<Macro>,
    by_trigger: BTreeMap<String, usize>,
    by_id: HashMap<String, usize>,
    max_trigger_len: usize,
}

impl MacroCatalog {
    pub fn new(macros: Vec<Macro>, prefixes: &[char]) -> Self {
        let mut by_trigger = BTreeMap::new();
        let mut by_id = HashMap::new();

        for (idx, m) in macros.iter().enumerate() {
            if m.command.is_empty() {
                tracing::warn!("Skipping macro '{}' with empty command", m.id);
                continue;
            }
            by_id.insert(m.id.clone(), idx);

            let has_prefix = m
                .command
                .chars()
                .next()
                .is_some_and(|c| prefixes.contains(&c));
            if has_prefix || prefixes.is_empty() {
                by_trigger.insert(m.command.clone(), idx);
            } else {
                for prefix in prefixes {
                    by_trigger.insert(format!("{}{}", prefix, m.command), idx);
                }
            }
        }

        tracing::debug!(
            "Indexed {} macros under {} triggers",
            by_id.len(),
            by_trigger.len()
        );

        let max_trigger_len = by_trigger
            .keys()
            .map(|t: &String| t.chars().count())
            .max()
            .unwrap_or(0);

        Self {
            macros,
            by_trigger,
            by_id,
            max_trigger_len,
        }
    }

    /// Rebuild the trigger index for a new prefix set
    pub fn reindex(&self, prefixes: &[char]) -> Self {
        Self::new(self.macros.clone(), prefixes)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Length in characters of the longest trigger
    pub fn max_trigger_len(&self) -> usize {
        self.max_trigger_len
    }

    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    pub fn get(&self, id: &str) -> Option<&Macro> {
        self.by_id.get(id).map(|&idx| &self.macros[idx])
    }

    /// Macro whose trigger is exactly `buffer`
    pub fn exact(&self, buffer: &str) -> Option<&Macro> {
        self.by_trigger.get(buffer).map(|&idx| &self.macros[idx])
    }

    /// Whether some trigger has `buffer` as a strict prefix
    pub fn has_longer(&self, buffer: &str) -> bool {
        self.by_trigger
            .range::<str, _>((Bound::Excluded(buffer), Bound::Unbounded))
            .next()
            .is_some_and(|(trigger, _)| trigger.starts_with(buffer))
    }

    /// Whether `text` is a prefix of (or equal to) some trigger
    pub fn is_prefix_of_any(&self, text: &str) -> bool {
        self.by_trigger
            .range::<str, _>((Bound::Included(text), Bound::Unbounded))
            .next()
            .is_some_and(|(trigger, _)| trigger.starts_with(text))
    }

    /// Triggers starting with `buffer`, in lexical order
    pub fn completions<'a>(&'a self, buffer: &'a str) -> impl Iterator<Item = (&'a str, &'a Macro)> {
        self.by_trigger
            .range::<str, _>((Bound::Included(buffer), Bound::Unbounded))
            .take_while(move |(trigger, _)| trigger.starts_with(buffer))
            .map(|(trigger, &idx)| (trigger.as_str(), &self.macros[idx]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MacroCatalog {
        MacroCatalog::new(
            vec![
                Macro::new("h", "/h", "Hi"),
                Macro::new("hello", "/hello", "Hello, World!"),
                Macro::new("addr", "addr", "1 Main St"),
            ],
            &['/', ';'],
        )
    }

    #[test]
    fn test_exact_and_prefixless_commands() {
        let c = catalog();
        assert_eq!(c.exact("/hello").map(|m| m.id.as_str()), Some("hello"));
        assert_eq!(c.exact("/addr").map(|m| m.id.as_str()), Some("addr"));
        assert_eq!(c.exact(";addr").map(|m| m.id.as_str()), Some("addr"));
        assert!(c.exact("/hel").is_none());
    }

    #[test]
    fn test_has_longer_is_strict() {
        let c = catalog();
        assert!(c.has_longer("/h"));
        assert!(c.has_longer("/hel"));
        assert_eq!(c.max_trigger_len(), 6);
        assert!(!c.has_longer("/hello"));
        assert!(!c.has_longer("/x"));
    }

    #[test]
    fn test_is_prefix_of_any_includes_equal() {
        let c = catalog();
        assert!(c.is_prefix_of_any("/hello"));
        assert!(c.is_prefix_of_any("/"));
        assert!(!c.is_prefix_of_any("/hellox"));
    }

    #[test]
    fn test_completions() {
        let c = catalog();
        let found: Vec<_> = c.completions("/h").map(|(t, _)| t).collect();
        assert_eq!(found, vec!["/h", "/hello"]);
    }

    #[test]
    fn test_empty_command_skipped() {
        let c = MacroCatalog::new(vec![Macro::new("bad", "", "x")], &['/']);
        assert!(c.is_empty());
        assert!(c.get("bad").is_none());
    }

    #[test]
    fn test_parse_yaml_wrapped_and_json_list() {
        let yaml = "macros:\n  - id: a\n    command: /a\n    text: A\n    html: <b>A</b>\n    content_type: html\n";
        let macros = parse_macros_yaml(yaml).unwrap();
        assert_eq!(macros[0].content_type, ContentType::Html);
        assert_eq!(macros[0].html.as_deref(), Some("<b>A</b>"));

        let json = r#"[{"id":"b","command":"/b","text":"B","contentType":"text"}]"#;
        let macros = parse_macros_json(json).unwrap();
        assert_eq!(macros[0].command, "/b");
        assert!(macros[0].html.is_none());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            parse_macros_json("{not json"),
            Err(CatalogError::ParseError(_))
        ));
    }
}
