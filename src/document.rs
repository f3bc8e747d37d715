//! Document access for the render scheduler.
//!
//! The scheduler never touches a concrete rendering environment. It talks to a
//! [`DocumentAdapter`], which can query marked elements, read and write their
//! content, and read the root element's language attribute.
//!
//! [`MemoryDocument`] is an in-process implementation used by the demo binary
//! and tests. It can be filled programmatically or parsed from simple markup.

use crate::error::DocumentError;
use regex::Regex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{OnceLock, PoisonError, RwLock};

/// Attribute that marks an element as translatable.
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "translateId";

/// Opaque handle to an element inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An element carrying the marker attribute, with the attribute's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedElement {
    pub id: ElementId,
    pub key: String,
}

/// Capabilities the scheduler needs from a rendering environment.
pub trait DocumentAdapter: Send + Sync {
    /// Elements carrying `attribute`, in document order.
    fn marked_elements(&self, attribute: &str) -> Vec<MarkedElement>;

    /// Current rendered content of an element.
    fn content(&self, element: ElementId) -> Result<String, DocumentError>;

    /// Replace the rendered content of an element.
    fn set_content(&self, element: ElementId, content: &str) -> Result<(), DocumentError>;

    /// The root element's `lang` attribute.
    ///
    /// `Ok(None)` when the root exists without one; `Err(MissingRoot)` when
    /// the document has no usable root element.
    fn root_language(&self) -> Result<Option<String>, DocumentError>;
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    content: String,
    attached: bool,
}

impl Node {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Default)]
struct Root {
    lang: Option<String>,
}

/// In-memory document tree (flat list of elements in document order).
#[derive(Debug)]
pub struct MemoryDocument {
    root: RwLock<Option<Root>>,
    nodes: RwLock<Vec<Node>>,
    writes: AtomicUsize,
}

static OPEN_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE_REGEX: OnceLock<Regex> = OnceLock::new();

impl MemoryDocument {
    /// An empty document with a root element and no `lang` attribute.
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Some(Root::default())),
            nodes: RwLock::new(Vec::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// A malformed document with no root element.
    pub fn without_root() -> Self {
        Self {
            root: RwLock::new(None),
            ..Self::new()
        }
    }

    pub fn with_root_language(self, lang: impl Into<String>) -> Self {
        self.set_root_language(Some(lang.into()));
        self
    }

    pub fn set_root_language(&self, lang: Option<String>) {
        let mut root = self.root.write().unwrap_or_else(PoisonError::into_inner);
        *root = Some(Root { lang });
    }

    /// Append an element and return its handle.
    pub fn push_element<'a, I>(&self, tag: &str, attributes: I, content: &str) -> ElementId
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        nodes.push(Node {
            tag: tag.to_string(),
            attributes: attributes
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            content: content.to_string(),
            attached: true,
        });
        ElementId(nodes.len() - 1)
    }

    /// Append an element marked with [`DEFAULT_MARKER_ATTRIBUTE`].
    pub fn push_marked(&self, tag: &str, key: &str, content: &str) -> ElementId {
        self.push_element(tag, [(DEFAULT_MARKER_ATTRIBUTE, key)], content)
    }

    /// Parse flat markup into a new document.
    pub fn parse(markup: &str) -> Self {
        let document = Self::new();
        document.append_markup(markup);
        document
    }

    /// Parse `markup` and append its elements.
    ///
    /// Recognizes opening tags with double-quoted attributes. An element's
    /// content runs up to the first matching closing tag, so nesting an
    /// element inside another of the same tag is not supported. The `<html>`
    /// tag only contributes its `lang` attribute.
    pub fn append_markup(&self, markup: &str) -> Vec<ElementId> {
        let open_tag = OPEN_TAG_REGEX.get_or_init(|| {
            Regex::new(r#"<([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s=>/]+(?:\s*=\s*"[^"]*")?)*)\s*/?>"#)
                .expect("open tag pattern is valid")
        });
        let attribute = ATTRIBUTE_REGEX.get_or_init(|| {
            Regex::new(r#"([^\s=>/]+)(?:\s*=\s*"([^"]*)")?"#).expect("attribute pattern is valid")
        });

        let mut added = Vec::new();
        for captures in open_tag.captures_iter(markup) {
            let (Some(whole), Some(tag)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let tag = tag.as_str();
            let attributes: Vec<(String, String)> = captures
                .get(2)
                .map(|attrs| {
                    attribute
                        .captures_iter(attrs.as_str())
                        .filter_map(|attr| {
                            let name = attr.get(1)?.as_str().to_string();
                            let value = attr.get(2).map(|v| v.as_str()).unwrap_or_default();
                            Some((name, value.to_string()))
                        })
                        .collect()
                })
                .unwrap_or_default();

            if tag.eq_ignore_ascii_case("html") {
                let lang = attributes
                    .iter()
                    .find(|(name, _)| name == "lang")
                    .map(|(_, value)| value.clone());
                self.set_root_language(lang);
                continue;
            }

            let rest = &markup[whole.end()..];
            let closing = format!("</{}>", tag);
            let content = rest.find(&closing).map(|end| &rest[..end]).unwrap_or_default();

            added.push(self.push_element(
                tag,
                attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                content,
            ));
        }
        added
    }

    /// Remove an element from the document. Its handle stays invalid.
    pub fn detach(&self, element: ElementId) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(node) = nodes.get_mut(element.0) {
            node.attached = false;
        }
    }

    pub fn tag(&self, element: ElementId) -> Option<String> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes
            .get(element.0)
            .filter(|node| node.attached)
            .map(|node| node.tag.clone())
    }

    /// Content of every attached element, in document order.
    pub fn contents(&self) -> Vec<String> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes
            .iter()
            .filter(|node| node.attached)
            .map(|node| node.content.clone())
            .collect()
    }

    /// Number of successful `set_content` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentAdapter for MemoryDocument {
    fn marked_elements(&self, attribute: &str) -> Vec<MarkedElement> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.attached)
            .filter_map(|(index, node)| {
                node.attribute(attribute).map(|key| MarkedElement {
                    id: ElementId(index),
                    key: key.to_string(),
                })
            })
            .collect()
    }

    fn content(&self, element: ElementId) -> Result<String, DocumentError> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes
            .get(element.0)
            .filter(|node| node.attached)
            .map(|node| node.content.clone())
            .ok_or(DocumentError::DetachedElement(element))
    }

    fn set_content(&self, element: ElementId, content: &str) -> Result<(), DocumentError> {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let node = nodes
            .get_mut(element.0)
            .filter(|node| node.attached)
            .ok_or(DocumentError::DetachedElement(element))?;
        node.content = content.to_string();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn root_language(&self) -> Result<Option<String>, DocumentError> {
        let root = self.root.read().unwrap_or_else(PoisonError::into_inner);
        root.as_ref()
            .map(|root| root.lang.clone())
            .ok_or(DocumentError::MissingRoot)
    }
}
