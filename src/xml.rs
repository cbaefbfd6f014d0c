// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Owned XML tree.
//!
//! Deployment descriptors are small documents that get mutated in place, so
//! they are held as a plain owned tree instead of an event stream. Parsing
//! and serialization are delegated to [`quick_xml`] through the [`reader`]
//! and [`writer`] submodules.
//!
//! # Namespaces
//!
//! Namespace prefixes are resolved once at parse time. Each [`Element`]
//! remembers its local name, the prefix it was written with, and the
//! namespace URI that prefix resolved to. Namespace declarations stay
//! ordinary attributes, so a document written back out keeps the
//! declarations it was read with.
//!
//! # Whitespace
//!
//! Text is trimmed on read and the writer re-indents on output. Two trees
//! are equal when their markup is equal modulo formatting whitespace.

pub mod reader;
pub mod writer;

pub use reader::parse_document;
pub use writer::write_document;

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io,
};

/// Parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    doctype: Option<DocType>,
    doctype_at: usize,
    prolog: Vec<Node>,
    root: Element,
}

impl Document {
    /// Construct new document around root element.
    pub fn new(root: Element) -> Self {
        Self {
            doctype: None,
            doctype_at: 0,
            prolog: Vec::new(),
            root,
        }
    }

    /// Attach document type declaration.
    pub fn with_doctype(mut self, doctype: DocType) -> Self {
        self.doctype = Some(doctype);
        self
    }

    pub fn doctype(&self) -> Option<&DocType> {
        self.doctype.as_ref()
    }

    pub fn set_doctype(&mut self, doctype: Option<DocType>) {
        self.doctype = doctype;
    }

    /// Number of prolog nodes that precede the document type declaration.
    pub fn doctype_position(&self) -> usize {
        self.doctype_at.min(self.prolog.len())
    }

    pub(crate) fn set_doctype_position(&mut self, index: usize) {
        self.doctype_at = index;
    }

    /// Comments and processing instructions found before the root element.
    pub fn prolog(&self) -> &[Node] {
        &self.prolog
    }

    pub(crate) fn prolog_mut(&mut self) -> &mut Vec<Node> {
        &mut self.prolog
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }
}

impl Display for Document {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut buffer = Vec::new();
        write_document(self, &mut buffer).map_err(|_| std::fmt::Error)?;
        fmt.write_str(String::from_utf8_lossy(&buffer).as_ref())
    }
}

/// Document type declaration.
///
/// Only the parts descriptors care about are modeled: the root name, and
/// the public and system identifiers used to detect DTD based dialects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocType {
    name: String,
    public_id: Option<String>,
    system_id: Option<String>,
    internal_subset: Option<String>,
}

impl DocType {
    /// Construct public document type declaration.
    pub fn public(
        name: impl Into<String>,
        public_id: impl Into<String>,
        system_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            public_id: Some(public_id.into()),
            system_id: Some(system_id.into()),
            internal_subset: None,
        }
    }

    /// Parse the content of a `<!DOCTYPE ...>` declaration.
    ///
    /// Content starts at the root name, i.e., the `DOCTYPE` keyword has
    /// already been stripped.
    pub fn parse(content: &str) -> Self {
        let content = content.trim();
        let (name, mut rest) = content
            .split_once(char::is_whitespace)
            .unwrap_or((content, ""));
        let mut public_id = None;
        let mut system_id = None;

        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("PUBLIC") {
            let (public, after) = take_quoted(after);
            let (system, after) = take_quoted(after);
            public_id = public;
            system_id = system;
            rest = after;
        } else if let Some(after) = rest.strip_prefix("SYSTEM") {
            let (system, after) = take_quoted(after);
            system_id = system;
            rest = after;
        }

        let rest = rest.trim();
        let internal_subset = (!rest.is_empty()).then(|| rest.to_string());

        Self {
            name: name.to_string(),
            public_id,
            system_id,
            internal_subset,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }
}

impl Display for DocType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.name)?;
        match (&self.public_id, &self.system_id) {
            (Some(public), Some(system)) => write!(fmt, " PUBLIC \"{public}\" \"{system}\"")?,
            (Some(public), None) => write!(fmt, " PUBLIC \"{public}\"")?,
            (None, Some(system)) => write!(fmt, " SYSTEM \"{system}\"")?,
            (None, None) => {}
        }
        if let Some(subset) = &self.internal_subset {
            write!(fmt, " {subset}")?;
        }

        Ok(())
    }
}

fn take_quoted(input: &str) -> (Option<String>, &str) {
    let input = input.trim_start();
    let Some(quote) = input.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return (None, input);
    };

    let body = &input[1..];
    match body.find(quote) {
        Some(end) => (Some(body[..end].to_string()), &body[end + 1..]),
        None => (Some(body.to_string()), ""),
    }
}

/// Child node of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }
}

/// Element attribute stored by its qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Owned XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    prefix: Option<String>,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Construct new element without a namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Construct new element in the default namespace `namespace`.
    pub fn with_namespace(name: impl Into<String>, namespace: Option<&str>) -> Self {
        let mut element = Self::new(name);
        element.namespace = namespace.map(Into::into);
        element
    }

    pub(crate) fn from_parts(
        name: String,
        prefix: Option<String>,
        namespace: Option<String>,
        attributes: Vec<Attribute>,
    ) -> Self {
        Self {
            name,
            prefix,
            namespace,
            attributes,
            children: Vec::new(),
        }
    }

    /// Local name without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as written in markup, i.e., `prefix:local` or `local`.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Move this element and every descendant into another namespace.
    ///
    /// Default namespace declarations on the moved subtree are dropped so
    /// that the subtree inherits the namespace of whatever it gets attached
    /// to.
    pub fn adopt_namespace(&mut self, namespace: Option<&str>, prefix: Option<&str>) {
        self.namespace = namespace.map(Into::into);
        self.prefix = prefix.map(Into::into);
        self.attributes.retain(|attr| attr.name != "xmlns");
        for child in self.children.iter_mut().filter_map(Node::as_element_mut) {
            child.adopt_namespace(namespace, prefix);
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Set attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Builder flavor of [`Element::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Iterate over child elements only.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// Iterate over child elements with local name `name`.
    pub fn elements_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Element> + 'n
    where
        'a: 'n,
    {
        self.elements().filter(move |element| element.name == name)
    }

    /// First child element with local name `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|element| element.name == name)
    }

    /// First child element matching both local name and namespace.
    pub fn child_ns(&self, name: &str, namespace: Option<&str>) -> Option<&Element> {
        self.elements()
            .find(|element| element.name == name && element.namespace() == namespace)
    }

    /// Follow a `/` separated path of child element names.
    pub fn find_path(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|step| !step.is_empty())
            .try_fold(self, |element, step| element.child(step))
    }

    /// Concatenated text and CDATA content of direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) | Node::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Text of first child element named `name`.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(Element::text)
    }

    /// Replace all text content with `text`.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children
            .retain(|node| !matches!(node, Node::Text(_) | Node::CData(_)));
        self.children.push(Node::Text(text.into()));
    }

    /// Builder flavor of [`Element::set_text`].
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Builder flavor of [`Element::push`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Append child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Insert child element at node index `index`.
    pub fn insert(&mut self, index: usize, child: Element) {
        self.children.insert(index, Node::Element(child));
    }

    /// Node index of first child element named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| node.as_element().is_some_and(|element| element.name == name))
    }

    /// Remove every child element named `name`, returning how many went.
    pub fn remove_elements_named(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !node.as_element().is_some_and(|element| element.name == name));
        before - self.children.len()
    }

    /// Remove node at index, returning it when it was an element.
    pub fn remove(&mut self, index: usize) -> Option<Element> {
        match self.children.remove(index) {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Collect all descendants named `name` in document order.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for element in self.elements() {
            if element.name == name {
                found.push(element);
            }
            element.collect_descendants(name, found);
        }
    }
}

/// XML processing error types.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// Underlying parser rejected the input.
    #[error("failed to parse xml at byte {position}")]
    Parse {
        #[source]
        source: quick_xml::Error,
        position: u64,
    },

    /// Attribute could not be read.
    #[error(transparent)]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Attribute value holds a bad escape sequence.
    #[error("failed to unescape attribute value")]
    AttributeValue(#[source] quick_xml::Error),

    /// Content is not valid UTF-8.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),

    /// End tag without matching start tag.
    #[error("unexpected end tag </{0}>")]
    UnbalancedEnd(String),

    /// Input ended before every element was closed.
    #[error("unclosed element <{0}>")]
    Unclosed(String),

    /// Namespace prefix was never declared.
    #[error("undeclared namespace prefix {0:?}")]
    UndeclaredPrefix(String),

    /// Input holds no root element.
    #[error("document has no root element")]
    NoRoot,

    /// Output could not be written.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = XmlError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn doctype_parse_public() {
        let doctype = DocType::parse(
            r#"web-app PUBLIC "-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN" "http://java.sun.com/dtd/web-app_2_3.dtd""#,
        );
        assert_eq!(doctype.name(), "web-app");
        assert_eq!(
            doctype.public_id(),
            Some("-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN")
        );
        assert_eq!(
            doctype.system_id(),
            Some("http://java.sun.com/dtd/web-app_2_3.dtd")
        );
        assert_eq!(DocType::parse(&doctype.to_string()), doctype);
    }

    #[test]
    fn doctype_parse_system_only() {
        let doctype = DocType::parse("resin SYSTEM 'resin.dtd'");
        assert_eq!(doctype.public_id(), None);
        assert_eq!(doctype.system_id(), Some("resin.dtd"));
        assert_eq!(doctype.to_string(), r#"resin SYSTEM "resin.dtd""#);
    }

    #[test]
    fn element_navigation() {
        let filter = Element::new("filter")
            .with_child(Element::new("filter-name").with_text("f"))
            .with_child(
                Element::new("init-param")
                    .with_child(Element::new("param-name").with_text("x")),
            );

        assert_eq!(filter.child_text("filter-name"), Some("f".into()));
        assert_eq!(
            filter.find_path("init-param/param-name").map(Element::text),
            Some("x".into())
        );
        assert_eq!(filter.find_path("init-param/param-value"), None);
        assert_eq!(filter.descendants("param-name").len(), 1);
        assert_eq!(filter.position("init-param"), Some(1));
    }

    #[test]
    fn element_adopt_namespace() {
        let ns = "http://java.sun.com/xml/ns/javaee";
        let mut element = Element::new("servlet")
            .with_attribute("xmlns", "")
            .with_child(Element::new("servlet-name").with_text("s"));
        element.adopt_namespace(Some(ns), None);

        assert_eq!(element.namespace(), Some(ns));
        assert_eq!(element.attribute("xmlns"), None);
        assert_eq!(
            element.child("servlet-name").and_then(Element::namespace),
            Some(ns)
        );
    }

    #[test]
    fn element_remove_elements_named() {
        let mut root = Element::new("web-app")
            .with_child(Element::new("login-config"))
            .with_child(Element::new("security-role"))
            .with_child(Element::new("login-config"));

        assert_eq!(root.remove_elements_named("login-config"), 2);
        assert_eq!(root.elements().count(), 1);
    }
}
