// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Build an owned [`Document`] from a [`quick_xml`] event stream.

use super::{Attribute, DocType, Document, Element, Node, Result, XmlError};

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use std::{collections::HashMap, io::BufRead, str::from_utf8};

/// Parse a whole document out of `input`.
///
/// Declarations are skipped, comments and processing instructions ahead of
/// the root are kept in the prolog along with where the document type
/// declaration sat among them. Anything after the root element besides
/// whitespace is ignored.
///
/// # Errors
///
/// - Return [`XmlError::Parse`] if the input is not well formed.
/// - Return [`XmlError::UndeclaredPrefix`] if an element uses a namespace
///   prefix that is not in scope.
/// - Return [`XmlError::NoRoot`] if the input has no root element.
pub fn parse_document(input: impl BufRead) -> Result<Document> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut builder = TreeBuilder::default();
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| XmlError::Parse {
                source,
                position: reader.error_position(),
            })?;

        match event {
            Event::Start(start) => {
                let element = builder.open(&start)?;
                builder.stack.push(element);
            }
            Event::Empty(start) => {
                let element = builder.open(&start)?;
                builder.scopes.pop();
                builder.attach(element);
            }
            Event::End(end) => {
                let name = from_utf8(end.name().as_ref())?.to_string();
                let element = builder.stack.pop().ok_or(XmlError::UnbalancedEnd(name))?;
                builder.scopes.pop();
                builder.attach(element);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|source| XmlError::Parse {
                    source,
                    position: reader.buffer_position(),
                })?;
                if !text.trim().is_empty() {
                    builder.push_node(Node::Text(text.into_owned()));
                }
            }
            Event::CData(cdata) => {
                let text = from_utf8(&cdata.into_inner())?.to_string();
                builder.push_node(Node::CData(text));
            }
            Event::Comment(comment) => {
                let text = from_utf8(&comment.into_inner())?.to_string();
                builder.push_node(Node::Comment(text));
            }
            Event::PI(pi) => {
                let text = from_utf8(&pi.into_inner())?.to_string();
                builder.push_node(Node::ProcessingInstruction(text));
            }
            Event::DocType(doctype) => {
                let text = from_utf8(&doctype.into_inner())?.to_string();
                builder.doctype = Some(DocType::parse(&text));
                builder.doctype_at = builder.prolog.len();
            }
            Event::Decl(_) => {}
            Event::Eof => break,
        }
        buf.clear();
    }

    if let Some(open) = builder.stack.last() {
        return Err(XmlError::Unclosed(open.qualified_name()));
    }

    let root = builder.root.ok_or(XmlError::NoRoot)?;
    let mut document = Document::new(root);
    document.set_doctype(builder.doctype);
    document.set_doctype_position(builder.doctype_at);
    *document.prolog_mut() = builder.prolog;

    Ok(document)
}

/// Parse document held in a string.
pub fn parse_str(input: &str) -> Result<Document> {
    parse_document(input.as_bytes())
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    scopes: Vec<HashMap<Option<String>, String>>,
    prolog: Vec<Node>,
    doctype: Option<DocType>,
    doctype_at: usize,
    root: Option<Element>,
}

impl TreeBuilder {
    fn open(&mut self, start: &BytesStart<'_>) -> Result<Element> {
        let qname = from_utf8(start.name().as_ref())?.to_string();
        let mut attributes = Vec::new();
        let mut declared = HashMap::new();
        for attr in start.attributes() {
            let attr = attr?;
            let name = from_utf8(attr.key.as_ref())?.to_string();
            let value = attr
                .unescape_value()
                .map_err(XmlError::AttributeValue)?
                .into_owned();

            if name == "xmlns" {
                declared.insert(None, value.clone());
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                declared.insert(Some(prefix.to_string()), value.clone());
            }
            attributes.push(Attribute { name, value });
        }
        self.scopes.push(declared);

        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
            None => (None, qname.clone()),
        };
        let namespace = self.resolve(prefix.as_deref());

        // INVARIANT: Prefixed names must resolve, unprefixed names may not.
        if prefix.is_some() && namespace.is_none() {
            return Err(XmlError::UndeclaredPrefix(qname));
        }

        Ok(Element::from_parts(local, prefix, namespace, attributes))
    }

    fn resolve(&self, prefix: Option<&str>) -> Option<String> {
        let key = prefix.map(ToString::to_string);
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&key))
            .filter(|uri| !uri.is_empty())
            .cloned()
    }

    fn attach(&mut self, element: Element) {
        match self.stack.last_mut() {
            Some(parent) => parent.push(element),
            None if self.root.is_none() => self.root = Some(element),
            None => {}
        }
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children_mut().push(node),
            None if self.root.is_none() && !matches!(node, Node::Text(_) | Node::CData(_)) => {
                self.prolog.push(node)
            }
            None => {}
        }
    }
}
