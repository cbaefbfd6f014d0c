// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Versioned descriptor dialects.
//!
//! A [`DescriptorType`] is the registry of every [`Tag`] one dialect
//! understands. Types are built once through [`DescriptorTypeBuilder`] and
//! are immutable afterwards. Newer dialects link to an older `base` type
//! and only register what they add or shadow, so a lookup walks the chain
//! from the most specific type down to the oldest one.

use super::{
    tag::{Identifier, Tag},
    DescriptorError, Result,
};
use crate::{webapp::element::WrapperKind, xml::Element};

use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result as FmtResult},
    sync::Arc,
};

/// Locator of the grammar a dialect is validated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarRef {
    /// No published grammar.
    None,

    /// Document type definition identified by public and system ids.
    Dtd {
        public_id: String,
        system_id: String,
    },

    /// XML schema bound to a namespace.
    Schema { namespace: String, location: String },
}

/// Grammar facts needed to build valid documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    reference: GrammarRef,
    root: String,
    element_order: Vec<String>,
}

impl Grammar {
    /// Construct grammar for documents rooted at `root`.
    ///
    /// The `element_order` lists the root's child kinds in the order the
    /// grammar requires them to appear.
    pub fn new(
        reference: GrammarRef,
        root: impl Into<String>,
        element_order: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            reference,
            root: root.into(),
            element_order: element_order.into_iter().map(Into::into).collect(),
        }
    }

    pub fn reference(&self) -> &GrammarRef {
        &self.reference
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn element_order(&self) -> &[String] {
        &self.element_order
    }

    /// Node index under `root` where a new `name` element belongs.
    ///
    /// The new element goes in front of the earliest sibling whose kind
    /// must follow `name`, stepping back over any comments attached to that
    /// sibling. Kinds the grammar does not order are appended.
    pub fn insertion_index(&self, root: &Element, name: &str) -> usize {
        let children = root.children();
        let Some(rank) = self.element_order.iter().position(|kind| kind == name) else {
            return children.len();
        };

        let following = &self.element_order[rank + 1..];
        let next = children.iter().position(|node| {
            node.as_element()
                .is_some_and(|element| following.iter().any(|kind| kind == element.name()))
        });

        match next {
            Some(mut index) => {
                while index > 0 && children[index - 1].is_comment() {
                    index -= 1;
                }
                index
            }
            None => children.len(),
        }
    }
}

/// Row of a static tag table.
#[derive(Debug, Clone, Copy)]
pub struct TagSpec {
    pub name: &'static str,
    pub multiple: bool,
    pub identifier: Option<&'static str>,
    pub wrapper: Option<WrapperKind>,
}

impl TagSpec {
    pub const fn single(name: &'static str) -> Self {
        Self {
            name,
            multiple: false,
            identifier: None,
            wrapper: None,
        }
    }

    pub const fn multiple(name: &'static str) -> Self {
        Self {
            name,
            multiple: true,
            identifier: None,
            wrapper: None,
        }
    }

    pub const fn identified(mut self, identifier: &'static str) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub const fn wraps(mut self, wrapper: WrapperKind) -> Self {
        self.wrapper = Some(wrapper);
        self
    }
}

/// Registry of tags for one descriptor dialect.
#[derive(Debug)]
pub struct DescriptorType {
    name: String,
    base: Option<Arc<DescriptorType>>,
    grammar: Grammar,
    namespace: Option<String>,
    tags: Vec<Tag>,
}

impl DescriptorType {
    /// Start building new descriptor type.
    pub fn builder(name: impl Into<String>, grammar: Grammar) -> DescriptorTypeBuilder {
        DescriptorTypeBuilder {
            inner: Self {
                name: name.into(),
                base: None,
                grammar,
                namespace: None,
                tags: Vec::new(),
            },
            prefixes: HashMap::new(),
            qualify: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&DescriptorType> {
        self.base.as_deref()
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Default namespace of documents in this dialect.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Look up tag registered on this exact type.
    pub fn local_tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name() == name)
    }

    /// Look up tag by name, falling back through base types.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.local_tag(name)
            .or_else(|| self.base.as_ref().and_then(|base| base.tag(name)))
    }

    /// Look up tag by name or fail.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UnknownTag`] if no type in the chain
    ///   registers `name`.
    pub fn require_tag(&self, name: &str) -> Result<&Tag> {
        self.tag(name).ok_or_else(|| DescriptorError::UnknownTag {
            tag: name.into(),
            schema: self.name.clone(),
        })
    }

    /// Every visible tag, most specific first, shadowed tags skipped.
    pub fn tags(&self) -> Vec<&Tag> {
        let mut visible: Vec<&Tag> = Vec::new();
        let mut current = Some(self);
        while let Some(schema) = current {
            for tag in &schema.tags {
                if !visible.iter().any(|seen| seen.name() == tag.name()) {
                    visible.push(tag);
                }
            }
            current = schema.base();
        }
        visible
    }

    /// Create empty element of tag `name` in this dialect's namespace.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UnknownTag`] if `name` is not a tag of
    ///   this dialect.
    pub fn create(&self, name: &str) -> Result<Element> {
        self.require_tag(name)?;
        Ok(Element::with_namespace(name, self.namespace()))
    }

    /// Check whether `other` is this type or one of its bases.
    pub fn extends(&self, other: &DescriptorType) -> bool {
        let mut current = Some(self);
        while let Some(schema) = current {
            if std::ptr::eq(schema, other) {
                return true;
            }
            current = schema.base();
        }
        false
    }
}

impl Display for DescriptorType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.name)
    }
}

/// One-shot builder for [`DescriptorType`].
#[derive(Debug)]
pub struct DescriptorTypeBuilder {
    inner: DescriptorType,
    prefixes: HashMap<String, String>,
    qualify: Option<String>,
}

impl DescriptorTypeBuilder {
    /// Fall back to `base` for tags this type does not register.
    pub fn base(mut self, base: Arc<DescriptorType>) -> Self {
        self.inner.base = Some(base);
        self
    }

    /// Put documents and created elements into `namespace`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.inner.namespace = Some(namespace.into());
        self
    }

    /// Bind prefix usable inside identifier expressions.
    pub fn prefix(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.prefixes.insert(prefix.into(), namespace.into());
        self
    }

    /// Qualify unprefixed identifier children of table rows with `prefix`.
    pub fn qualify_identifiers(mut self, prefix: impl Into<String>) -> Self {
        self.qualify = Some(prefix.into());
        self
    }

    /// Register tag on the type under construction.
    ///
    /// Shadowing a tag of a base type is fine. Registering the same name
    /// twice on this type is not.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateTag`] if `tag` is already
    ///   registered on this type.
    pub fn register(&mut self, tag: Tag) -> Result<()> {
        if self.inner.local_tag(tag.name()).is_some() {
            return Err(DescriptorError::DuplicateTag {
                tag: tag.name().into(),
                schema: self.inner.name.clone(),
            });
        }

        let tag = tag.in_namespace(self.inner.namespace.as_deref());
        self.inner.tags.push(tag);
        Ok(())
    }

    /// Register every row of a static tag table.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateTag`] on a repeated row.
    /// - Return [`DescriptorError::InvalidIdentifier`] on a bad identifier
    ///   expression.
    pub fn register_table(mut self, table: &[TagSpec]) -> Result<Self> {
        for row in table {
            let mut tag = Tag::new(row.name, row.multiple);
            if let Some(expr) = row.identifier {
                tag = tag.with_identifier(self.identifier(expr)?);
            }
            if let Some(wrapper) = row.wrapper {
                tag = tag.with_wrapper(wrapper);
            }
            self.register(tag)?;
        }

        Ok(self)
    }

    fn identifier(&self, expr: &str) -> Result<Identifier> {
        let Some(prefix) = &self.qualify else {
            return Identifier::parse(expr, &self.prefixes);
        };

        // INVARIANT: Only bare child names gain the prefix.
        let qualified = match expr.strip_prefix("concat(").and_then(|e| e.strip_suffix(')')) {
            Some(args) => {
                let parts = args
                    .split(',')
                    .map(|part| qualify_part(part.trim(), prefix))
                    .collect::<Vec<_>>();
                format!("concat({})", parts.join(","))
            }
            None => qualify_part(expr, prefix),
        };
        Identifier::parse(&qualified, &self.prefixes)
    }

    /// Finish the type.
    pub fn build(self) -> DescriptorType {
        self.inner
    }
}

fn qualify_part(part: &str, prefix: &str) -> String {
    if part.starts_with('\'') || part.contains(':') {
        part.to_string()
    } else {
        format!("{prefix}:{part}")
    }
}
