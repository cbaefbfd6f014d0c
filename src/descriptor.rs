// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Generic deployment descriptor model.
//!
//! Every descriptor dialect, be it the standard `web.xml` or a vendor file
//! like `weblogic.xml`, is an XML document whose root children are instances
//! of the tags registered on a [`DescriptorType`]. The [`Descriptor`] trait
//! captures the operations shared by all of them: lookup by tag, lookup by
//! identifier, and grammar-aware insertion.

pub mod schema;
pub mod tag;

pub use schema::{DescriptorType, Grammar, GrammarRef, TagSpec};
pub use tag::{ChildRef, Identifier, Tag};

use crate::xml::{Document, Element, Node};

/// Deployment descriptor document.
pub trait Descriptor {
    /// Dialect of this descriptor.
    fn schema(&self) -> &DescriptorType;

    fn document(&self) -> &Document;

    fn document_mut(&mut self) -> &mut Document;

    /// File name this descriptor is stored under in `WEB-INF`.
    fn file_name(&self) -> &str;

    fn root(&self) -> &Element {
        self.document().root()
    }

    /// Root children that are instances of tag `name`.
    fn tags(&self, name: &str) -> Vec<&Element> {
        self.root().elements_named(name).collect()
    }

    /// Every element named `name` anywhere below the root.
    fn elements(&self, name: &str) -> Vec<&Element> {
        self.root().descendants(name)
    }

    /// Node index of the tag instance whose identifier equals `value`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UnknownTag`] if `name` is not a tag of
    ///   this dialect.
    fn position_by_identifier(&self, name: &str, value: &str) -> Result<Option<usize>> {
        let tag = self.schema().require_tag(name)?;
        let position = self.root().children().iter().position(|node| {
            node.as_element().is_some_and(|element| {
                tag.matches(element) && tag.identifier_of(element).as_deref() == Some(value)
            })
        });

        Ok(position)
    }

    /// Tag instance whose identifier equals `value`.
    ///
    /// Matching is exact and case-sensitive.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UnknownTag`] if `name` is not a tag of
    ///   this dialect.
    fn tag_by_identifier(&self, name: &str, value: &str) -> Result<Option<&Element>> {
        let position = self.position_by_identifier(name, value)?;
        Ok(position.and_then(|index| self.root().children()[index].as_element()))
    }

    /// Mutable flavor of [`Descriptor::tag_by_identifier`].
    fn tag_by_identifier_mut(&mut self, name: &str, value: &str) -> Result<Option<&mut Element>> {
        let position = self.position_by_identifier(name, value)?;
        let root = self.document_mut().root_mut();
        Ok(position.and_then(|index| root.children_mut()[index].as_element_mut()))
    }

    /// Insert element at the position its grammar dictates.
    ///
    /// The element is moved into this descriptor's namespace first, so
    /// elements taken from a descriptor of another dialect fit in.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UnknownTag`] if the element is not a tag
    ///   of this dialect.
    fn insert_element(&mut self, mut element: Element) -> Result<usize> {
        self.schema().require_tag(element.name())?;
        self.adopt(&mut element);

        let root = self.root();
        let index = self.schema().grammar().insertion_index(root, element.name());
        self.document_mut().root_mut().insert(index, element);
        Ok(index)
    }

    /// Move `element` into the namespace of this descriptor's dialect.
    ///
    /// The root's prefix is reused when the root itself lives in that
    /// namespace.
    fn adopt(&self, element: &mut Element) {
        let namespace = self.schema().namespace();
        let root = self.root();
        let prefix = match namespace {
            Some(_) if root.namespace() == namespace => root.prefix(),
            _ => None,
        };
        element.adopt_namespace(namespace, prefix);
    }

    /// Replace every instance of the element's tag with `element`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UnknownTag`] if the element is not a tag
    ///   of this dialect.
    fn replace_element(&mut self, element: Element) -> Result<usize> {
        self.remove_tag(element.name());
        self.insert_element(element)
    }

    /// Remove every instance of tag `name`.
    fn remove_tag(&mut self, name: &str) -> usize {
        self.document_mut().root_mut().remove_elements_named(name)
    }

    /// Replace the root child at node index `index` with `element`.
    fn replace_at(&mut self, index: usize, mut element: Element) {
        self.adopt(&mut element);
        if let Some(node) = self.document_mut().root_mut().children_mut().get_mut(index) {
            *node = Node::Element(element);
        }
    }
}

/// Put an unqualified root into the dialect namespace of `schema`.
///
/// Documents that omit their namespace declaration are still matched
/// against namespace-qualified identifiers. Output is unaffected since no
/// declaration gets added.
pub(crate) fn normalize_namespace(document: &mut Document, schema: &DescriptorType) {
    let root = document.root_mut();
    if root.namespace().is_none() && root.prefix().is_none() && schema.namespace().is_some() {
        let attributes = root.attributes().to_vec();
        root.adopt_namespace(schema.namespace(), None);
        for attr in attributes.into_iter().filter(|attr| attr.name == "xmlns") {
            root.set_attribute(attr.name, attr.value);
        }
    }
}

/// Descriptor error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Tag registered twice on the same descriptor type.
    #[error("tag {tag:?} is already registered on {schema}")]
    DuplicateTag { tag: String, schema: String },

    /// Tag not known to descriptor type or any of its bases.
    #[error("tag {tag:?} is not part of {schema}")]
    UnknownTag { tag: String, schema: String },

    /// Identifier expression matches none of the supported forms.
    #[error("invalid identifier expression {0:?}")]
    InvalidIdentifier(String),

    /// Element with the same name already exists.
    #[error("{kind} named {name:?} already exists")]
    DuplicateName { kind: &'static str, name: String },

    /// Security role already exists.
    #[error("security role {0:?} already exists")]
    DuplicateRole(String),

    /// Security constraint already covers URL pattern.
    #[error("security constraint for {0:?} already exists")]
    DuplicateConstraint(String),

    /// Element refers to something that was never defined.
    #[error("no {kind} named {name:?} is defined")]
    UndefinedReference { kind: &'static str, name: String },

    /// Element was configured with an invalid combination of fields.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Operation is not possible in the current state.
    #[error("illegal state: {0}")]
    IllegalState(String),
}

/// Friendly result alias :3
pub type Result<T, E = DescriptorError> = std::result::Result<T, E>;
