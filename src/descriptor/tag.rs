// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Descriptor tags and identifier expressions.
//!
//! A [`Tag`] names one kind of element in a descriptor dialect, says
//! whether it may repeat, and optionally says how two instances are told
//! apart through an [`Identifier`].
//!
//! # Identifier Expressions
//!
//! Identifiers are written as tiny path expressions and come in three
//! forms:
//!
//! 1. `param-name`: text of the first child with that local name.
//! 2. `j2ee:param-name`: same, but the child must also live in the
//!    namespace bound to the `j2ee` prefix.
//! 3. `concat(error-code,'>',exception-type)`: text of two children joined
//!    by a literal separator. Missing children count as empty text.

use super::{DescriptorError, Result};
use crate::{webapp::element::WrapperKind, xml::Element};

use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Reference to a child element by local name and optional namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    name: String,
    prefix: Option<String>,
    namespace: Option<String>,
}

impl ChildRef {
    /// Reference child by local name in any namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            namespace: None,
        }
    }

    fn parse(expr: &str, namespaces: &HashMap<String, String>) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() || expr.contains(['(', ')', '\'', ',', ' ']) {
            return Err(DescriptorError::InvalidIdentifier(expr.into()));
        }

        match expr.split_once(':') {
            Some((prefix, name)) => {
                let namespace = namespaces
                    .get(prefix)
                    .ok_or_else(|| DescriptorError::InvalidIdentifier(expr.into()))?;
                Ok(Self {
                    name: name.into(),
                    prefix: Some(prefix.into()),
                    namespace: Some(namespace.clone()),
                })
            }
            None => Ok(Self::new(expr)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn value(&self, element: &Element) -> Option<String> {
        let child = match &self.namespace {
            Some(namespace) => element.child_ns(&self.name, Some(namespace.as_str())),
            None => element.child(&self.name),
        };
        child.map(Element::text)
    }
}

impl Display for ChildRef {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match &self.prefix {
            Some(prefix) => write!(fmt, "{prefix}:{}", self.name),
            None => fmt.write_str(&self.name),
        }
    }
}

/// Expression computing the identity of a tag instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Text of a single child element.
    Child(ChildRef),

    /// Two child texts joined by a literal separator.
    Concat {
        first: ChildRef,
        separator: String,
        second: ChildRef,
    },
}

impl Identifier {
    /// Parse identifier expression.
    ///
    /// Prefixes used in the expression are resolved through `namespaces`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::InvalidIdentifier`] if the expression
    ///   matches none of the supported forms, or uses an unbound prefix.
    pub fn parse(expr: &str, namespaces: &HashMap<String, String>) -> Result<Self> {
        let expr = expr.trim();
        let Some(args) = expr
            .strip_prefix("concat(")
            .and_then(|rest| rest.strip_suffix(')'))
        else {
            return Ok(Self::Child(ChildRef::parse(expr, namespaces)?));
        };

        let invalid = || DescriptorError::InvalidIdentifier(expr.into());
        let (first, rest) = args.split_once(',').ok_or_else(invalid)?;
        let rest = rest.trim_start().strip_prefix('\'').ok_or_else(invalid)?;
        let (separator, rest) = rest.split_once('\'').ok_or_else(invalid)?;
        let second = rest.trim_start().strip_prefix(',').ok_or_else(invalid)?;

        Ok(Self::Concat {
            first: ChildRef::parse(first, namespaces)?,
            separator: separator.into(),
            second: ChildRef::parse(second, namespaces)?,
        })
    }

    /// Compute identifier value of `element`.
    ///
    /// A single child reference yields [`None`] when the child is missing.
    /// A concatenation always yields a value.
    pub fn evaluate(&self, element: &Element) -> Option<String> {
        match self {
            Self::Child(child) => child.value(element),
            Self::Concat {
                first,
                separator,
                second,
            } => Some(format!(
                "{}{separator}{}",
                first.value(element).unwrap_or_default(),
                second.value(element).unwrap_or_default()
            )),
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Child(child) => write!(fmt, "{child}"),
            Self::Concat {
                first,
                separator,
                second,
            } => write!(fmt, "concat({first},'{separator}',{second})"),
        }
    }
}

/// One kind of element in a descriptor dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    multiple: bool,
    identifier: Option<Identifier>,
    wrapper: Option<WrapperKind>,
    namespace: Option<String>,
}

impl Tag {
    /// Construct new tag.
    pub fn new(name: impl Into<String>, multiple: bool) -> Self {
        Self {
            name: name.into(),
            multiple,
            identifier: None,
            wrapper: None,
            namespace: None,
        }
    }

    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn with_wrapper(mut self, wrapper: WrapperKind) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    pub(crate) fn in_namespace(mut self, namespace: Option<&str>) -> Self {
        self.namespace = namespace.map(Into::into);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_multiple_allowed(&self) -> bool {
        self.multiple
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn wrapper(&self) -> Option<WrapperKind> {
        self.wrapper
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Create empty detached element of this tag in its dialect namespace.
    pub fn create(&self) -> Element {
        Element::with_namespace(self.name.as_str(), self.namespace())
    }

    /// Identifier value of `element`, if this tag has an identifier.
    pub fn identifier_of(&self, element: &Element) -> Option<String> {
        self.identifier
            .as_ref()
            .and_then(|identifier| identifier.evaluate(element))
    }

    /// Check that `element` is an instance of this tag.
    pub fn matches(&self, element: &Element) -> bool {
        element.name() == self.name
    }
}

impl Display for Tag {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const J2EE: &str = "http://java.sun.com/xml/ns/j2ee";

    fn namespaces() -> HashMap<String, String> {
        HashMap::from([("j2ee".to_string(), J2EE.to_string())])
    }

    #[test]
    fn identifier_child_form() -> anyhow::Result<()> {
        let identifier = Identifier::parse("param-name", &namespaces())?;
        let param = Element::new("context-param")
            .with_child(Element::new("param-name").with_text("a"));

        assert_eq!(identifier.evaluate(&param), Some("a".into()));
        assert_eq!(identifier.evaluate(&Element::new("context-param")), None);
        assert_eq!(identifier.to_string(), "param-name");

        Ok(())
    }

    #[test]
    fn identifier_namespaced_form() -> anyhow::Result<()> {
        let identifier = Identifier::parse("j2ee:param-name", &namespaces())?;
        let qualified = Element::with_namespace("context-param", Some(J2EE))
            .with_child(Element::with_namespace("param-name", Some(J2EE)).with_text("a"));
        let unqualified = Element::new("context-param")
            .with_child(Element::new("param-name").with_text("a"));

        assert_eq!(identifier.evaluate(&qualified), Some("a".into()));
        assert_eq!(identifier.evaluate(&unqualified), None);
        assert_eq!(identifier.to_string(), "j2ee:param-name");

        Ok(())
    }

    #[test]
    fn identifier_concat_form() -> anyhow::Result<()> {
        let identifier = Identifier::parse("concat(error-code,'>',exception-type)", &namespaces())?;
        let by_code = Element::new("error-page")
            .with_child(Element::new("error-code").with_text("404"))
            .with_child(Element::new("location").with_text("/404.jsp"));
        let by_type = Element::new("error-page")
            .with_child(Element::new("exception-type").with_text("java.io.IOException"));

        assert_eq!(identifier.evaluate(&by_code), Some("404>".into()));
        assert_eq!(
            identifier.evaluate(&by_type),
            Some(">java.io.IOException".into())
        );
        assert_eq!(
            identifier.to_string(),
            "concat(error-code,'>',exception-type)"
        );

        Ok(())
    }

    #[test]
    fn identifier_rejects_garbage() {
        for expr in ["", "concat(a,b)", "concat(a,'>')", "x:param-name", "a b"] {
            assert!(
                Identifier::parse(expr, &namespaces()).is_err(),
                "{expr:?} should not parse"
            );
        }
    }

    #[test]
    fn tag_create_uses_namespace() {
        let tag = Tag::new("filter", true).in_namespace(Some(J2EE));
        let element = tag.create();
        assert_eq!(element.name(), "filter");
        assert_eq!(element.namespace(), Some(J2EE));
        assert!(tag.matches(&element));
    }
}
