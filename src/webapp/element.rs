// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Typed views over web.xml elements.
//!
//! Tags that carry a [`WrapperKind`] get a typed, borrowed view that exposes
//! semantic accessors instead of raw child lookups. Views never own their
//! element. Each view also offers a `create` constructor that builds a
//! detached element in the namespace of a given [`DescriptorType`], ready to
//! be inserted into a document.

use crate::{
    descriptor::{DescriptorError, DescriptorType, Result, Tag},
    xml::Element,
};

use std::collections::BTreeSet;

/// Closed set of typed element views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    ContextParam,
    InitParam,
    Filter,
    FilterMapping,
    Servlet,
    ServletMapping,
    Listener,
    SecurityConstraint,
    AuthConstraint,
    MimeMapping,
    ErrorPage,
}

/// Typed view chosen by a tag's wrapper kind.
#[derive(Debug, Clone, Copy)]
pub enum WebXmlElement<'a> {
    ContextParam(ContextParam<'a>),
    InitParam(InitParam<'a>),
    Filter(Filter<'a>),
    FilterMapping(FilterMapping<'a>),
    Servlet(Servlet<'a>),
    ServletMapping(ServletMapping<'a>),
    Listener(Listener<'a>),
    SecurityConstraint(SecurityConstraint<'a>),
    AuthConstraint(AuthConstraint<'a>),
    MimeMapping(MimeMapping<'a>),
    ErrorPage(ErrorPage<'a>),
    Plain(&'a Element),
}

impl<'a> WebXmlElement<'a> {
    /// Wrap `element` according to the wrapper kind of `tag`.
    pub fn wrap(tag: &Tag, element: &'a Element) -> Self {
        match tag.wrapper() {
            Some(WrapperKind::ContextParam) => Self::ContextParam(ContextParam(element)),
            Some(WrapperKind::InitParam) => Self::InitParam(InitParam(element)),
            Some(WrapperKind::Filter) => Self::Filter(Filter(element)),
            Some(WrapperKind::FilterMapping) => Self::FilterMapping(FilterMapping(element)),
            Some(WrapperKind::Servlet) => Self::Servlet(Servlet(element)),
            Some(WrapperKind::ServletMapping) => Self::ServletMapping(ServletMapping(element)),
            Some(WrapperKind::Listener) => Self::Listener(Listener(element)),
            Some(WrapperKind::SecurityConstraint) => {
                Self::SecurityConstraint(SecurityConstraint(element))
            }
            Some(WrapperKind::AuthConstraint) => Self::AuthConstraint(AuthConstraint(element)),
            Some(WrapperKind::MimeMapping) => Self::MimeMapping(MimeMapping(element)),
            Some(WrapperKind::ErrorPage) => Self::ErrorPage(ErrorPage(element)),
            None => Self::Plain(element),
        }
    }

    /// Underlying element.
    pub fn element(&self) -> &'a Element {
        match self {
            Self::ContextParam(view) => view.0,
            Self::InitParam(view) => view.0,
            Self::Filter(view) => view.0,
            Self::FilterMapping(view) => view.0,
            Self::Servlet(view) => view.0,
            Self::ServletMapping(view) => view.0,
            Self::Listener(view) => view.0,
            Self::SecurityConstraint(view) => view.0,
            Self::AuthConstraint(view) => view.0,
            Self::MimeMapping(view) => view.0,
            Self::ErrorPage(view) => view.0,
            Self::Plain(element) => element,
        }
    }
}

pub(crate) fn leaf(schema: &DescriptorType, name: &str, text: impl Into<String>) -> Element {
    Element::with_namespace(name, schema.namespace()).with_text(text)
}

pub(crate) fn node(schema: &DescriptorType, name: &str) -> Element {
    Element::with_namespace(name, schema.namespace())
}

fn trimmed(element: &Element, name: &str) -> Option<String> {
    element.child_text(name).map(|text| text.trim().to_string())
}

fn init_params(element: &Element) -> Vec<InitParam<'_>> {
    element.elements_named("init-param").map(InitParam).collect()
}

fn init_param(element: &Element, name: &str) -> Option<String> {
    init_params(element)
        .into_iter()
        .find(|param| param.name().as_deref() == Some(name))
        .and_then(|param| param.value())
}

/// `context-param` view.
#[derive(Debug, Clone, Copy)]
pub struct ContextParam<'a>(pub(crate) &'a Element);

impl<'a> ContextParam<'a> {
    pub fn new(element: &'a Element) -> Self {
        Self(element)
    }

    pub fn create(schema: &DescriptorType, name: &str, value: &str) -> Element {
        node(schema, "context-param")
            .with_child(leaf(schema, "param-name", name))
            .with_child(leaf(schema, "param-value", value))
    }

    pub fn name(&self) -> Option<String> {
        trimmed(self.0, "param-name")
    }

    pub fn value(&self) -> Option<String> {
        trimmed(self.0, "param-value")
    }

    pub fn description(&self) -> Option<String> {
        trimmed(self.0, "description")
    }
}

/// `init-param` view.
#[derive(Debug, Clone, Copy)]
pub struct InitParam<'a>(pub(crate) &'a Element);

impl<'a> InitParam<'a> {
    pub fn create(schema: &DescriptorType, name: &str, value: &str) -> Element {
        node(schema, "init-param")
            .with_child(leaf(schema, "param-name", name))
            .with_child(leaf(schema, "param-value", value))
    }

    pub fn name(&self) -> Option<String> {
        trimmed(self.0, "param-name")
    }

    pub fn value(&self) -> Option<String> {
        trimmed(self.0, "param-value")
    }

    pub fn element(&self) -> &'a Element {
        self.0
    }
}

/// `filter` view.
#[derive(Debug, Clone, Copy)]
pub struct Filter<'a>(pub(crate) &'a Element);

impl<'a> Filter<'a> {
    pub fn create(schema: &DescriptorType, name: &str, class: &str) -> Element {
        node(schema, "filter")
            .with_child(leaf(schema, "filter-name", name))
            .with_child(leaf(schema, "filter-class", class))
    }

    pub fn name(&self) -> Option<String> {
        trimmed(self.0, "filter-name")
    }

    pub fn class(&self) -> Option<String> {
        trimmed(self.0, "filter-class")
    }

    pub fn init_params(&self) -> Vec<InitParam<'a>> {
        init_params(self.0)
    }

    pub fn init_param(&self, name: &str) -> Option<String> {
        init_param(self.0, name)
    }

    /// Role name of `run-as` child, if any.
    pub fn run_as_role_name(&self) -> Option<String> {
        self.0
            .child("run-as")
            .and_then(|run_as| trimmed(run_as, "role-name"))
    }
}

/// `filter-mapping` view.
#[derive(Debug, Clone, Copy)]
pub struct FilterMapping<'a>(pub(crate) &'a Element);

impl<'a> FilterMapping<'a> {
    /// Start building a new filter mapping for `filter_name`.
    pub fn builder(filter_name: impl Into<String>) -> FilterMappingBuilder {
        FilterMappingBuilder {
            filter_name: filter_name.into(),
            url_pattern: None,
            servlet_name: None,
            dispatchers: BTreeSet::new(),
        }
    }

    pub fn filter_name(&self) -> Option<String> {
        trimmed(self.0, "filter-name")
    }

    pub fn url_pattern(&self) -> Option<String> {
        trimmed(self.0, "url-pattern")
    }

    pub fn servlet_name(&self) -> Option<String> {
        trimmed(self.0, "servlet-name")
    }

    pub fn dispatchers(&self) -> BTreeSet<String> {
        self.0
            .elements_named("dispatcher")
            .map(|dispatcher| dispatcher.text().trim().to_string())
            .collect()
    }
}

/// Builder for new `filter-mapping` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterMappingBuilder {
    filter_name: String,
    url_pattern: Option<String>,
    servlet_name: Option<String>,
    dispatchers: BTreeSet<String>,
}

impl FilterMappingBuilder {
    pub fn url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.url_pattern = Some(pattern.into());
        self
    }

    pub fn servlet_name(mut self, name: impl Into<String>) -> Self {
        self.servlet_name = Some(name.into());
        self
    }

    pub fn dispatcher(mut self, dispatcher: impl Into<String>) -> Self {
        self.dispatchers.insert(dispatcher.into());
        self
    }

    pub fn filter_name(&self) -> &str {
        &self.filter_name
    }

    /// Build element.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::Configuration`] unless exactly one of
    ///   URL pattern or servlet name was given.
    pub fn build(self, schema: &DescriptorType) -> Result<Element> {
        let target = match (self.url_pattern, self.servlet_name) {
            (Some(pattern), None) => leaf(schema, "url-pattern", pattern),
            (None, Some(servlet)) => leaf(schema, "servlet-name", servlet),
            (None, None) => {
                return Err(DescriptorError::Configuration(format!(
                    "filter mapping for {:?} needs a url pattern or a servlet name",
                    self.filter_name
                )))
            }
            (Some(_), Some(_)) => {
                return Err(DescriptorError::Configuration(format!(
                    "filter mapping for {:?} cannot have both a url pattern and a servlet name",
                    self.filter_name
                )))
            }
        };

        let mut mapping = node(schema, "filter-mapping")
            .with_child(leaf(schema, "filter-name", self.filter_name))
            .with_child(target);
        for dispatcher in self.dispatchers {
            mapping.push(leaf(schema, "dispatcher", dispatcher));
        }

        Ok(mapping)
    }
}

/// `servlet` view.
#[derive(Debug, Clone, Copy)]
pub struct Servlet<'a>(pub(crate) &'a Element);

impl<'a> Servlet<'a> {
    pub fn create(schema: &DescriptorType, name: &str, class: &str) -> Element {
        node(schema, "servlet")
            .with_child(leaf(schema, "servlet-name", name))
            .with_child(leaf(schema, "servlet-class", class))
    }

    /// Create servlet backed by a JSP file instead of a class.
    pub fn create_jsp(schema: &DescriptorType, name: &str, jsp_file: &str) -> Element {
        node(schema, "servlet")
            .with_child(leaf(schema, "servlet-name", name))
            .with_child(leaf(schema, "jsp-file", jsp_file))
    }

    pub fn name(&self) -> Option<String> {
        trimmed(self.0, "servlet-name")
    }

    pub fn class(&self) -> Option<String> {
        trimmed(self.0, "servlet-class")
    }

    pub fn jsp_file(&self) -> Option<String> {
        trimmed(self.0, "jsp-file")
    }

    pub fn load_on_startup(&self) -> Option<String> {
        trimmed(self.0, "load-on-startup")
    }

    pub fn init_params(&self) -> Vec<InitParam<'a>> {
        init_params(self.0)
    }

    pub fn init_param(&self, name: &str) -> Option<String> {
        init_param(self.0, name)
    }

    pub fn run_as_role_name(&self) -> Option<String> {
        self.0
            .child("run-as")
            .and_then(|run_as| trimmed(run_as, "role-name"))
    }
}

/// `servlet-mapping` view.
#[derive(Debug, Clone, Copy)]
pub struct ServletMapping<'a>(pub(crate) &'a Element);

impl ServletMapping<'_> {
    pub fn create(schema: &DescriptorType, name: &str, url_pattern: &str) -> Element {
        node(schema, "servlet-mapping")
            .with_child(leaf(schema, "servlet-name", name))
            .with_child(leaf(schema, "url-pattern", url_pattern))
    }

    pub fn servlet_name(&self) -> Option<String> {
        trimmed(self.0, "servlet-name")
    }

    pub fn url_pattern(&self) -> Option<String> {
        trimmed(self.0, "url-pattern")
    }
}

/// `listener` view.
#[derive(Debug, Clone, Copy)]
pub struct Listener<'a>(pub(crate) &'a Element);

impl Listener<'_> {
    pub fn create(schema: &DescriptorType, class: &str) -> Element {
        node(schema, "listener").with_child(leaf(schema, "listener-class", class))
    }

    pub fn class(&self) -> Option<String> {
        trimmed(self.0, "listener-class")
    }
}

/// `security-constraint` view.
#[derive(Debug, Clone, Copy)]
pub struct SecurityConstraint<'a>(pub(crate) &'a Element);

impl<'a> SecurityConstraint<'a> {
    /// Create constraint protecting `url_pattern` for `roles`.
    ///
    /// Builds one `web-resource-collection` and one `auth-constraint` with a
    /// `role-name` child per role.
    pub fn create<R>(schema: &DescriptorType, resource_name: &str, url_pattern: &str, roles: R) -> Element
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let collection = node(schema, "web-resource-collection")
            .with_child(leaf(schema, "web-resource-name", resource_name))
            .with_child(leaf(schema, "url-pattern", url_pattern));
        let mut auth = node(schema, "auth-constraint");
        for role in roles {
            auth.push(leaf(schema, "role-name", role.as_ref()));
        }

        node(schema, "security-constraint")
            .with_child(collection)
            .with_child(auth)
    }

    /// Names of every web resource collection.
    pub fn resource_names(&self) -> Vec<String> {
        self.0
            .elements_named("web-resource-collection")
            .filter_map(|collection| trimmed(collection, "web-resource-name"))
            .collect()
    }

    /// URL patterns of every web resource collection.
    pub fn url_patterns(&self) -> Vec<String> {
        self.0
            .elements_named("web-resource-collection")
            .flat_map(|collection| collection.elements_named("url-pattern"))
            .map(|pattern| pattern.text().trim().to_string())
            .collect()
    }

    pub fn auth_constraint(&self) -> Option<AuthConstraint<'a>> {
        self.0.child("auth-constraint").map(AuthConstraint)
    }
}

/// `auth-constraint` view.
#[derive(Debug, Clone, Copy)]
pub struct AuthConstraint<'a>(pub(crate) &'a Element);

impl AuthConstraint<'_> {
    pub fn role_names(&self) -> Vec<String> {
        self.0
            .elements_named("role-name")
            .map(|role| role.text().trim().to_string())
            .collect()
    }
}

/// `mime-mapping` view.
#[derive(Debug, Clone, Copy)]
pub struct MimeMapping<'a>(pub(crate) &'a Element);

impl MimeMapping<'_> {
    pub fn create(schema: &DescriptorType, extension: &str, mime_type: &str) -> Element {
        node(schema, "mime-mapping")
            .with_child(leaf(schema, "extension", extension))
            .with_child(leaf(schema, "mime-type", mime_type))
    }

    pub fn extension(&self) -> Option<String> {
        trimmed(self.0, "extension")
    }

    pub fn mime_type(&self) -> Option<String> {
        trimmed(self.0, "mime-type")
    }
}

/// `error-page` view.
#[derive(Debug, Clone, Copy)]
pub struct ErrorPage<'a>(pub(crate) &'a Element);

impl ErrorPage<'_> {
    pub fn error_code(&self) -> Option<String> {
        trimmed(self.0, "error-code")
    }

    pub fn exception_type(&self) -> Option<String> {
        trimmed(self.0, "exception-type")
    }

    pub fn location(&self) -> Option<String> {
        trimmed(self.0, "location")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Grammar, GrammarRef};
    use pretty_assertions::assert_eq;

    fn schema() -> DescriptorType {
        DescriptorType::builder("test", Grammar::new(GrammarRef::None, "web-app", ["filter"]))
            .namespace("urn:test")
            .build()
    }

    #[test]
    fn filter_mapping_requires_exactly_one_target() {
        let schema = schema();
        let neither = FilterMapping::builder("f").build(&schema);
        let both = FilterMapping::builder("f")
            .url_pattern("/*")
            .servlet_name("s")
            .build(&schema);

        assert!(matches!(neither, Err(DescriptorError::Configuration(_))));
        assert!(matches!(both, Err(DescriptorError::Configuration(_))));
    }

    #[test]
    fn filter_mapping_builder_emits_dispatchers() -> anyhow::Result<()> {
        let schema = schema();
        let element = FilterMapping::builder("f")
            .servlet_name("s")
            .dispatcher("REQUEST")
            .dispatcher("FORWARD")
            .build(&schema)?;
        let view = FilterMapping(&element);

        assert_eq!(view.filter_name(), Some("f".into()));
        assert_eq!(view.servlet_name(), Some("s".into()));
        assert_eq!(view.url_pattern(), None);
        assert_eq!(
            view.dispatchers(),
            BTreeSet::from(["FORWARD".to_string(), "REQUEST".to_string()])
        );
        assert_eq!(element.namespace(), Some("urn:test"));

        Ok(())
    }

    #[test]
    fn security_constraint_layout() {
        let schema = schema();
        let element = SecurityConstraint::create(&schema, "admin", "/admin/*", ["a", "b"]);
        let view = SecurityConstraint(&element);

        assert_eq!(view.resource_names(), vec!["admin".to_string()]);
        assert_eq!(view.url_patterns(), vec!["/admin/*".to_string()]);
        assert_eq!(
            view.auth_constraint().map(|auth| auth.role_names()),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn wrap_dispatches_on_tag_wrapper() {
        let tag = Tag::new("filter", true).with_wrapper(WrapperKind::Filter);
        let plain = Tag::new("taglib", true);
        let element = Filter::create(&schema(), "f", "org.example.F");

        let wrapped = WebXmlElement::wrap(&tag, &element);
        assert!(matches!(wrapped, WebXmlElement::Filter(filter) if filter.class().as_deref() == Some("org.example.F")));
        assert!(matches!(WebXmlElement::wrap(&plain, &element), WebXmlElement::Plain(_)));
        assert_eq!(wrapped.element(), &element);
    }
}
