// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Web application deployment descriptor.
//!
//! A [`WebXml`] is a parsed or freshly built `web.xml` bound to the
//! [`DescriptorType`] of its version. Every element category follows the
//! same shape of operations: `add_*` enforces uniqueness and reference
//! integrity, while `*`/`has_*` look elements up and always agree with each
//! other.
//!
//! Vendor descriptors that belong to the same web application travel along
//! with the `WebXml` in insertion order.

pub mod ejb_ref;
pub mod element;
pub mod io;
pub mod schema;
pub mod vendor;
pub mod version;

pub use ejb_ref::{EjbKind, EjbRef};
pub use element::{
    AuthConstraint, ContextParam, ErrorPage, Filter, FilterMapping, FilterMappingBuilder,
    InitParam, Listener, MimeMapping, SecurityConstraint, Servlet, ServletMapping, WebXmlElement,
    WrapperKind,
};
pub use schema::Schemas;
pub use vendor::{VendorDescriptor, VendorKind};
pub use version::WebXmlVersion;

use crate::{
    descriptor::{self, Descriptor, DescriptorError, DescriptorType, Result},
    xml::{Document, Element},
};
use element::{leaf, node};

use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;

/// Web application descriptor document.
#[derive(Debug, Clone)]
pub struct WebXml {
    version: WebXmlVersion,
    schemas: Arc<Schemas>,
    schema: Arc<DescriptorType>,
    document: Document,
    vendors: Vec<VendorDescriptor>,
}

impl WebXml {
    /// Bind an already parsed document to the descriptor type of `version`.
    pub fn from_document(version: WebXmlVersion, schemas: Arc<Schemas>, mut document: Document) -> Self {
        let schema = schemas.web_app(version).clone();
        descriptor::normalize_namespace(&mut document, &schema);
        Self {
            version,
            schemas,
            schema,
            document,
            vendors: Vec::new(),
        }
    }

    pub fn version(&self) -> WebXmlVersion {
        self.version
    }

    /// Registry this document's descriptor type came from.
    pub fn schemas(&self) -> &Arc<Schemas> {
        &self.schemas
    }

    /// Typed views of every instance of tag `name`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UnknownTag`] if `name` is not a tag of
    ///   this version.
    pub fn wrapped(&self, name: &str) -> Result<Vec<WebXmlElement<'_>>> {
        let tag = self.schema.require_tag(name)?;
        Ok(self
            .root()
            .elements_named(name)
            .map(|element| WebXmlElement::wrap(tag, element))
            .collect())
    }

    fn lookup(&self, tag: &str, identifier: &str) -> Option<&Element> {
        self.tag_by_identifier(tag, identifier).ok().flatten()
    }

    fn lookup_mut(&mut self, tag: &str, identifier: &str) -> Option<&mut Element> {
        self.tag_by_identifier_mut(tag, identifier).ok().flatten()
    }

    fn ensure_absent(&self, tag: &str, kind: &'static str, name: &str) -> Result<()> {
        if self.lookup(tag, name).is_some() {
            return Err(DescriptorError::DuplicateName {
                kind,
                name: name.into(),
            });
        }
        Ok(())
    }

    fn ensure_present(&self, tag: &str, kind: &'static str, name: &str) -> Result<()> {
        if self.lookup(tag, name).is_none() {
            return Err(DescriptorError::UndefinedReference {
                kind,
                name: name.into(),
            });
        }
        Ok(())
    }

    /// Add `child` under the `tag` instance identified by `name`.
    ///
    /// The child goes in front of any `load-on-startup`, otherwise last.
    fn add_nested(&mut self, tag: &str, kind: &'static str, name: &str, mut child: Element) -> Result<()> {
        let parent = self
            .lookup_mut(tag, name)
            .ok_or_else(|| DescriptorError::UndefinedReference {
                kind,
                name: name.into(),
            })?;

        child.adopt_namespace(parent.namespace(), parent.prefix());
        match parent.position("load-on-startup") {
            Some(index) => parent.insert(index, child),
            None => parent.push(child),
        }

        Ok(())
    }

    /// Set init parameter `name` of the `tag` instance `owner` to `value`,
    /// adding the parameter when it does not exist yet.
    pub(crate) fn upsert_init_param(&mut self, tag: &str, owner: &str, name: &str, value: &str) -> Result<()> {
        let existing = self.lookup_mut(tag, owner).and_then(|parent| {
            parent.elements_mut().find(|param| {
                param.name() == "init-param"
                    && param.child_text("param-name").is_some_and(|text| text.trim() == name)
            })
        });

        match existing.and_then(|param| param.child_mut("param-value")) {
            Some(param_value) => {
                param_value.set_text(value);
                Ok(())
            }
            None => {
                let param = InitParam::create(&self.schema, name, value);
                self.add_nested(tag, "init param owner", owner, param)
            }
        }
    }

    fn name_of<'a, F>(&'a self, tag: &'a str, name: F) -> Vec<String>
    where
        F: Fn(&'a Element) -> Option<String>,
    {
        self.root().elements_named(tag).filter_map(name).collect()
    }

    // Context parameters.

    /// Add context parameter `name` with `value`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if `name` is taken.
    pub fn add_context_param(&mut self, name: &str, value: &str) -> Result<()> {
        let element = ContextParam::create(&self.schema, name, value);
        self.add_context_param_element(element)
    }

    /// Add already built `context-param` element.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if its name is taken.
    pub fn add_context_param_element(&mut self, element: Element) -> Result<()> {
        let name = ContextParam(&element).name().unwrap_or_default();
        self.ensure_absent("context-param", "context param", &name)?;
        self.insert_element(element).map(drop)
    }

    pub fn context_param(&self, name: &str) -> Option<ContextParam<'_>> {
        self.lookup("context-param", name).map(ContextParam)
    }

    pub fn has_context_param(&self, name: &str) -> bool {
        self.context_param(name).is_some()
    }

    pub fn context_params(&self) -> Vec<ContextParam<'_>> {
        self.root().elements_named("context-param").map(ContextParam).collect()
    }

    pub fn context_param_names(&self) -> Vec<String> {
        self.name_of("context-param", |element| ContextParam(element).name())
    }

    // Filters.

    /// Add filter `name` implemented by `class`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if `name` is taken.
    /// - Return [`DescriptorError::UnknownTag`] if this version has no
    ///   filters.
    pub fn add_filter(&mut self, name: &str, class: &str) -> Result<()> {
        let element = Filter::create(&self.schema, name, class);
        self.add_filter_element(element)
    }

    /// Add already built `filter` element.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if its name is taken.
    pub fn add_filter_element(&mut self, element: Element) -> Result<()> {
        let name = Filter(&element).name().unwrap_or_default();
        self.ensure_absent("filter", "filter", &name)?;
        self.insert_element(element).map(drop)
    }

    pub fn filter(&self, name: &str) -> Option<Filter<'_>> {
        self.lookup("filter", name).map(Filter)
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filter(name).is_some()
    }

    pub fn filters(&self) -> Vec<Filter<'_>> {
        self.root().elements_named("filter").map(Filter).collect()
    }

    pub fn filter_names(&self) -> Vec<String> {
        self.name_of("filter", |element| Filter(element).name())
    }

    /// Names of filters implemented by `class`.
    pub fn filter_names_by_class(&self, class: &str) -> Vec<String> {
        self.filters()
            .into_iter()
            .filter(|filter| filter.class().as_deref() == Some(class))
            .filter_map(|filter| filter.name())
            .collect()
    }

    /// Add init parameter to filter `filter`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UndefinedReference`] if there is no such
    ///   filter.
    pub fn add_filter_init_param(&mut self, filter: &str, name: &str, value: &str) -> Result<()> {
        let param = InitParam::create(&self.schema, name, value);
        self.add_nested("filter", "filter", filter, param)
    }

    pub fn filter_init_param_names(&self, filter: &str) -> Vec<String> {
        self.filter(filter)
            .map(|filter| filter.init_params().iter().filter_map(InitParam::name).collect())
            .unwrap_or_default()
    }

    pub fn filter_init_param(&self, filter: &str, name: &str) -> Option<String> {
        self.filter(filter).and_then(|filter| filter.init_param(name))
    }

    /// Give filter `filter` a `run-as` role, replacing any previous one.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UndefinedReference`] if there is no such
    ///   filter.
    pub fn set_filter_run_as_role_name(&mut self, filter: &str, role: &str) -> Result<()> {
        if let Some(element) = self.lookup_mut("filter", filter) {
            element.remove_elements_named("run-as");
        }
        let run_as = node(&self.schema, "run-as").with_child(leaf(&self.schema, "role-name", role));
        self.add_nested("filter", "filter", filter, run_as)
    }

    /// Add filter mapping.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UndefinedReference`] if the mapped filter
    ///   does not exist.
    /// - Return [`DescriptorError::Configuration`] if the mapping does not
    ///   target exactly one of URL pattern or servlet name.
    pub fn add_filter_mapping(&mut self, mapping: FilterMappingBuilder) -> Result<()> {
        self.ensure_present("filter", "filter", mapping.filter_name())?;
        let element = mapping.build(&self.schema)?;
        if self.version < WebXmlVersion::V2_4 && element.child("dispatcher").is_some() {
            return Err(DescriptorError::Configuration(format!(
                "dispatchers need web.xml 2.4 or later, document is {}",
                self.version
            )));
        }
        self.insert_element(element).map(drop)
    }

    /// Map filter `name` onto `url_pattern`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UndefinedReference`] if no filter named
    ///   `name` exists.
    pub fn add_filter_url_mapping(&mut self, name: &str, url_pattern: &str) -> Result<()> {
        self.add_filter_mapping(FilterMapping::builder(name).url_pattern(url_pattern))
    }

    /// Mappings of filter `name`, in document order.
    pub fn filter_mappings(&self, name: &str) -> Vec<FilterMapping<'_>> {
        self.root()
            .elements_named("filter-mapping")
            .map(FilterMapping)
            .filter(|mapping| mapping.filter_name().as_deref() == Some(name))
            .collect()
    }

    /// URL patterns filter `name` is mapped onto.
    pub fn filter_mapping_patterns(&self, name: &str) -> Vec<String> {
        self.filter_mappings(name)
            .iter()
            .filter_map(FilterMapping::url_pattern)
            .collect()
    }

    /// Every dispatcher used by the mappings of filter `name`.
    pub fn filter_mapping_dispatchers(&self, name: &str) -> BTreeSet<String> {
        self.filter_mappings(name)
            .iter()
            .flat_map(FilterMapping::dispatchers)
            .collect()
    }

    // Servlets.

    /// Add servlet `name` implemented by `class`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if `name` is taken.
    pub fn add_servlet(&mut self, name: &str, class: &str) -> Result<()> {
        let element = Servlet::create(&self.schema, name, class);
        self.add_servlet_element(element)
    }

    /// Add servlet `name` backed by JSP file `jsp_file`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if a servlet named `name`
    ///   exists.
    pub fn add_jsp_file(&mut self, name: &str, jsp_file: &str) -> Result<()> {
        let element = Servlet::create_jsp(&self.schema, name, jsp_file);
        self.add_servlet_element(element)
    }

    /// Add already built `servlet` element.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if its name is taken.
    pub fn add_servlet_element(&mut self, element: Element) -> Result<()> {
        let name = Servlet(&element).name().unwrap_or_default();
        self.ensure_absent("servlet", "servlet", &name)?;
        self.insert_element(element).map(drop)
    }

    pub fn servlet(&self, name: &str) -> Option<Servlet<'_>> {
        self.lookup("servlet", name).map(Servlet)
    }

    pub fn has_servlet(&self, name: &str) -> bool {
        self.servlet(name).is_some()
    }

    pub fn servlets(&self) -> Vec<Servlet<'_>> {
        self.root().elements_named("servlet").map(Servlet).collect()
    }

    pub fn servlet_names(&self) -> Vec<String> {
        self.name_of("servlet", |element| Servlet(element).name())
    }

    /// Names of servlets implemented by `class`.
    pub fn servlet_names_by_class(&self, class: &str) -> Vec<String> {
        self.servlets()
            .into_iter()
            .filter(|servlet| servlet.class().as_deref() == Some(class))
            .filter_map(|servlet| servlet.name())
            .collect()
    }

    /// Names of servlets backed by JSP file `jsp_file`.
    pub fn servlet_names_by_jsp_file(&self, jsp_file: &str) -> Vec<String> {
        self.servlets()
            .into_iter()
            .filter(|servlet| servlet.jsp_file().as_deref() == Some(jsp_file))
            .filter_map(|servlet| servlet.name())
            .collect()
    }

    /// Add init parameter to servlet `servlet`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UndefinedReference`] if there is no such
    ///   servlet.
    pub fn add_servlet_init_param(&mut self, servlet: &str, name: &str, value: &str) -> Result<()> {
        let param = InitParam::create(&self.schema, name, value);
        self.add_nested("servlet", "servlet", servlet, param)
    }

    pub fn servlet_init_param_names(&self, servlet: &str) -> Vec<String> {
        self.servlet(servlet)
            .map(|servlet| servlet.init_params().iter().filter_map(InitParam::name).collect())
            .unwrap_or_default()
    }

    pub fn servlet_init_param(&self, servlet: &str, name: &str) -> Option<String> {
        self.servlet(servlet).and_then(|servlet| servlet.init_param(name))
    }

    /// Give servlet `servlet` a `run-as` role, replacing any previous one.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UndefinedReference`] if there is no such
    ///   servlet.
    pub fn add_servlet_run_as_role_name(&mut self, servlet: &str, role: &str) -> Result<()> {
        if let Some(element) = self.lookup_mut("servlet", servlet) {
            element.remove_elements_named("run-as");
        }
        let run_as = node(&self.schema, "run-as").with_child(leaf(&self.schema, "role-name", role));
        self.add_nested("servlet", "servlet", servlet, run_as)
    }

    /// Map servlet `name` onto `url_pattern`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::UndefinedReference`] if no servlet named
    ///   `name` exists.
    pub fn add_servlet_mapping(&mut self, name: &str, url_pattern: &str) -> Result<()> {
        self.ensure_present("servlet", "servlet", name)?;
        let element = ServletMapping::create(&self.schema, name, url_pattern);
        self.insert_element(element).map(drop)
    }

    /// Mappings of servlet `name`, in document order.
    pub fn servlet_mappings(&self, name: &str) -> Vec<ServletMapping<'_>> {
        self.root()
            .elements_named("servlet-mapping")
            .map(ServletMapping)
            .filter(|mapping| mapping.servlet_name().as_deref() == Some(name))
            .collect()
    }

    /// URL patterns servlet `name` is mapped onto.
    pub fn servlet_mapping_patterns(&self, name: &str) -> Vec<String> {
        self.servlet_mappings(name)
            .iter()
            .filter_map(ServletMapping::url_pattern)
            .collect()
    }

    // Listeners.

    /// Add listener implemented by `class`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if `class` is already a
    ///   listener.
    pub fn add_listener(&mut self, class: &str) -> Result<()> {
        self.ensure_absent("listener", "listener", class)?;
        let element = Listener::create(&self.schema, class);
        self.insert_element(element).map(drop)
    }

    pub fn listener(&self, class: &str) -> Option<Listener<'_>> {
        self.lookup("listener", class).map(Listener)
    }

    pub fn has_listener(&self, class: &str) -> bool {
        self.listener(class).is_some()
    }

    pub fn listener_classes(&self) -> Vec<String> {
        self.name_of("listener", |element| Listener(element).class())
    }

    // Security.

    /// Protect `url_pattern` so that only `roles` may access it.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateConstraint`] if a constraint for
    ///   `url_pattern` exists.
    pub fn add_security_constraint<R>(&mut self, resource_name: &str, url_pattern: &str, roles: R) -> Result<()>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        if self.has_security_constraint(url_pattern) {
            return Err(DescriptorError::DuplicateConstraint(url_pattern.into()));
        }
        let element = SecurityConstraint::create(&self.schema, resource_name, url_pattern, roles);
        self.insert_element(element).map(drop)
    }

    /// Constraint covering `url_pattern`.
    pub fn security_constraint(&self, url_pattern: &str) -> Option<SecurityConstraint<'_>> {
        self.security_constraints()
            .into_iter()
            .find(|constraint| constraint.url_patterns().iter().any(|pattern| pattern == url_pattern))
    }

    pub fn has_security_constraint(&self, url_pattern: &str) -> bool {
        self.security_constraint(url_pattern).is_some()
    }

    pub fn security_constraints(&self) -> Vec<SecurityConstraint<'_>> {
        self.root()
            .elements_named("security-constraint")
            .map(SecurityConstraint)
            .collect()
    }

    /// Replace login configuration.
    pub fn set_login_config(&mut self, auth_method: &str, realm_name: Option<&str>) -> Result<()> {
        let mut login = node(&self.schema, "login-config").with_child(leaf(&self.schema, "auth-method", auth_method));
        if let Some(realm) = realm_name {
            login.push(leaf(&self.schema, "realm-name", realm));
        }
        self.replace_element(login).map(drop)
    }

    pub fn login_config(&self) -> Option<&Element> {
        self.root().child("login-config")
    }

    pub fn login_config_auth_method(&self) -> Option<String> {
        self.login_config()
            .and_then(|login| login.child_text("auth-method"))
            .map(|text| text.trim().to_string())
    }

    pub fn login_config_realm_name(&self) -> Option<String> {
        self.login_config()
            .and_then(|login| login.child_text("realm-name"))
            .map(|text| text.trim().to_string())
    }

    /// Declare security role `name`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateRole`] if `name` is declared.
    pub fn add_security_role(&mut self, name: &str) -> Result<()> {
        if self.has_security_role(name) {
            return Err(DescriptorError::DuplicateRole(name.into()));
        }
        let element = node(&self.schema, "security-role").with_child(leaf(&self.schema, "role-name", name));
        self.insert_element(element).map(drop)
    }

    pub fn security_role(&self, name: &str) -> Option<&Element> {
        self.lookup("security-role", name)
    }

    pub fn has_security_role(&self, name: &str) -> bool {
        self.security_role(name).is_some()
    }

    pub fn security_role_names(&self) -> Vec<String> {
        self.name_of("security-role", |element| {
            element.child_text("role-name").map(|name| name.trim().to_string())
        })
    }

    // Enterprise beans.

    /// Add reference to an enterprise bean.
    ///
    /// A reference linked through its EJB name carries an `ejb-link`. A
    /// reference bound through its JNDI name is handed to every attached
    /// vendor descriptor instead.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::IllegalState`] unless exactly one of EJB
    ///   name or JNDI name is set.
    /// - Return [`DescriptorError::UnknownTag`] for local references on
    ///   versions before 2.3.
    pub fn add_ejb_ref(&mut self, ejb: &EjbRef) -> Result<()> {
        let (tag, home, interface) = if ejb.is_local() {
            ("ejb-local-ref", "local-home", "local")
        } else {
            ("ejb-ref", "home", "remote")
        };
        let mut element = node(&self.schema, tag)
            .with_attribute("id", ejb.id())
            .with_child(leaf(&self.schema, "ejb-ref-name", ejb.name()))
            .with_child(leaf(&self.schema, "ejb-ref-type", ejb.kind().to_string()))
            .with_child(leaf(&self.schema, home, ejb.home_interface()))
            .with_child(leaf(&self.schema, interface, ejb.interface()));

        match (ejb.ejb_name(), ejb.jndi_name()) {
            (Some(link), None) => {
                element.push(leaf(&self.schema, "ejb-link", link));
                self.insert_element(element)?;
            }
            (None, Some(jndi_name)) => {
                debug!("forward {:?} to {} vendor descriptors", jndi_name, self.vendors.len());
                // INVARIANT: Vendor bindings and web.xml change together or not at all.
                let mut vendors = self.vendors.clone();
                for vendor in &mut vendors {
                    vendor.add_ejb_reference(ejb)?;
                }
                self.insert_element(element)?;
                self.vendors = vendors;
            }
            (None, None) => {
                return Err(DescriptorError::IllegalState(format!(
                    "ejb reference {:?} needs an ejb name or a jndi name",
                    ejb.name()
                )))
            }
            (Some(_), Some(_)) => {
                return Err(DescriptorError::IllegalState(format!(
                    "ejb reference {:?} cannot have both an ejb name and a jndi name",
                    ejb.name()
                )))
            }
        }

        Ok(())
    }

    /// Reference named `name`, local or remote.
    pub fn ejb_ref(&self, name: &str) -> Option<&Element> {
        self.lookup("ejb-local-ref", name)
            .or_else(|| self.lookup("ejb-ref", name))
    }

    pub fn has_ejb_ref(&self, name: &str) -> bool {
        self.ejb_ref(name).is_some()
    }

    // MIME mappings.

    /// Map file `extension` onto `mime_type`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if `extension` is mapped.
    pub fn add_mime_mapping(&mut self, extension: &str, mime_type: &str) -> Result<()> {
        self.ensure_absent("mime-mapping", "mime mapping", extension)?;
        let element = MimeMapping::create(&self.schema, extension, mime_type);
        self.insert_element(element).map(drop)
    }

    pub fn mime_mapping(&self, extension: &str) -> Option<MimeMapping<'_>> {
        self.lookup("mime-mapping", extension).map(MimeMapping)
    }

    pub fn has_mime_mapping(&self, extension: &str) -> bool {
        self.mime_mapping(extension).is_some()
    }

    pub fn mime_mappings(&self) -> Vec<MimeMapping<'_>> {
        self.root().elements_named("mime-mapping").map(MimeMapping).collect()
    }

    // Error pages.

    /// Show `location` for HTTP status `code`.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if `code` has a page.
    pub fn add_error_code_page(&mut self, code: &str, location: &str) -> Result<()> {
        self.add_error_page("error-code", code, format!("{code}>"), location)
    }

    /// Show `location` when `exception_type` is thrown.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if `exception_type` has
    ///   a page.
    pub fn add_exception_page(&mut self, exception_type: &str, location: &str) -> Result<()> {
        self.add_error_page("exception-type", exception_type, format!(">{exception_type}"), location)
    }

    fn add_error_page(&mut self, key: &str, value: &str, identifier: String, location: &str) -> Result<()> {
        self.ensure_absent("error-page", "error page", &identifier)?;
        let element = node(&self.schema, "error-page")
            .with_child(leaf(&self.schema, key, value))
            .with_child(leaf(&self.schema, "location", location));
        self.insert_element(element).map(drop)
    }

    pub fn error_page_for_code(&self, code: &str) -> Option<ErrorPage<'_>> {
        self.lookup("error-page", &format!("{code}>")).map(ErrorPage)
    }

    pub fn error_page_for_exception(&self, exception_type: &str) -> Option<ErrorPage<'_>> {
        self.lookup("error-page", &format!(">{exception_type}")).map(ErrorPage)
    }

    pub fn error_pages(&self) -> Vec<ErrorPage<'_>> {
        self.root().elements_named("error-page").map(ErrorPage).collect()
    }

    // Welcome files.

    /// Append `file` to the welcome file list, creating the list if needed.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::DuplicateName`] if `file` is listed.
    pub fn add_welcome_file(&mut self, file: &str) -> Result<()> {
        if self.welcome_files().iter().any(|listed| listed == file) {
            return Err(DescriptorError::DuplicateName {
                kind: "welcome file",
                name: file.into(),
            });
        }

        let mut welcome = leaf(&self.schema, "welcome-file", file);
        let index = match self.root().position("welcome-file-list") {
            Some(index) => index,
            None => {
                let list = node(&self.schema, "welcome-file-list");
                self.insert_element(list)?
            }
        };
        if let Some(list) = self.document.root_mut().children_mut()[index].as_element_mut() {
            welcome.adopt_namespace(list.namespace(), list.prefix());
            list.push(welcome);
        }

        Ok(())
    }

    pub fn welcome_files(&self) -> Vec<String> {
        self.root()
            .child("welcome-file-list")
            .map(|list| {
                list.elements_named("welcome-file")
                    .map(|file| file.text().trim().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    // Vendor descriptors.

    /// Vendor descriptors in the order they were attached.
    pub fn vendor_descriptors(&self) -> &[VendorDescriptor] {
        &self.vendors
    }

    pub fn vendor_descriptor(&self, kind: VendorKind) -> Option<&VendorDescriptor> {
        self.vendors.iter().find(|vendor| vendor.kind() == kind)
    }

    pub fn vendor_descriptor_mut(&mut self, kind: VendorKind) -> Option<&mut VendorDescriptor> {
        self.vendors.iter_mut().find(|vendor| vendor.kind() == kind)
    }

    /// Attach vendor descriptor, replacing one of the same dialect in place.
    pub fn add_vendor_descriptor(&mut self, vendor: VendorDescriptor) {
        match self.vendor_descriptor_mut(vendor.kind()) {
            Some(existing) => *existing = vendor,
            None => self.vendors.push(vendor),
        }
    }
}

impl Descriptor for WebXml {
    fn schema(&self) -> &DescriptorType {
        &self.schema
    }

    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn file_name(&self) -> &str {
        "web.xml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::writer::write_string;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn web_xml(version: WebXmlVersion) -> anyhow::Result<WebXml> {
        let schemas = Arc::new(Schemas::new()?);
        Ok(io::new_web_xml(&schemas, version))
    }

    fn parse(xml: &str) -> anyhow::Result<WebXml> {
        let schemas = Arc::new(Schemas::new()?);
        Ok(io::parse_web_xml_str(xml, &schemas)?)
    }

    fn names(element: &Element) -> Vec<&str> {
        element.elements().map(Element::name).collect()
    }

    #[test_case(WebXmlVersion::V2_3; "dtd based")]
    #[test_case(WebXmlVersion::V2_5; "schema based")]
    #[test]
    fn add_rejects_duplicate_names(version: WebXmlVersion) -> anyhow::Result<()> {
        let mut web_xml = web_xml(version)?;

        assert!(!web_xml.has_filter("f"));
        web_xml.add_filter("f", "org.example.F")?;
        assert!(web_xml.has_filter("f"));
        assert!(matches!(
            web_xml.add_filter("f", "org.example.G"),
            Err(DescriptorError::DuplicateName { .. })
        ));

        web_xml.add_servlet("s", "org.example.S")?;
        assert!(matches!(
            web_xml.add_servlet("s", "org.example.T"),
            Err(DescriptorError::DuplicateName { .. })
        ));

        web_xml.add_context_param("p", "1")?;
        assert!(matches!(
            web_xml.add_context_param("p", "2"),
            Err(DescriptorError::DuplicateName { .. })
        ));

        web_xml.add_security_role("admin")?;
        assert!(matches!(
            web_xml.add_security_role("admin"),
            Err(DescriptorError::DuplicateRole(_))
        ));

        Ok(())
    }

    #[test]
    fn add_jsp_file_checks_servlet_names() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_5)?;
        web_xml.add_filter("shared", "org.example.F")?;
        web_xml.add_jsp_file("shared", "/index.jsp")?;
        assert!(matches!(
            web_xml.add_jsp_file("shared", "/other.jsp"),
            Err(DescriptorError::DuplicateName { .. })
        ));
        assert_eq!(web_xml.servlet_names_by_jsp_file("/index.jsp"), vec!["shared".to_string()]);

        Ok(())
    }

    #[test]
    fn mappings_require_defined_targets() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_4)?;
        assert!(matches!(
            web_xml.add_filter_url_mapping("f", "/*"),
            Err(DescriptorError::UndefinedReference { .. })
        ));
        assert!(matches!(
            web_xml.add_servlet_mapping("s", "/s"),
            Err(DescriptorError::UndefinedReference { .. })
        ));
        assert!(matches!(
            web_xml.add_filter_init_param("f", "x", "1"),
            Err(DescriptorError::UndefinedReference { .. })
        ));

        web_xml.add_filter("f", "org.example.F")?;
        web_xml.add_filter_url_mapping("f", "/*")?;
        web_xml.add_filter_mapping(FilterMapping::builder("f").servlet_name("s").dispatcher("FORWARD"))?;

        assert_eq!(web_xml.filter_mapping_patterns("f"), vec!["/*".to_string()]);
        assert_eq!(
            web_xml.filter_mapping_dispatchers("f"),
            BTreeSet::from(["FORWARD".to_string()])
        );

        Ok(())
    }

    #[test]
    fn dispatchers_need_version_2_4() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_3)?;
        web_xml.add_filter("f", "org.example.F")?;
        let result = web_xml.add_filter_mapping(FilterMapping::builder("f").url_pattern("/*").dispatcher("REQUEST"));
        assert!(matches!(result, Err(DescriptorError::Configuration(_))));

        Ok(())
    }

    #[test]
    fn filters_do_not_exist_before_2_3() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_2)?;
        assert!(!web_xml.has_filter("f"));
        assert!(matches!(
            web_xml.add_filter("f", "org.example.F"),
            Err(DescriptorError::UnknownTag { .. })
        ));

        Ok(())
    }

    #[test]
    fn init_params_go_before_load_on_startup() -> anyhow::Result<()> {
        let mut web_xml = parse(indoc! {r#"
            <web-app>
                <servlet>
                    <servlet-name>s</servlet-name>
                    <servlet-class>org.example.S</servlet-class>
                    <load-on-startup>1</load-on-startup>
                </servlet>
            </web-app>
        "#})?;
        web_xml.add_servlet_init_param("s", "x", "1")?;
        web_xml.add_servlet_run_as_role_name("s", "admin")?;

        let servlet = web_xml.servlet("s").map(|servlet| names(servlet.0));
        assert_eq!(
            servlet,
            Some(vec!["servlet-name", "servlet-class", "init-param", "run-as", "load-on-startup"])
        );
        assert_eq!(web_xml.servlet_init_param("s", "x"), Some("1".into()));
        assert_eq!(web_xml.servlet("s").and_then(|s| s.run_as_role_name()), Some("admin".into()));

        Ok(())
    }

    #[test]
    fn elements_land_in_grammar_order() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_5)?;
        web_xml.add_security_role("admin")?;
        web_xml.add_servlet("s", "org.example.S")?;
        web_xml.add_context_param("p", "1")?;
        web_xml.add_servlet_mapping("s", "/s")?;
        web_xml.add_filter("f", "org.example.F")?;
        web_xml.add_listener("org.example.L")?;

        assert_eq!(
            names(web_xml.root()),
            vec!["context-param", "filter", "listener", "servlet", "servlet-mapping", "security-role"]
        );

        Ok(())
    }

    #[test]
    fn security_constraint_and_login_config() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_3)?;
        web_xml.add_security_constraint("admin area", "/admin/*", ["admin", "root"])?;
        assert!(matches!(
            web_xml.add_security_constraint("again", "/admin/*", ["admin"]),
            Err(DescriptorError::DuplicateConstraint(_))
        ));

        let roles = web_xml
            .security_constraint("/admin/*")
            .and_then(|constraint| constraint.auth_constraint())
            .map(|auth| auth.role_names());
        assert_eq!(roles, Some(vec!["admin".to_string(), "root".to_string()]));

        web_xml.set_login_config("BASIC", Some("realmA"))?;
        web_xml.set_login_config("FORM", None)?;
        assert_eq!(web_xml.tags("login-config").len(), 1);
        assert_eq!(web_xml.login_config_auth_method(), Some("FORM".into()));
        assert_eq!(web_xml.login_config_realm_name(), None);

        Ok(())
    }

    #[test]
    fn ejb_ref_needs_exactly_one_binding() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_5)?;
        let neither = EjbRef::new("ejb/Foo", "FooHome", "Foo");
        assert!(matches!(
            web_xml.add_ejb_ref(&neither),
            Err(DescriptorError::IllegalState(_))
        ));

        let both = neither.clone().with_ejb_name("Foo").with_jndi_name("jndi/Foo");
        assert!(matches!(
            web_xml.add_ejb_ref(&both),
            Err(DescriptorError::IllegalState(_))
        ));
        assert!(!web_xml.has_ejb_ref("ejb/Foo"));

        Ok(())
    }

    #[test]
    fn ejb_ref_links_by_name() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_3)?;
        web_xml.add_ejb_ref(&EjbRef::new("ejb/Foo", "FooHome", "Foo").with_ejb_name("FooBean"))?;

        let reference = web_xml.ejb_ref("ejb/Foo");
        assert_eq!(
            reference.map(names),
            Some(vec!["ejb-ref-name", "ejb-ref-type", "local-home", "local", "ejb-link"])
        );
        assert_eq!(reference.and_then(|r| r.attribute("id")), Some("ejb_Foo"));

        Ok(())
    }

    #[test]
    fn ejb_ref_forwards_jndi_name_to_vendors() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_4)?;
        let schemas = web_xml.schemas().clone();
        web_xml.add_vendor_descriptor(VendorDescriptor::new(VendorKind::JBoss, &schemas));
        web_xml.add_vendor_descriptor(VendorDescriptor::new(VendorKind::WebLogic, &schemas));

        let ejb = EjbRef::new("ejb/Foo", "FooHome", "Foo").with_jndi_name("jndi/Foo").remote();
        web_xml.add_ejb_ref(&ejb)?;

        assert_eq!(web_xml.ejb_ref("ejb/Foo").map(names), Some(vec!["ejb-ref-name", "ejb-ref-type", "home", "remote"]));
        let kinds: Vec<_> = web_xml.vendor_descriptors().iter().map(VendorDescriptor::kind).collect();
        assert_eq!(kinds, vec![VendorKind::JBoss, VendorKind::WebLogic]);
        let jboss = web_xml.vendor_descriptor(VendorKind::JBoss);
        assert!(jboss.is_some_and(|jboss| jboss.tag_by_identifier("ejb-ref", "ejb/Foo").is_ok_and(|r| r.is_some())));

        Ok(())
    }

    #[test]
    fn failed_ejb_ref_leaves_vendors_untouched() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_2)?;
        let schemas = web_xml.schemas().clone();
        web_xml.add_vendor_descriptor(VendorDescriptor::new(VendorKind::JBoss, &schemas));

        let ejb = EjbRef::new("ejb/Foo", "FooHome", "Foo").with_jndi_name("jndi/Foo");
        assert!(matches!(
            web_xml.add_ejb_ref(&ejb),
            Err(DescriptorError::UnknownTag { .. })
        ));

        assert!(!web_xml.has_ejb_ref("ejb/Foo"));
        let jboss = web_xml.vendor_descriptor(VendorKind::JBoss);
        assert!(jboss.is_some_and(|jboss| jboss.tags("ejb-local-ref").is_empty()));

        Ok(())
    }

    #[test]
    fn extra_categories() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V3_0)?;
        web_xml.add_mime_mapping("svg", "image/svg+xml")?;
        web_xml.add_error_code_page("404", "/missing.html")?;
        web_xml.add_exception_page("java.lang.Throwable", "/oops.html")?;
        web_xml.add_welcome_file("index.html")?;
        web_xml.add_welcome_file("index.jsp")?;

        assert_eq!(web_xml.mime_mapping("svg").and_then(|m| m.mime_type()), Some("image/svg+xml".into()));
        assert!(web_xml.add_mime_mapping("svg", "text/plain").is_err());
        assert_eq!(web_xml.error_page_for_code("404").and_then(|p| p.location()), Some("/missing.html".into()));
        assert_eq!(
            web_xml.error_page_for_exception("java.lang.Throwable").and_then(|p| p.location()),
            Some("/oops.html".into())
        );
        assert!(web_xml.add_error_code_page("404", "/again.html").is_err());
        assert_eq!(web_xml.welcome_files(), vec!["index.html".to_string(), "index.jsp".to_string()]);
        assert_eq!(web_xml.tags("welcome-file-list").len(), 1);

        Ok(())
    }

    #[test]
    fn prefixed_root_keeps_prefix_on_new_elements() -> anyhow::Result<()> {
        let mut web_xml = parse(indoc! {r#"
            <j2ee:web-app xmlns:j2ee="http://java.sun.com/xml/ns/j2ee" version="2.4">
                <j2ee:filter>
                    <j2ee:filter-name>f</j2ee:filter-name>
                    <j2ee:filter-class>org.example.F</j2ee:filter-class>
                </j2ee:filter>
            </j2ee:web-app>
        "#})?;
        assert!(web_xml.has_filter("f"));
        web_xml.add_filter_init_param("f", "x", "1")?;
        web_xml.add_listener("org.example.L")?;

        let output = write_string(web_xml.document())?;
        assert!(output.contains("<j2ee:param-name>x</j2ee:param-name>"));
        assert!(output.contains("<j2ee:listener-class>org.example.L</j2ee:listener-class>"));

        Ok(())
    }

    #[test]
    fn wrapped_picks_typed_views() -> anyhow::Result<()> {
        let mut web_xml = web_xml(WebXmlVersion::V2_5)?;
        web_xml.add_listener("org.example.L")?;
        let wrapped = web_xml.wrapped("listener")?;
        assert!(matches!(wrapped.as_slice(), [WebXmlElement::Listener(_)]));
        assert!(web_xml.wrapped("no-such-tag").is_err());

        Ok(())
    }
}
