// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Vendor specific deployment descriptors.
//!
//! Application servers keep their own descriptor next to `web.xml` inside
//! `WEB-INF`. Each dialect here gets a [`DescriptorType`] of its own, and
//! knows how to bind an [`EjbRef`] to a JNDI name in its own markup.

use super::{ejb_ref::EjbRef, schema::Schemas};
use crate::{
    descriptor::{
        self, Descriptor, DescriptorError, DescriptorType, Grammar, GrammarRef, Result, TagSpec,
    },
    xml::{Attribute, DocType, Document, Element},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    sync::Arc,
};
use tracing::debug;

const WEBLOGIC_PUBLIC_ID: &str = "-//BEA Systems, Inc.//DTD Web Application 8.1//EN";
const WEBLOGIC_SYSTEM_ID: &str = "http://www.bea.com/servers/wls810/dtd/weblogic810-web-jar.dtd";
const ORION_PUBLIC_ID: &str = "-//Evermind//DTD Orion Web Application 2.3//EN";
const ORION_SYSTEM_ID: &str = "http://www.orionserver.com/dtds/orion-web.dtd";
const JBOSS_PUBLIC_ID: &str = "-//JBoss//DTD Web Application 4.2//EN";
const JBOSS_SYSTEM_ID: &str = "http://www.jboss.org/j2ee/dtd/jboss-web_4_2.dtd";
const RESIN_NAMESPACE: &str = "http://caucho.com/ns/resin";
const WEBSPHERE_NAMESPACE: &str = "webappbnd.xmi";
const XMI_NAMESPACE: &str = "http://www.omg.org/XMI";

const WEBLOGIC_ORDER: &[&str] = &[
    "description",
    "weblogic-version",
    "security-role-assignment",
    "run-as-role-assignment",
    "reference-descriptor",
    "message-destination-descriptor",
    "session-descriptor",
    "jsp-descriptor",
    "auth-filter",
    "container-descriptor",
    "charset-params",
    "virtual-directory-mapping",
    "url-match-map",
    "preprocessor",
    "preprocessor-mapping",
    "security-permission",
    "context-root",
    "wl-dispatch-policy",
    "servlet-descriptor",
    "init-as",
    "destroy-as",
];

const WEBLOGIC_TAGS: &[TagSpec] = &[
    TagSpec::single("description"),
    TagSpec::single("weblogic-version"),
    TagSpec::multiple("security-role-assignment").identified("role-name"),
    TagSpec::multiple("run-as-role-assignment").identified("role-name"),
    TagSpec::single("reference-descriptor"),
    TagSpec::multiple("resource-description").identified("res-ref-name"),
    TagSpec::multiple("resource-env-description").identified("res-env-ref-name"),
    TagSpec::multiple("ejb-reference-description").identified("ejb-ref-name"),
    TagSpec::multiple("ejb-ref-name"),
    TagSpec::multiple("jndi-name"),
    TagSpec::multiple("message-destination-descriptor").identified("message-destination-name"),
    TagSpec::single("session-descriptor"),
    TagSpec::single("jsp-descriptor"),
    TagSpec::single("auth-filter"),
    TagSpec::single("container-descriptor"),
    TagSpec::single("charset-params"),
    TagSpec::multiple("virtual-directory-mapping"),
    TagSpec::single("url-match-map"),
    TagSpec::multiple("preprocessor").identified("preprocessor-name"),
    TagSpec::multiple("preprocessor-mapping"),
    TagSpec::single("security-permission"),
    TagSpec::single("context-root"),
    TagSpec::single("wl-dispatch-policy"),
    TagSpec::multiple("servlet-descriptor").identified("servlet-name"),
    TagSpec::single("init-as"),
    TagSpec::single("destroy-as"),
];

const ORION_TAGS: &[TagSpec] = &[
    TagSpec::multiple("classpath"),
    TagSpec::multiple("context-param-mapping"),
    TagSpec::single("mime-mappings"),
    TagSpec::multiple("virtual-directory"),
    TagSpec::single("access-mask"),
    TagSpec::multiple("servlet-chaining"),
    TagSpec::single("request-tracker"),
    TagSpec::single("session-tracking"),
    TagSpec::multiple("resource-ref-mapping"),
    TagSpec::multiple("env-entry-mapping"),
    TagSpec::multiple("ejb-ref-mapping"),
    TagSpec::multiple("security-role-mapping"),
    TagSpec::multiple("expiration-setting"),
];

const WEBSPHERE_ORDER: &[&str] = &[
    "webapp",
    "resRefBindings",
    "ejbRefBindings",
    "resourceEnvRefBindings",
    "messageDestinationRefBindings",
];

const WEBSPHERE_TAGS: &[TagSpec] = &[
    TagSpec::single("webapp"),
    TagSpec::multiple("resRefBindings"),
    TagSpec::multiple("ejbRefBindings"),
    TagSpec::multiple("resourceEnvRefBindings"),
    TagSpec::multiple("messageDestinationRefBindings"),
];

const RESIN_TAGS: &[TagSpec] = &[
    TagSpec::multiple("jndi-link").identified("jndi-name"),
    TagSpec::multiple("database").identified("jndi-name"),
    TagSpec::multiple("resource").identified("jndi-name"),
    TagSpec::multiple("resource-ref").identified("res-ref-name"),
    TagSpec::multiple("env-entry").identified("env-entry-name"),
    TagSpec::multiple("ejb-ref").identified("ejb-ref-name"),
    TagSpec::multiple("system-property"),
    TagSpec::single("class-loader"),
    TagSpec::single("session-config"),
    TagSpec::multiple("servlet").identified("servlet-name"),
    TagSpec::multiple("servlet-mapping"),
    TagSpec::single("authenticator"),
    TagSpec::multiple("jndi-name"),
    TagSpec::multiple("foreign-name"),
];

const JBOSS_ORDER: &[&str] = &[
    "class-loading",
    "security-domain",
    "context-root",
    "virtual-host",
    "use-session-cookies",
    "replication-config",
    "resource-env-ref",
    "resource-ref",
    "ejb-ref",
    "ejb-local-ref",
    "message-destination-ref",
    "depends",
];

const JBOSS_TAGS: &[TagSpec] = &[
    TagSpec::single("class-loading"),
    TagSpec::single("security-domain"),
    TagSpec::single("context-root"),
    TagSpec::multiple("virtual-host"),
    TagSpec::single("use-session-cookies"),
    TagSpec::single("replication-config"),
    TagSpec::multiple("resource-env-ref").identified("resource-env-ref-name"),
    TagSpec::multiple("resource-ref").identified("res-ref-name"),
    TagSpec::multiple("ejb-ref").identified("ejb-ref-name"),
    TagSpec::multiple("ejb-local-ref").identified("ejb-ref-name"),
    TagSpec::multiple("message-destination-ref").identified("message-destination-ref-name"),
    TagSpec::multiple("depends"),
    TagSpec::multiple("ejb-ref-name"),
    TagSpec::multiple("jndi-name"),
    TagSpec::multiple("local-jndi-name"),
];

/// Supported vendor dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorKind {
    WebLogic,
    Orion,
    WebSphere,
    Resin,
    JBoss,
}

impl VendorKind {
    /// Every dialect, in the order vendor files are loaded.
    pub const ALL: [VendorKind; 5] = [
        Self::WebLogic,
        Self::Orion,
        Self::WebSphere,
        Self::Resin,
        Self::JBoss,
    ];

    /// File name inside `WEB-INF`.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::WebLogic => "weblogic.xml",
            Self::Orion => "orion-web.xml",
            Self::WebSphere => "ibm-web-bnd.xmi",
            Self::Resin => "resin-web.xml",
            Self::JBoss => "jboss-web.xml",
        }
    }

    /// Local name of the root element.
    pub fn root_name(&self) -> &'static str {
        match self {
            Self::WebLogic => "weblogic-web-app",
            Self::Orion => "orion-web-app",
            Self::WebSphere => "WebAppBinding",
            Self::Resin => "web-app",
            Self::JBoss => "jboss-web",
        }
    }

    /// Dialect stored under `WEB-INF/{file_name}`.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.file_name() == file_name)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::WebLogic => 0,
            Self::Orion => 1,
            Self::WebSphere => 2,
            Self::Resin => 3,
            Self::JBoss => 4,
        }
    }

    fn empty_document(&self) -> Document {
        let root = self.root_name();
        match self {
            Self::WebLogic => Document::new(Element::new(root)).with_doctype(DocType::public(
                root,
                WEBLOGIC_PUBLIC_ID,
                WEBLOGIC_SYSTEM_ID,
            )),
            Self::Orion => Document::new(Element::new(root)).with_doctype(DocType::public(
                root,
                ORION_PUBLIC_ID,
                ORION_SYSTEM_ID,
            )),
            Self::JBoss => Document::new(Element::new(root)).with_doctype(DocType::public(
                root,
                JBOSS_PUBLIC_ID,
                JBOSS_SYSTEM_ID,
            )),
            Self::Resin => Document::new(
                Element::with_namespace(root, Some(RESIN_NAMESPACE))
                    .with_attribute("xmlns", RESIN_NAMESPACE),
            ),
            Self::WebSphere => {
                let attributes = [
                    ("xmi:version", "2.0"),
                    ("xmlns:xmi", XMI_NAMESPACE),
                    ("xmlns:webappbnd", WEBSPHERE_NAMESPACE),
                    ("xmlns:webapplication", "webapplication.xmi"),
                    ("xmlns:commonbnd", "commonbnd.xmi"),
                    ("xmlns:common", "common.xmi"),
                    ("xmi:id", "WebApp_ID_Bnd"),
                    ("virtualHostName", "default_host"),
                ]
                .into_iter()
                .map(|(name, value)| Attribute {
                    name: name.into(),
                    value: value.into(),
                })
                .collect();
                let root = Element::from_parts(
                    root.into(),
                    Some("webappbnd".into()),
                    Some(WEBSPHERE_NAMESPACE.into()),
                    attributes,
                )
                .with_child(Element::new("webapp").with_attribute("href", "WEB-INF/web.xml#WebApp_ID"));
                Document::new(root)
            }
        }
    }
}

impl Display for VendorKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.file_name())
    }
}

/// Build descriptor type of vendor dialect `kind`.
///
/// # Errors
///
/// - Return [`DescriptorError`] if the dialect's tag table is inconsistent.
pub(crate) fn build_schema(kind: VendorKind) -> Result<DescriptorType> {
    let root = kind.root_name();
    let schema = match kind {
        VendorKind::WebLogic => DescriptorType::builder(
            "weblogic.xml",
            Grammar::new(
                GrammarRef::Dtd {
                    public_id: WEBLOGIC_PUBLIC_ID.into(),
                    system_id: WEBLOGIC_SYSTEM_ID.into(),
                },
                root,
                WEBLOGIC_ORDER.iter().copied(),
            ),
        )
        .register_table(WEBLOGIC_TAGS)?,
        VendorKind::Orion => DescriptorType::builder(
            "orion-web.xml",
            Grammar::new(
                GrammarRef::Dtd {
                    public_id: ORION_PUBLIC_ID.into(),
                    system_id: ORION_SYSTEM_ID.into(),
                },
                root,
                Vec::<String>::new(),
            ),
        )
        .register_table(ORION_TAGS)?,
        VendorKind::WebSphere => DescriptorType::builder(
            "ibm-web-bnd.xmi",
            Grammar::new(GrammarRef::None, root, WEBSPHERE_ORDER.iter().copied()),
        )
        .register_table(WEBSPHERE_TAGS)?,
        VendorKind::Resin => DescriptorType::builder(
            "resin-web.xml",
            Grammar::new(GrammarRef::None, root, Vec::<String>::new()),
        )
        .namespace(RESIN_NAMESPACE)
        .register_table(RESIN_TAGS)?,
        VendorKind::JBoss => DescriptorType::builder(
            "jboss-web.xml",
            Grammar::new(
                GrammarRef::Dtd {
                    public_id: JBOSS_PUBLIC_ID.into(),
                    system_id: JBOSS_SYSTEM_ID.into(),
                },
                root,
                JBOSS_ORDER.iter().copied(),
            ),
        )
        .register_table(JBOSS_TAGS)?,
    };

    Ok(schema.build())
}

/// Vendor descriptor document.
#[derive(Debug, Clone)]
pub struct VendorDescriptor {
    kind: VendorKind,
    schema: Arc<DescriptorType>,
    document: Document,
}

impl VendorDescriptor {
    /// Construct empty descriptor of dialect `kind`.
    pub fn new(kind: VendorKind, schemas: &Schemas) -> Self {
        Self::from_document(kind, schemas, kind.empty_document())
    }

    /// Wrap already parsed document.
    pub fn from_document(kind: VendorKind, schemas: &Schemas, mut document: Document) -> Self {
        let schema = schemas.vendor(kind).clone();
        descriptor::normalize_namespace(&mut document, &schema);
        Self {
            kind,
            schema,
            document,
        }
    }

    pub fn kind(&self) -> VendorKind {
        self.kind
    }

    /// Bind `ejb` to its JNDI name in this dialect's markup.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError::IllegalState`] if `ejb` has no JNDI name.
    pub fn add_ejb_reference(&mut self, ejb: &EjbRef) -> Result<()> {
        let jndi_name = ejb.jndi_name().ok_or_else(|| {
            DescriptorError::IllegalState(format!(
                "ejb reference {:?} has no jndi name to bind in {}",
                ejb.name(),
                self.kind
            ))
        })?;
        debug!("bind ejb reference {:?} to {jndi_name:?} in {}", ejb.name(), self.kind);

        match self.kind {
            VendorKind::WebLogic => self.add_weblogic_reference(ejb.name(), jndi_name),
            VendorKind::Orion => {
                let mapping = self
                    .schema
                    .create("ejb-ref-mapping")?
                    .with_attribute("name", ejb.name())
                    .with_attribute("location", jndi_name);
                self.insert_element(mapping).map(drop)
            }
            VendorKind::WebSphere => {
                let id = ejb.id();
                let ref_type = if ejb.is_local() { "common:EjbLocalRef" } else { "common:EjbRef" };
                let binding = self
                    .schema
                    .create("ejbRefBindings")?
                    .with_attribute("xmi:id", format!("EjbRefBinding_{id}"))
                    .with_attribute("jndiName", jndi_name)
                    .with_child(
                        Element::new("bindingEjbRef")
                            .with_attribute("xmi:type", ref_type)
                            .with_attribute("href", format!("WEB-INF/web.xml#{id}")),
                    );
                self.insert_element(binding).map(drop)
            }
            VendorKind::Resin => {
                let link = self
                    .schema
                    .create("jndi-link")?
                    .with_child(self.leaf("jndi-name", format!("java:comp/env/{}", ejb.name()))?)
                    .with_child(self.leaf("foreign-name", jndi_name)?);
                self.insert_element(link).map(drop)
            }
            VendorKind::JBoss => {
                let (tag, jndi_tag) = if ejb.is_local() {
                    ("ejb-local-ref", "local-jndi-name")
                } else {
                    ("ejb-ref", "jndi-name")
                };
                let reference = self
                    .schema
                    .create(tag)?
                    .with_child(self.leaf("ejb-ref-name", ejb.name())?)
                    .with_child(self.leaf(jndi_tag, jndi_name)?);
                self.insert_element(reference).map(drop)
            }
        }
    }

    fn add_weblogic_reference(&mut self, name: &str, jndi_name: &str) -> Result<()> {
        let description = self
            .schema
            .create("ejb-reference-description")?
            .with_child(self.leaf("ejb-ref-name", name)?)
            .with_child(self.leaf("jndi-name", jndi_name)?);

        let index = match self.root().position("reference-descriptor") {
            Some(index) => index,
            None => {
                let references = self.schema.create("reference-descriptor")?;
                self.insert_element(references)?
            }
        };
        if let Some(references) = self.document.root_mut().children_mut()[index].as_element_mut() {
            references.push(description);
        }

        Ok(())
    }

    fn leaf(&self, name: &str, text: impl Into<String>) -> Result<Element> {
        Ok(self.schema.create(name)?.with_text(text))
    }
}

impl Descriptor for VendorDescriptor {
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
        self.kind.file_name()
    }
}
