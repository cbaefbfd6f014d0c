// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tag tables of every supported `web.xml` version.
//!
//! Versions link together as 2.2 → 2.3 → 2.4 → 2.5 → 3.0. Version 2.3 only
//! adds to 2.2. Versions 2.4 and 2.5 move to their own namespaces, so they
//! re-declare the whole table with namespace-qualified identifiers. Version
//! 3.0 shares its namespace with 2.5 and only adds to it.
//!
//! All types are built once by [`Schemas::new`] and then shared through
//! [`Arc`] by every document that uses them.

use super::{
    element::WrapperKind,
    vendor::{self, VendorKind},
    version::{WebXmlVersion, J2EE_NAMESPACE, JAVAEE_NAMESPACE},
};
use crate::descriptor::{DescriptorType, Grammar, GrammarRef, Result, TagSpec};

use std::sync::Arc;

const WEB_APP_ORDER: &[&str] = &[
    "module-name",
    "icon",
    "display-name",
    "description",
    "distributable",
    "context-param",
    "filter",
    "filter-mapping",
    "listener",
    "servlet",
    "servlet-mapping",
    "session-config",
    "mime-mapping",
    "welcome-file-list",
    "error-page",
    "taglib",
    "jsp-config",
    "resource-env-ref",
    "resource-ref",
    "security-constraint",
    "login-config",
    "security-role",
    "env-entry",
    "ejb-ref",
    "ejb-local-ref",
    "service-ref",
    "persistence-context-ref",
    "persistence-unit-ref",
    "message-destination-ref",
    "message-destination",
    "locale-encoding-mapping-list",
    "absolute-ordering",
];

const WEB_APP_22: &[TagSpec] = &[
    TagSpec::single("icon"),
    TagSpec::single("display-name"),
    TagSpec::single("description"),
    TagSpec::single("distributable"),
    TagSpec::multiple("context-param")
        .identified("param-name")
        .wraps(WrapperKind::ContextParam),
    TagSpec::multiple("param-name"),
    TagSpec::multiple("param-value"),
    TagSpec::multiple("servlet")
        .identified("servlet-name")
        .wraps(WrapperKind::Servlet),
    TagSpec::multiple("servlet-name"),
    TagSpec::multiple("servlet-class"),
    TagSpec::multiple("jsp-file"),
    TagSpec::multiple("init-param")
        .identified("param-name")
        .wraps(WrapperKind::InitParam),
    TagSpec::single("load-on-startup"),
    TagSpec::multiple("security-role-ref"),
    TagSpec::multiple("servlet-mapping").wraps(WrapperKind::ServletMapping),
    TagSpec::multiple("url-pattern"),
    TagSpec::single("session-config"),
    TagSpec::multiple("mime-mapping")
        .identified("extension")
        .wraps(WrapperKind::MimeMapping),
    TagSpec::single("welcome-file-list"),
    TagSpec::multiple("welcome-file"),
    TagSpec::multiple("error-page")
        .identified("concat(error-code,'>',exception-type)")
        .wraps(WrapperKind::ErrorPage),
    TagSpec::multiple("taglib").identified("taglib-uri"),
    TagSpec::multiple("resource-ref").identified("res-ref-name"),
    TagSpec::multiple("security-constraint").wraps(WrapperKind::SecurityConstraint),
    TagSpec::multiple("web-resource-collection"),
    TagSpec::multiple("web-resource-name"),
    TagSpec::single("auth-constraint").wraps(WrapperKind::AuthConstraint),
    TagSpec::single("user-data-constraint"),
    TagSpec::single("login-config"),
    TagSpec::single("auth-method"),
    TagSpec::single("realm-name"),
    TagSpec::multiple("security-role").identified("role-name"),
    TagSpec::multiple("role-name"),
    TagSpec::multiple("env-entry").identified("env-entry-name"),
    TagSpec::multiple("ejb-ref").identified("ejb-ref-name"),
    TagSpec::multiple("ejb-ref-name"),
    TagSpec::multiple("ejb-ref-type"),
    TagSpec::multiple("home"),
    TagSpec::multiple("remote"),
    TagSpec::multiple("ejb-link"),
];

const WEB_APP_23: &[TagSpec] = &[
    TagSpec::multiple("filter")
        .identified("filter-name")
        .wraps(WrapperKind::Filter),
    TagSpec::multiple("filter-name"),
    TagSpec::multiple("filter-class"),
    TagSpec::multiple("filter-mapping").wraps(WrapperKind::FilterMapping),
    TagSpec::multiple("listener")
        .identified("listener-class")
        .wraps(WrapperKind::Listener),
    TagSpec::multiple("listener-class"),
    TagSpec::multiple("resource-env-ref").identified("resource-env-ref-name"),
    TagSpec::multiple("ejb-local-ref").identified("ejb-ref-name"),
    TagSpec::multiple("local-home"),
    TagSpec::multiple("local"),
    TagSpec::single("run-as"),
];

const WEB_APP_24: &[TagSpec] = &[
    TagSpec::multiple("dispatcher"),
    TagSpec::single("jsp-config"),
    TagSpec::multiple("service-ref").identified("service-ref-name"),
    TagSpec::multiple("message-destination-ref").identified("message-destination-ref-name"),
    TagSpec::multiple("message-destination").identified("message-destination-name"),
    TagSpec::single("locale-encoding-mapping-list"),
];

const WEB_APP_25: &[TagSpec] = &[
    TagSpec::multiple("persistence-context-ref").identified("persistence-context-ref-name"),
    TagSpec::multiple("persistence-unit-ref").identified("persistence-unit-ref-name"),
];

const WEB_APP_30: &[TagSpec] = &[
    TagSpec::single("module-name"),
    TagSpec::single("absolute-ordering"),
    TagSpec::single("multipart-config"),
    TagSpec::single("async-supported"),
];

/// Registry of every descriptor type the crate understands.
#[derive(Debug, Clone)]
pub struct Schemas {
    web: [Arc<DescriptorType>; 5],
    vendors: Vec<Arc<DescriptorType>>,
}

impl Schemas {
    /// Build every descriptor type.
    ///
    /// # Errors
    ///
    /// - Return [`DescriptorError`](crate::descriptor::DescriptorError) if a
    ///   tag table is inconsistent.
    pub fn new() -> Result<Self> {
        let v22 = Arc::new(
            DescriptorType::builder("web-app 2.2", dtd_grammar(WebXmlVersion::V2_2))
                .register_table(WEB_APP_22)?
                .build(),
        );
        let v23 = Arc::new(
            DescriptorType::builder("web-app 2.3", dtd_grammar(WebXmlVersion::V2_3))
                .base(v22.clone())
                .register_table(WEB_APP_23)?
                .build(),
        );
        let v24 = Arc::new(
            DescriptorType::builder("web-app 2.4", schema_grammar(WebXmlVersion::V2_4))
                .base(v23.clone())
                .namespace(J2EE_NAMESPACE)
                .prefix("j2ee", J2EE_NAMESPACE)
                .qualify_identifiers("j2ee")
                .register_table(WEB_APP_22)?
                .register_table(WEB_APP_23)?
                .register_table(WEB_APP_24)?
                .build(),
        );
        let v25 = Arc::new(
            DescriptorType::builder("web-app 2.5", schema_grammar(WebXmlVersion::V2_5))
                .base(v24.clone())
                .namespace(JAVAEE_NAMESPACE)
                .prefix("javaee", JAVAEE_NAMESPACE)
                .qualify_identifiers("javaee")
                .register_table(WEB_APP_22)?
                .register_table(WEB_APP_23)?
                .register_table(WEB_APP_24)?
                .register_table(WEB_APP_25)?
                .build(),
        );
        let v30 = Arc::new(
            DescriptorType::builder("web-app 3.0", schema_grammar(WebXmlVersion::V3_0))
                .base(v25.clone())
                .namespace(JAVAEE_NAMESPACE)
                .register_table(WEB_APP_30)?
                .build(),
        );

        let vendors = VendorKind::ALL
            .into_iter()
            .map(|kind| vendor::build_schema(kind).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            web: [v22, v23, v24, v25, v30],
            vendors,
        })
    }

    /// Descriptor type of `web.xml` version `version`.
    pub fn web_app(&self, version: WebXmlVersion) -> &Arc<DescriptorType> {
        match version {
            WebXmlVersion::V2_2 => &self.web[0],
            WebXmlVersion::V2_3 => &self.web[1],
            WebXmlVersion::V2_4 => &self.web[2],
            WebXmlVersion::V2_5 => &self.web[3],
            WebXmlVersion::V3_0 => &self.web[4],
        }
    }

    /// Descriptor type of vendor dialect `kind`.
    pub fn vendor(&self, kind: VendorKind) -> &Arc<DescriptorType> {
        &self.vendors[kind.index()]
    }
}

fn dtd_grammar(version: WebXmlVersion) -> Grammar {
    let reference = match (version.public_id(), version.system_id()) {
        (Some(public_id), Some(system_id)) => GrammarRef::Dtd {
            public_id: public_id.into(),
            system_id: system_id.into(),
        },
        _ => GrammarRef::None,
    };
    Grammar::new(reference, "web-app", WEB_APP_ORDER.iter().copied())
}

fn schema_grammar(version: WebXmlVersion) -> Grammar {
    let reference = match (version.namespace(), version.schema_location()) {
        (Some(namespace), Some(location)) => GrammarRef::Schema {
            namespace: namespace.into(),
            location: location.into(),
        },
        _ => GrammarRef::None,
    };
    Grammar::new(reference, "web-app", WEB_APP_ORDER.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Identifier, Tag};
    use pretty_assertions::assert_eq;

    fn identifier(schema: &DescriptorType, tag: &str) -> Option<String> {
        schema
            .tag(tag)
            .and_then(Tag::identifier)
            .map(Identifier::to_string)
    }

    #[test]
    fn version_chain_links_bases() -> anyhow::Result<()> {
        let schemas = Schemas::new()?;
        let v22 = schemas.web_app(WebXmlVersion::V2_2);
        let v23 = schemas.web_app(WebXmlVersion::V2_3);
        let v30 = schemas.web_app(WebXmlVersion::V3_0);

        assert!(v22.tag("filter").is_none());
        assert!(v23.tag("filter").is_some());
        assert!(v23.tag("icon").is_some());
        assert!(v30.extends(v22));
        assert!(v30.tag("absolute-ordering").is_some());
        assert!(schemas.web_app(WebXmlVersion::V2_5).tag("absolute-ordering").is_none());

        Ok(())
    }

    #[test]
    fn namespaced_versions_qualify_identifiers() -> anyhow::Result<()> {
        let schemas = Schemas::new()?;

        assert_eq!(
            identifier(schemas.web_app(WebXmlVersion::V2_3), "filter"),
            Some("filter-name".into())
        );
        assert_eq!(
            identifier(schemas.web_app(WebXmlVersion::V2_4), "filter"),
            Some("j2ee:filter-name".into())
        );
        assert_eq!(
            identifier(schemas.web_app(WebXmlVersion::V3_0), "context-param"),
            Some("javaee:param-name".into())
        );
        assert_eq!(
            identifier(schemas.web_app(WebXmlVersion::V2_5), "error-page"),
            Some("concat(javaee:error-code,'>',javaee:exception-type)".into())
        );

        Ok(())
    }

    #[test]
    fn every_vendor_has_schema() -> anyhow::Result<()> {
        let schemas = Schemas::new()?;
        for kind in VendorKind::ALL {
            assert_eq!(schemas.vendor(kind).name(), kind.file_name());
            assert_eq!(schemas.vendor(kind).grammar().root(), kind.root_name());
        }

        Ok(())
    }
}
