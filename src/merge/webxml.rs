// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Merge pipeline of `web.xml` documents.

use super::{merge_additive, merge_identified, MergeError, MergeStrategy, Result, TagMerger};
use crate::{
    descriptor::Descriptor,
    webapp::{VendorKind, WebXml, WebXmlVersion},
    xml::Element,
};

use tracing::{debug, info, instrument, warn};

/// Merges donor `web.xml` documents into an authoritative one.
///
/// Categories are walked in a fixed order. Any failure aborts the merge
/// with [`MergeError::Failure`] naming the category, leaving whatever the
/// earlier categories merged in place.
#[derive(Debug, Clone, Default)]
pub struct WebXmlMerger {
    context_params: MergeStrategy,
    listeners: MergeStrategy,
    vendors: TagMerger,
}

impl WebXmlMerger {
    /// Construct merger preserving the authoritative side on collisions.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_param_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.context_params = strategy;
        self
    }

    pub fn with_listener_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.listeners = strategy;
        self
    }

    /// Use `merger` for vendor descriptors present on both sides.
    pub fn with_vendor_merger(mut self, merger: TagMerger) -> Self {
        self.vendors = merger;
        self
    }

    /// Merge `donor` into `target`.
    ///
    /// # Errors
    ///
    /// - Return [`MergeError::Failure`] if any category fails to merge.
    #[instrument(skip_all, level = "debug")]
    pub fn merge(&self, target: &mut WebXml, donor: &WebXml) -> Result<()> {
        if target.version() < donor.version() {
            warn!(
                "merging web.xml {} into {}, elements the older version lacks may be dropped",
                donor.version(),
                target.version()
            );
        }
        let supports_2_3 = target.version() >= WebXmlVersion::V2_3;

        let count = step(
            "context-param",
            merge_identified(target, donor, "context-param", &self.context_params),
        )?;
        debug!("merged {count} context params");

        if supports_2_3 {
            step("filter", merge_filters(target, donor))?;
        }
        step("servlet", merge_servlets(target, donor))?;

        if supports_2_3 {
            step("resource-env-ref", merge_additive(target, donor, "resource-env-ref"))?;
        }

        let count = step(
            "listener",
            merge_identified(target, donor, "listener", &self.listeners),
        )?;
        debug!("merged {count} listeners");

        step("resource-ref", merge_additive(target, donor, "resource-ref"))?;
        step("security-constraint", merge_additive(target, donor, "security-constraint"))?;
        step("login-config", merge_login_config(target, donor))?;
        step("security-role", merge_security_roles(target, donor))?;
        step("env-entry", merge_additive(target, donor, "env-entry"))?;
        step("ejb-ref", merge_additive(target, donor, "ejb-ref"))?;
        if supports_2_3 {
            step("ejb-local-ref", merge_additive(target, donor, "ejb-local-ref"))?;
        }
        step(
            "mime-mapping",
            merge_identified(target, donor, "mime-mapping", &MergeStrategy::Preserve),
        )?;
        step("vendor descriptors", self.merge_vendors(target, donor))?;

        info!("merged web.xml {} into {}", donor.version(), target.version());
        Ok(())
    }

    fn merge_vendors(&self, target: &mut WebXml, donor: &WebXml) -> Result<usize> {
        let mut count = 0;
        for kind in VendorKind::ALL {
            let Some(right) = donor.vendor_descriptor(kind) else {
                continue;
            };

            match target.vendor_descriptor_mut(kind) {
                Some(left) => count += self.vendors.merge(left, right)?,
                None => {
                    debug!("adopt {kind} from donor");
                    target.add_vendor_descriptor(right.clone());
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

fn step<T>(name: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|source| MergeError::Failure {
        step: name,
        source: Box::new(source),
    })
}

fn merge_filters(target: &mut WebXml, donor: &WebXml) -> Result<usize> {
    let dispatchers = target.version() >= WebXmlVersion::V2_4;
    let mut count = 0;
    for filter in donor.filters() {
        let Some(name) = filter.name() else {
            continue;
        };

        if target.has_filter(&name) {
            for param in filter.init_params() {
                if let (Some(param_name), Some(value)) = (param.name(), param.value()) {
                    target.upsert_init_param("filter", &name, &param_name, &value)?;
                }
            }
            if let Some(role) = filter.run_as_role_name() {
                target.set_filter_run_as_role_name(&name, &role)?;
            }
        } else {
            target.add_filter_element(filter.0.clone())?;
        }
        count += 1;

        for mapping in donor.filter_mappings(&name) {
            let mut mapping = mapping.0.clone();
            if !dispatchers {
                mapping.remove_elements_named("dispatcher");
            }
            target.insert_element(mapping)?;
        }
    }

    debug!("merged {count} filters");
    Ok(count)
}

fn merge_servlets(target: &mut WebXml, donor: &WebXml) -> Result<usize> {
    let mut count = 0;
    for servlet in donor.servlets() {
        let Some(name) = servlet.name() else {
            continue;
        };

        if target.has_servlet(&name) {
            for param in servlet.init_params() {
                if let (Some(param_name), Some(value)) = (param.name(), param.value()) {
                    target.upsert_init_param("servlet", &name, &param_name, &value)?;
                }
            }
            if let Some(role) = servlet.run_as_role_name() {
                target.add_servlet_run_as_role_name(&name, &role)?;
            }
        } else {
            target.add_servlet_element(strip_run_as(servlet.0, target.version()))?;
        }
        count += 1;

        for mapping in donor.servlet_mappings(&name) {
            target.insert_element(mapping.0.clone())?;
        }
    }

    debug!("merged {count} servlets");
    Ok(count)
}

// INVARIANT: `run-as` only exists from 2.3 onward.
fn strip_run_as(servlet: &Element, version: WebXmlVersion) -> Element {
    let mut servlet = servlet.clone();
    if version < WebXmlVersion::V2_3 {
        servlet.remove_elements_named("run-as");
    }
    servlet
}

fn merge_login_config(target: &mut WebXml, donor: &WebXml) -> Result<usize> {
    match donor.login_config() {
        Some(login) => {
            target.replace_element(login.clone())?;
            Ok(1)
        }
        None => Ok(0),
    }
}

fn merge_security_roles(target: &mut WebXml, donor: &WebXml) -> Result<usize> {
    let mut count = 0;
    for role in donor.security_role_names() {
        if !target.has_security_role(&role) {
            target.add_security_role(&role)?;
            count += 1;
        }
    }

    debug!("merged {count} security roles");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        merge::{ChooseByName, NodeMerge},
        webapp::{io::parse_web_xml_str, Schemas, VendorDescriptor},
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const V2_3: &str = r#"<!DOCTYPE web-app PUBLIC "-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN" "http://java.sun.com/dtd/web-app_2_3.dtd">"#;

    fn parse(schemas: &Arc<Schemas>, xml: &str) -> anyhow::Result<WebXml> {
        Ok(parse_web_xml_str(xml, schemas)?)
    }

    #[test]
    fn filters_union_params_and_mappings() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut target = parse(&schemas, indoc! {r#"
            <web-app xmlns="http://java.sun.com/xml/ns/javaee" version="2.5">
                <filter>
                    <filter-name>F</filter-name>
                    <filter-class>org.example.F</filter-class>
                    <init-param><param-name>x</param-name><param-value>1</param-value></init-param>
                    <init-param><param-name>z</param-name><param-value>old</param-value></init-param>
                </filter>
                <filter-mapping>
                    <filter-name>F</filter-name>
                    <url-pattern>/a/*</url-pattern>
                </filter-mapping>
            </web-app>
        "#})?;
        let donor = parse(&schemas, indoc! {r#"
            <web-app xmlns="http://java.sun.com/xml/ns/javaee" version="2.5">
                <filter>
                    <filter-name>F</filter-name>
                    <filter-class>org.example.F</filter-class>
                    <init-param><param-name>y</param-name><param-value>2</param-value></init-param>
                    <init-param><param-name>z</param-name><param-value>new</param-value></init-param>
                </filter>
                <filter-mapping>
                    <filter-name>F</filter-name>
                    <url-pattern>/b/*</url-pattern>
                    <dispatcher>FORWARD</dispatcher>
                </filter-mapping>
            </web-app>
        "#})?;
        WebXmlMerger::new().merge(&mut target, &donor)?;

        assert_eq!(target.filter_init_param_names("F"), vec!["x", "z", "y"]);
        assert_eq!(target.filter_init_param("F", "z"), Some("new".into()));
        assert_eq!(target.filter_mapping_patterns("F"), vec!["/a/*", "/b/*"]);
        assert!(target.filter_mapping_dispatchers("F").contains("FORWARD"));

        Ok(())
    }

    #[test]
    fn servlets_added_with_mappings() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut target = parse(&schemas, "<web-app/>")?;
        let donor = parse(&schemas, indoc! {r#"
            <web-app>
                <servlet>
                    <servlet-name>s</servlet-name>
                    <servlet-class>org.example.S</servlet-class>
                    <run-as><role-name>admin</role-name></run-as>
                </servlet>
                <servlet-mapping>
                    <servlet-name>s</servlet-name>
                    <url-pattern>/s</url-pattern>
                </servlet-mapping>
            </web-app>
        "#})?;
        WebXmlMerger::new().merge(&mut target, &donor)?;

        assert!(target.has_servlet("s"));
        assert_eq!(target.servlet_mapping_patterns("s"), vec!["/s"]);
        assert_eq!(target.servlet("s").and_then(|s| s.run_as_role_name()), Some("admin".into()));

        Ok(())
    }

    #[test]
    fn login_config_replaced_and_roles_unioned() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut target = parse(&schemas, indoc! {r#"
            <web-app>
                <login-config><auth-method>BASIC</auth-method><realm-name>realmA</realm-name></login-config>
                <security-role><role-name>admin</role-name></security-role>
            </web-app>
        "#})?;
        let donor = parse(&schemas, indoc! {r#"
            <web-app>
                <login-config><auth-method>FORM</auth-method><realm-name>realmB</realm-name></login-config>
                <security-role><role-name>admin</role-name></security-role>
                <security-role><role-name>user</role-name></security-role>
            </web-app>
        "#})?;
        WebXmlMerger::new().merge(&mut target, &donor)?;

        assert_eq!(target.login_config_auth_method(), Some("FORM".into()));
        assert_eq!(target.login_config_realm_name(), Some("realmB".into()));
        assert_eq!(target.security_role_names(), vec!["admin", "user"]);

        Ok(())
    }

    #[test]
    fn additive_categories_keep_duplicates() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let xml = indoc! {r#"
            <web-app>
                <resource-ref><res-ref-name>jdbc/A</res-ref-name></resource-ref>
                <security-constraint>
                    <web-resource-collection>
                        <web-resource-name>r</web-resource-name>
                        <url-pattern>/secure/*</url-pattern>
                    </web-resource-collection>
                </security-constraint>
                <env-entry><env-entry-name>e</env-entry-name></env-entry>
            </web-app>
        "#};
        let mut target = parse(&schemas, xml)?;
        let donor = parse(&schemas, xml)?;
        WebXmlMerger::new().merge(&mut target, &donor)?;

        assert_eq!(target.tags("resource-ref").len(), 2);
        assert_eq!(target.tags("security-constraint").len(), 2);
        assert_eq!(target.tags("env-entry").len(), 2);

        Ok(())
    }

    #[test]
    fn listeners_merge_by_class_with_strategy() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut target = parse(&schemas, indoc! {r#"
            <web-app>
                <listener><listener-class>a.L</listener-class></listener>
            </web-app>
        "#})?;
        let donor = parse(&schemas, indoc! {r#"
            <web-app>
                <listener><description>donor</description><listener-class>a.L</listener-class></listener>
                <listener><listener-class>b.L</listener-class></listener>
            </web-app>
        "#})?;
        let strategy = MergeStrategy::ChooseByName(
            ChooseByName::new(MergeStrategy::Preserve).with_choice("a.L", MergeStrategy::Overwrite),
        );
        WebXmlMerger::new()
            .with_listener_strategy(strategy)
            .merge(&mut target, &donor)?;

        assert_eq!(target.listener_classes(), vec!["a.L", "b.L"]);
        let description = target.listener("a.L").and_then(|l| l.0.child_text("description"));
        assert_eq!(description, Some("donor".into()));

        Ok(())
    }

    #[test]
    fn newer_donor_merges_supported_categories() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut target = parse(&schemas, &format!("{V2_3}<web-app/>"))?;
        let donor = parse(&schemas, indoc! {r#"
            <web-app xmlns="http://java.sun.com/xml/ns/j2ee" version="2.4">
                <filter>
                    <filter-name>F</filter-name>
                    <filter-class>org.example.F</filter-class>
                </filter>
                <filter-mapping>
                    <filter-name>F</filter-name>
                    <url-pattern>/*</url-pattern>
                    <dispatcher>REQUEST</dispatcher>
                </filter-mapping>
                <listener><listener-class>a.L</listener-class></listener>
                <message-destination><message-destination-name>q</message-destination-name></message-destination>
            </web-app>
        "#})?;
        WebXmlMerger::new().merge(&mut target, &donor)?;

        assert_eq!(target.version(), WebXmlVersion::V2_3);
        assert!(target.has_listener("a.L"));
        assert!(target.filter_mapping_dispatchers("F").is_empty());
        assert!(target.tags("message-destination").is_empty());

        Ok(())
    }

    #[test]
    fn mime_mappings_added_when_absent() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut target = parse(&schemas, indoc! {r#"
            <web-app>
                <mime-mapping><extension>txt</extension><mime-type>text/plain</mime-type></mime-mapping>
            </web-app>
        "#})?;
        let donor = parse(&schemas, indoc! {r#"
            <web-app>
                <mime-mapping><extension>txt</extension><mime-type>text/other</mime-type></mime-mapping>
                <mime-mapping><extension>svg</extension><mime-type>image/svg+xml</mime-type></mime-mapping>
            </web-app>
        "#})?;
        WebXmlMerger::new().merge(&mut target, &donor)?;

        assert_eq!(target.mime_mapping("txt").and_then(|m| m.mime_type()), Some("text/plain".into()));
        assert!(target.has_mime_mapping("svg"));

        Ok(())
    }

    #[test]
    fn vendor_descriptors_adopted_or_merged() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut target = parse(&schemas, "<web-app/>")?;
        let mut donor = parse(&schemas, "<web-app/>")?;

        let mut jboss = VendorDescriptor::new(VendorKind::JBoss, &schemas);
        jboss.insert_element(Element::new("depends").with_text("left"))?;
        target.add_vendor_descriptor(jboss);

        let mut jboss = VendorDescriptor::new(VendorKind::JBoss, &schemas);
        jboss.insert_element(Element::new("depends").with_text("right"))?;
        donor.add_vendor_descriptor(jboss);
        donor.add_vendor_descriptor(VendorDescriptor::new(VendorKind::Resin, &schemas));

        WebXmlMerger::new().merge(&mut target, &donor)?;

        let kinds: Vec<_> = target.vendor_descriptors().iter().map(VendorDescriptor::kind).collect();
        assert_eq!(kinds, vec![VendorKind::JBoss, VendorKind::Resin]);
        let depends = target
            .vendor_descriptor(VendorKind::JBoss)
            .map(|jboss| jboss.tags("depends").len());
        assert_eq!(depends, Some(2));

        Ok(())
    }

    #[test]
    fn failure_names_the_step() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let xml = "<web-app><context-param><param-name>a</param-name></context-param></web-app>";
        let mut target = parse(&schemas, xml)?;
        let donor = parse(&schemas, xml)?;
        let template = NodeMerge::parse("<context-param>$left:</context-param>")?;

        let error = WebXmlMerger::new()
            .with_context_param_strategy(MergeStrategy::NodeMerge(template))
            .merge(&mut target, &donor);
        let Err(MergeError::Failure { step, source }) = error else {
            panic!("expected merge failure, got {error:?}");
        };
        assert_eq!(step, "context-param");
        assert!(matches!(*source, MergeError::TemplateToken(_)));

        Ok(())
    }
}
