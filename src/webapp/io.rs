// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Reading and writing of web application descriptors.

use super::{
    schema::Schemas,
    vendor::{VendorDescriptor, VendorKind},
    version::{sniff_version, Sniff, WebXmlVersion, XSI_NAMESPACE},
    WebXml,
};
use crate::{
    descriptor::Descriptor,
    xml::{self, DocType, Document, Element, XmlError},
};

use std::{io::Read, sync::Arc};
use tracing::{debug, instrument};

/// Parse `web.xml` from `input`.
///
/// The version is sniffed before the document is parsed, so documents of
/// any supported version come back bound to the matching descriptor type.
/// The input is fully consumed and dropped before returning.
///
/// # Errors
///
/// - Return [`ParseError::Io`] if `input` cannot be read.
/// - Return [`ParseError::Xml`] if the document is malformed.
/// - Return [`ParseError::UndetectableVersion`] if the root element is not
///   `web-app`.
#[instrument(skip(input, schemas), level = "debug")]
pub fn parse_web_xml(mut input: impl Read, schemas: &Arc<Schemas>) -> Result<WebXml> {
    let mut bytes = Vec::new();
    input
        .read_to_end(&mut bytes)
        .map_err(|source| ParseError::Io { source })?;

    let version = match sniff_version(&bytes)? {
        Sniff::Determined(Some(version)) => version,
        Sniff::Determined(None) => WebXmlVersion::default(),
        Sniff::NeedMore | Sniff::Foreign => return Err(ParseError::UndetectableVersion),
    };
    debug!("detected web.xml version {version}");

    let document = xml::parse_document(bytes.as_slice())?;
    Ok(WebXml::from_document(version, schemas.clone(), document))
}

/// Parse `web.xml` held in a string.
pub fn parse_web_xml_str(input: &str, schemas: &Arc<Schemas>) -> Result<WebXml> {
    parse_web_xml(input.as_bytes(), schemas)
}

/// Construct empty `web.xml` of `version`.
///
/// DTD based versions carry a document type declaration. Schema based
/// versions declare their namespace, schema location, and version on the
/// root element instead.
pub fn new_web_xml(schemas: &Arc<Schemas>, version: WebXmlVersion) -> WebXml {
    let document = match (version.public_id(), version.system_id()) {
        (Some(public_id), Some(system_id)) => Document::new(Element::new("web-app"))
            .with_doctype(DocType::public("web-app", public_id, system_id)),
        _ => {
            let mut root = Element::with_namespace("web-app", version.namespace());
            if let (Some(namespace), Some(location)) = (version.namespace(), version.schema_location()) {
                root.set_attribute("xmlns", namespace);
                root.set_attribute("xmlns:xsi", XSI_NAMESPACE);
                root.set_attribute("xsi:schemaLocation", format!("{namespace} {location}"));
            }
            root.set_attribute("version", version.as_str());
            Document::new(root)
        }
    };

    WebXml::from_document(version, schemas.clone(), document)
}

/// Parse vendor descriptor of dialect `kind` from `input`.
///
/// # Errors
///
/// - Return [`ParseError::Io`] if `input` cannot be read.
/// - Return [`ParseError::Xml`] if the document is malformed.
pub fn parse_vendor(kind: VendorKind, mut input: impl Read, schemas: &Schemas) -> Result<VendorDescriptor> {
    let mut bytes = Vec::new();
    input
        .read_to_end(&mut bytes)
        .map_err(|source| ParseError::Io { source })?;
    let document = xml::parse_document(bytes.as_slice())?;
    Ok(VendorDescriptor::from_document(kind, schemas, document))
}

/// Serialize any descriptor.
///
/// # Errors
///
/// - Return [`XmlError`] if `output` cannot be written to.
pub fn write_descriptor(descriptor: &impl Descriptor, output: impl std::io::Write) -> Result<(), XmlError> {
    xml::write_document(descriptor.document(), output)
}

/// Serialize any descriptor into a string.
pub fn descriptor_to_string(descriptor: &impl Descriptor) -> Result<String, XmlError> {
    xml::writer::write_string(descriptor.document())
}

/// Descriptor parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// Root element is not a web application.
    #[error("cannot detect web.xml version, root element is not web-app")]
    UndetectableVersion,

    #[error("failed to read descriptor")]
    Io { source: std::io::Error },
}

/// Friendly result alias :3
pub type Result<T, E = ParseError> = std::result::Result<T, E>;
