// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Web application descriptor versions.
//!
//! # Detection
//!
//! Detecting the version of an incoming `web.xml` happens in two passes:
//!
//! 1. A cheap textual scan looks for the public identifiers of the DTD
//!    based versions, and gives up once it reaches the `<web-app` root.
//! 2. A streaming probe feeds parser events to [`VersionProbe`] until it
//!    reports [`Sniff::Determined`] or [`Sniff::Foreign`], reading the
//!    `version` attribute or the namespace of the root element.
//!
//! The probe stops the moment the root element is seen, so the rest of the
//! document is never tokenized just to learn its version.

use crate::xml::XmlError;

use quick_xml::{events::Event, Reader};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::{from_utf8, FromStr},
};

/// Namespace of web application descriptor version 2.4.
pub const J2EE_NAMESPACE: &str = "http://java.sun.com/xml/ns/j2ee";

/// Namespace of web application descriptor versions 2.5 and 3.0.
pub const JAVAEE_NAMESPACE: &str = "http://java.sun.com/xml/ns/javaee";

/// Namespace of XML schema instance attributes.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Supported `web.xml` versions, ordered oldest first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WebXmlVersion {
    V2_2,
    V2_3,
    V2_4,
    #[default]
    V2_5,
    V3_0,
}

impl WebXmlVersion {
    /// Every version, oldest first.
    pub const ALL: [WebXmlVersion; 5] = [Self::V2_2, Self::V2_3, Self::V2_4, Self::V2_5, Self::V3_0];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2_2 => "2.2",
            Self::V2_3 => "2.3",
            Self::V2_4 => "2.4",
            Self::V2_5 => "2.5",
            Self::V3_0 => "3.0",
        }
    }

    /// Public identifier of the version's DTD, if DTD based.
    pub fn public_id(&self) -> Option<&'static str> {
        match self {
            Self::V2_2 => Some("-//Sun Microsystems, Inc.//DTD Web Application 2.2//EN"),
            Self::V2_3 => Some("-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN"),
            _ => None,
        }
    }

    /// System identifier of the version's DTD, if DTD based.
    pub fn system_id(&self) -> Option<&'static str> {
        match self {
            Self::V2_2 => Some("http://java.sun.com/j2ee/dtds/web-app_2_2.dtd"),
            Self::V2_3 => Some("http://java.sun.com/dtd/web-app_2_3.dtd"),
            _ => None,
        }
    }

    /// Namespace of the version's schema, if schema based.
    pub fn namespace(&self) -> Option<&'static str> {
        match self {
            Self::V2_2 | Self::V2_3 => None,
            Self::V2_4 => Some(J2EE_NAMESPACE),
            Self::V2_5 | Self::V3_0 => Some(JAVAEE_NAMESPACE),
        }
    }

    /// Location of the version's schema, if schema based.
    pub fn schema_location(&self) -> Option<&'static str> {
        match self {
            Self::V2_2 | Self::V2_3 => None,
            Self::V2_4 => Some("http://java.sun.com/xml/ns/j2ee/web-app_2_4.xsd"),
            Self::V2_5 => Some("http://java.sun.com/xml/ns/javaee/web-app_2_5.xsd"),
            Self::V3_0 => Some("http://java.sun.com/xml/ns/javaee/web-app_3_0.xsd"),
        }
    }

    pub fn from_public_id(public_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|version| version.public_id() == Some(public_id))
    }

    /// Oldest version bound to `namespace`.
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|version| version.namespace() == Some(namespace))
    }
}

impl Display for WebXmlVersion {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for WebXmlVersion {
    type Err = UnknownVersion;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|version| version.as_str() == data.trim())
            .ok_or_else(|| UnknownVersion(data.into()))
    }
}

/// Version string matches no supported version.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported web.xml version {0:?}")]
pub struct UnknownVersion(pub String);

/// Outcome of feeding input to the version sniffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sniff {
    /// Nothing conclusive yet.
    NeedMore,

    /// Root is a web application. Version is known when it could be told.
    Determined(Option<WebXmlVersion>),

    /// Root element is not a web application.
    Foreign,
}

/// Scan text for the public identifier of a DTD based version.
///
/// Scanning stops at the line holding the `<web-app` root, since public
/// identifiers can only appear before it.
pub fn scan_public_id(text: &str) -> Sniff {
    for line in text.lines() {
        if let Some(version) = WebXmlVersion::ALL.into_iter().find(|version| {
            version
                .public_id()
                .is_some_and(|public_id| line.contains(public_id))
        }) {
            return Sniff::Determined(Some(version));
        }

        if line.contains("<web-app") {
            break;
        }
    }

    Sniff::NeedMore
}

/// Streaming root element probe.
#[derive(Debug, Default)]
pub struct VersionProbe;

impl VersionProbe {
    pub fn new() -> Self {
        Self
    }

    /// Feed next parser event.
    ///
    /// # Errors
    ///
    /// - Return [`XmlError`] if the root element's name or attributes are
    ///   not readable.
    pub fn feed(&mut self, event: &Event<'_>) -> Result<Sniff, XmlError> {
        let start = match event {
            Event::Start(start) | Event::Empty(start) => start,
            Event::Eof => return Ok(Sniff::Foreign),
            _ => return Ok(Sniff::NeedMore),
        };

        let qname = from_utf8(start.name().as_ref())?.to_string();
        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, qname.as_str()),
        };
        if local != "web-app" {
            return Ok(Sniff::Foreign);
        }

        let ns_attr = match prefix {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".into(),
        };
        let mut version = None;
        let mut namespace = None;
        for attr in start.attributes() {
            let attr = attr?;
            let key = from_utf8(attr.key.as_ref())?;
            let value = attr.unescape_value().map_err(XmlError::AttributeValue)?;
            if key == "version" {
                version = value.parse::<WebXmlVersion>().ok();
            } else if key == ns_attr {
                namespace = WebXmlVersion::from_namespace(value.trim());
            }
        }

        // INVARIANT: Version attribute wins, since 2.5 and 3.0 share a namespace.
        Ok(Sniff::Determined(version.or(namespace)))
    }
}

/// Run both detection passes over a buffered document.
///
/// # Errors
///
/// - Return [`XmlError::Parse`] if the document is malformed before its
///   root element.
pub fn sniff_version(input: &[u8]) -> Result<Sniff, XmlError> {
    if let sniff @ Sniff::Determined(_) = scan_public_id(String::from_utf8_lossy(input).as_ref()) {
        return Ok(sniff);
    }

    let mut reader = Reader::from_reader(input);
    let mut probe = VersionProbe::new();
    let mut buf = Vec::new();
    loop {
        let sniff = {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|source| XmlError::Parse {
                    source,
                    position: reader.error_position(),
                })?;
            probe.feed(&event)?
        };
        match sniff {
            Sniff::NeedMore => buf.clear(),
            sniff => return Ok(sniff),
        }
    }
}
