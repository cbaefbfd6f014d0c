// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Kind of enterprise bean referenced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EjbKind {
    #[default]
    Session,
    Entity,
}

impl Display for EjbKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Session => fmt.write_str("Session"),
            Self::Entity => fmt.write_str("Entity"),
        }
    }
}

/// Reference to an enterprise bean.
///
/// A reference is resolved either by linking to a bean of the same
/// application through its EJB name, or by binding to a JNDI name through
/// the vendor descriptors. Exactly one of the two must be set before the
/// reference is added to a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EjbRef {
    name: String,
    home_interface: String,
    interface: String,
    ejb_name: Option<String>,
    jndi_name: Option<String>,
    local: bool,
    kind: EjbKind,
}

impl EjbRef {
    /// Construct local session bean reference.
    pub fn new(
        name: impl Into<String>,
        home_interface: impl Into<String>,
        interface: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            home_interface: home_interface.into(),
            interface: interface.into(),
            ejb_name: None,
            jndi_name: None,
            local: true,
            kind: EjbKind::default(),
        }
    }

    pub fn with_ejb_name(mut self, ejb_name: impl Into<String>) -> Self {
        self.ejb_name = Some(ejb_name.into());
        self
    }

    pub fn with_jndi_name(mut self, jndi_name: impl Into<String>) -> Self {
        self.jndi_name = Some(jndi_name.into());
        self
    }

    /// Make this a reference through remote interfaces.
    pub fn remote(mut self) -> Self {
        self.local = false;
        self
    }

    pub fn with_kind(mut self, kind: EjbKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn home_interface(&self) -> &str {
        &self.home_interface
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn ejb_name(&self) -> Option<&str> {
        self.ejb_name.as_deref()
    }

    pub fn jndi_name(&self) -> Option<&str> {
        self.jndi_name.as_deref()
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn kind(&self) -> EjbKind {
        self.kind
    }

    /// XML id other descriptors use to point at this reference.
    pub fn id(&self) -> String {
        self.name.replace('/', "_")
    }
}
