// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Web archive containers.
//!
//! An [`Archive`] is a read-only bag of named resources. Resource paths are
//! always relative and `/` separated, e.g. `WEB-INF/web.xml`, no matter what
//! backs the archive. Two containers are provided: [`DirArchive`] for
//! exploded WAR directories, and [`MemoryArchive`] for archives assembled in
//! memory.
//!
//! A [`WarArchive`] wraps any container and understands the descriptors
//! found under `WEB-INF`. Descriptors are only parsed when first asked for.
//!
//! # Storage
//!
//! Storing a WAR copies every non-descriptor resource byte for byte, then
//! writes the descriptors freshly from their in-memory documents. Packing
//! into a JAR file is not handled, so archives are always stored as
//! exploded directories.

pub mod uberwar;

pub use uberwar::{MergedWarArchive, ResourceMerge};

use crate::{
    config::ConfigError,
    descriptor::Descriptor,
    merge::MergeError,
    webapp::{
        io::{self, ParseError},
        Schemas, VendorKind, WebXml, WebXmlVersion,
    },
    xml::XmlError,
};

use ignore::WalkBuilder;
use std::{
    collections::BTreeMap,
    fs::{read, write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, instrument};

/// Location of the web application descriptor inside a WAR.
pub const WEB_XML_PATH: &str = "WEB-INF/web.xml";

/// Named resource container.
pub trait Archive {
    /// Content of resource at `path`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Io`] if the resource exists but cannot be
    ///   read.
    /// - Return [`ArchiveError::InvalidPath`] if a directory backed archive
    ///   is asked for a path that climbs out of it.
    fn resource(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Sorted paths of every resource whose path starts with `prefix`.
    ///
    /// An empty prefix lists the whole archive.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Walk`] if the archive cannot be listed.
    fn resources(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if fully qualified class `name` is bundled in `WEB-INF/classes`.
    fn contains_class(&self, name: &str) -> Result<bool> {
        let path = format!("WEB-INF/classes/{}.class", name.replace('.', "/"));
        Ok(self.resource(&path)?.is_some())
    }

    /// Copy every resource into directory `dir`.
    ///
    /// Existing files at the same paths get overwritten.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Io`] if any resource cannot be read or
    ///   written.
    fn expand_to_path(&self, dir: &Path) -> Result<()> {
        for path in self.resources("")? {
            if let Some(bytes) = self.resource(&path)? {
                write_resource(dir, &path, &bytes)?;
            }
        }

        Ok(())
    }
}

/// Write `bytes` to resource `path` below `dir`, creating parents as needed.
///
/// # Errors
///
/// - Return [`ArchiveError::InvalidPath`] if `path` would leave `dir`.
/// - Return [`ArchiveError::Io`] if directories or the file cannot be
///   created.
pub fn write_resource(dir: &Path, path: &str, bytes: &[u8]) -> Result<()> {
    let target = resource_path(dir, path)?;
    if let Some(parent) = target.parent() {
        mkdirp::mkdirp(parent).map_err(|source| ArchiveError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    write(&target, bytes).map_err(|source| ArchiveError::Io { path: target, source })
}

/// Check that resource `path` stays inside the archive.
///
/// # Errors
///
/// - Return [`ArchiveError::InvalidPath`] if `path` has a `.` or `..`
///   segment.
pub fn check_resource_path(path: &str) -> Result<()> {
    resource_path(Path::new(""), path).map(drop)
}

fn resource_path(dir: &Path, path: &str) -> Result<PathBuf> {
    let mut target = dir.to_path_buf();
    for part in path.split('/').filter(|part| !part.is_empty()) {
        if part == "." || part == ".." {
            return Err(ArchiveError::InvalidPath { path: path.into() });
        }
        target.push(part);
    }

    Ok(target)
}

/// Exploded WAR directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    /// Open exploded archive at `root`.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::MissingWar`] if `root` is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ArchiveError::MissingWar { path: root });
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }
}

impl Archive for DirArchive {
    fn resource(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let target = resource_path(&self.root, path)?;
        if !target.is_file() {
            return Ok(None);
        }

        read(&target)
            .map(Some)
            .map_err(|source| ArchiveError::Io { path: target, source })
    }

    fn resources(&self, prefix: &str) -> Result<Vec<String>> {
        // INVARIANT: Hidden and ignored files are part of the archive too.
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(true)
            .build();

        let mut paths = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_some_and(|kind| kind.is_file()) {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let path = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if path.starts_with(prefix) {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths)
    }
}

/// Archive held entirely in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    /// Add or replace resource at `path`.
    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Archive for MemoryArchive {
    fn resource(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(path).cloned())
    }

    fn resources(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect())
    }
}

/// Web application archive.
///
/// Wraps a resource container and lazily binds the `web.xml` found in it,
/// along with any vendor descriptors sitting next to it in `WEB-INF`. A WAR
/// without a `web.xml` gets an empty 2.5 descriptor.
#[derive(Debug, Clone)]
pub struct WarArchive<A>
where
    A: Archive,
{
    name: String,
    archive: A,
    schemas: Arc<Schemas>,
    web_xml: Option<WebXml>,
}

impl<A> WarArchive<A>
where
    A: Archive,
{
    /// Construct new WAR named `name` over `archive`.
    ///
    /// The name is only used for reporting.
    pub fn new(name: impl Into<String>, archive: A, schemas: Arc<Schemas>) -> Self {
        Self {
            name: name.into(),
            archive,
            schemas,
            web_xml: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }

    /// Web application descriptor of this WAR.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Parse`] if `web.xml` or a vendor
    ///   descriptor is malformed.
    pub fn web_xml(&mut self) -> Result<&WebXml> {
        self.web_xml_mut().map(|web_xml| &*web_xml)
    }

    /// Mutable web application descriptor of this WAR.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Parse`] if `web.xml` or a vendor
    ///   descriptor is malformed.
    pub fn web_xml_mut(&mut self) -> Result<&mut WebXml> {
        let web_xml = match self.web_xml.take() {
            Some(web_xml) => web_xml,
            None => self.load_web_xml()?,
        };

        Ok(self.web_xml.insert(web_xml))
    }

    #[instrument(skip(self), fields(war = %self.name), level = "debug")]
    fn load_web_xml(&self) -> Result<WebXml> {
        let mut web_xml = match self.archive.resource(WEB_XML_PATH)? {
            Some(bytes) => io::parse_web_xml(bytes.as_slice(), &self.schemas).map_err(|source| {
                ArchiveError::Parse {
                    path: WEB_XML_PATH.into(),
                    source,
                }
            })?,
            None => {
                debug!("no {WEB_XML_PATH}, using empty descriptor");
                io::new_web_xml(&self.schemas, WebXmlVersion::V2_5)
            }
        };

        for kind in VendorKind::ALL {
            let path = format!("WEB-INF/{}", kind.file_name());
            if let Some(bytes) = self.archive.resource(&path)? {
                let vendor = io::parse_vendor(kind, bytes.as_slice(), &self.schemas)
                    .map_err(|source| ArchiveError::Parse { path, source })?;
                debug!("loaded vendor descriptor {kind}");
                web_xml.add_vendor_descriptor(vendor);
            }
        }

        Ok(web_xml)
    }

    /// Store WAR as exploded directory `dir`.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Io`] if resources cannot be copied.
    /// - Return [`ArchiveError::Parse`] if descriptors cannot be loaded.
    /// - Return [`ArchiveError::Write`] if descriptors cannot be serialized.
    #[instrument(skip(self, dir), fields(war = %self.name), level = "debug")]
    pub fn store(&mut self, dir: &Path) -> Result<()> {
        for path in self.archive.resources("")? {
            if is_descriptor_path(&path) {
                continue;
            }

            if let Some(bytes) = self.archive.resource(&path)? {
                write_resource(dir, &path, &bytes)?;
            }
        }

        let web_xml = self.web_xml()?;
        write_descriptors(web_xml, dir)
    }
}

impl<A> Archive for WarArchive<A>
where
    A: Archive,
{
    fn resource(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.archive.resource(path)
    }

    fn resources(&self, prefix: &str) -> Result<Vec<String>> {
        self.archive.resources(prefix)
    }

    fn contains_class(&self, name: &str) -> Result<bool> {
        self.archive.contains_class(name)
    }

    fn expand_to_path(&self, dir: &Path) -> Result<()> {
        self.archive.expand_to_path(dir)
    }
}

/// Check if `path` names a descriptor that gets written from its document.
fn is_descriptor_path(path: &str) -> bool {
    match path.strip_prefix("WEB-INF/") {
        Some("web.xml") => true,
        Some(file_name) => VendorKind::from_file_name(file_name).is_some(),
        None => false,
    }
}

/// Write `web.xml` and all its vendor descriptors into `dir/WEB-INF`.
///
/// # Errors
///
/// - Return [`ArchiveError::Write`] if a descriptor cannot be serialized.
/// - Return [`ArchiveError::Io`] if a descriptor cannot be written.
pub fn write_descriptors(web_xml: &WebXml, dir: &Path) -> Result<()> {
    write_one(web_xml, dir)?;
    for vendor in web_xml.vendor_descriptors() {
        write_one(vendor, dir)?;
    }

    Ok(())
}

fn write_one(descriptor: &impl Descriptor, dir: &Path) -> Result<()> {
    let path = format!("WEB-INF/{}", descriptor.file_name());
    let text = io::descriptor_to_string(descriptor).map_err(|source| ArchiveError::Write {
        path: path.clone(),
        source,
    })?;
    debug!("writing {path}");
    write_resource(dir, &path, text.as_bytes())
}

/// Archive error types.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Failed to access a file.
    #[error("failed to access {:?}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to list an exploded archive.
    #[error(transparent)]
    Walk(#[from] ignore::Error),

    /// Descriptor inside an archive is malformed.
    #[error("failed to parse descriptor {path}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    /// Descriptor could not be serialized.
    #[error("failed to write descriptor {path}")]
    Write {
        path: String,
        #[source]
        source: XmlError,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Resource path climbs out of its archive.
    #[error("resource path {path:?} must not contain '.' or '..' segments")]
    InvalidPath { path: String },

    /// WAR directory does not exist.
    #[error("WAR {:?} does not exist", path.display())]
    MissingWar { path: PathBuf },

    /// Merge asked for without any WAR to merge.
    #[error("no WAR files to merge")]
    NoWars,
}

/// Friendly result alias :3
pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;
    use std::fs::{create_dir_all, read_to_string};

    const WEB_XML: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <web-app xmlns="http://java.sun.com/xml/ns/javaee" version="2.5">
            <servlet>
                <servlet-name>s</servlet-name>
                <servlet-class>org.example.S</servlet-class>
            </servlet>
        </web-app>
    "#};

    fn fixture() -> MemoryArchive {
        MemoryArchive::new()
            .with_entry("index.jsp", "<html/>")
            .with_entry("WEB-INF/classes/org/example/S.class", vec![0xca_u8, 0xfe])
            .with_entry("WEB-INF/web.xml", WEB_XML)
            .with_entry("WEB-INF/lib/a.jar", vec![1_u8, 2, 3])
    }

    #[test_case("WEB-INF/", vec!["WEB-INF/classes/org/example/S.class", "WEB-INF/lib/a.jar", "WEB-INF/web.xml"]; "web-inf")]
    #[test_case("WEB-INF/lib", vec!["WEB-INF/lib/a.jar"]; "lib")]
    #[test_case("META-INF", vec![]; "missing")]
    #[test]
    fn memory_archive_lists_by_prefix(prefix: &str, expect: Vec<&str>) -> anyhow::Result<()> {
        pretty_assertions::assert_eq!(fixture().resources(prefix)?, expect);
        Ok(())
    }

    #[test_case("org.example.S", true; "bundled class")]
    #[test_case("org.example.Missing", false; "missing class")]
    #[test]
    fn contains_class_checks_web_inf_classes(name: &str, expect: bool) -> anyhow::Result<()> {
        pretty_assertions::assert_eq!(fixture().contains_class(name)?, expect);
        Ok(())
    }

    #[sealed_test]
    fn dir_archive_reads_exploded_war() -> anyhow::Result<()> {
        create_dir_all("war/WEB-INF/classes")?;
        write("war/WEB-INF/web.xml", WEB_XML)?;
        write("war/.hidden", "x")?;
        write("war/index.jsp", "<html/>")?;

        let archive = DirArchive::open("war")?;
        assert_eq!(
            archive.resources("")?,
            vec![".hidden", "WEB-INF/web.xml", "index.jsp"]
        );
        assert_eq!(archive.resource("index.jsp")?, Some(b"<html/>".to_vec()));
        assert_eq!(archive.resource("missing.jsp")?, None);

        Ok(())
    }

    #[sealed_test]
    fn write_resource_rejects_dot_segments() -> anyhow::Result<()> {
        create_dir_all("out")?;
        for path in ["../escape.txt", "WEB-INF/../../escape.txt", "./escape.txt"] {
            let result = write_resource(Path::new("out"), path, b"x");
            assert!(matches!(result, Err(ArchiveError::InvalidPath { .. })), "{path}");
        }

        assert!(!Path::new("escape.txt").exists());
        assert!(!Path::new("out/escape.txt").exists());

        Ok(())
    }

    #[sealed_test]
    fn dir_archive_rejects_dot_segments() -> anyhow::Result<()> {
        create_dir_all("war")?;
        write("secret.txt", "x")?;
        let archive = DirArchive::open("war")?;

        assert!(matches!(
            archive.resource("../secret.txt"),
            Err(ArchiveError::InvalidPath { .. })
        ));
        assert!(check_resource_path("WEB-INF/web.xml").is_ok());

        Ok(())
    }

    #[sealed_test]
    fn dir_archive_rejects_missing_directory() {
        let result = DirArchive::open("nowhere");
        assert!(matches!(result, Err(ArchiveError::MissingWar { .. })));
    }

    #[test]
    fn war_without_web_xml_gets_empty_2_5_descriptor() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut war = WarArchive::new("empty", MemoryArchive::new(), schemas);
        let web_xml = war.web_xml()?;

        assert_eq!(web_xml.version(), WebXmlVersion::V2_5);
        assert!(web_xml.servlet_names().is_empty());

        Ok(())
    }

    #[test]
    fn war_loads_vendor_descriptors() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let archive = fixture().with_entry(
            "WEB-INF/jboss-web.xml",
            "<jboss-web><context-root>/app</context-root></jboss-web>",
        );
        let mut war = WarArchive::new("app", archive, schemas);
        let web_xml = war.web_xml()?;

        assert_eq!(web_xml.servlet_names(), vec!["s"]);
        assert!(web_xml.vendor_descriptor(VendorKind::JBoss).is_some());
        assert!(web_xml.vendor_descriptor(VendorKind::WebLogic).is_none());

        Ok(())
    }

    #[test]
    fn war_reports_malformed_descriptor_path() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let archive = MemoryArchive::new().with_entry("WEB-INF/web.xml", "<web-app><servlet></web-app>");
        let mut war = WarArchive::new("broken", archive, schemas);
        let result = war.web_xml();

        assert!(matches!(result, Err(ArchiveError::Parse { path, .. }) if path == WEB_XML_PATH));

        Ok(())
    }

    #[sealed_test]
    fn store_copies_resources_and_rewrites_descriptors() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut war = WarArchive::new("app", fixture(), schemas);
        war.web_xml_mut()?.add_servlet_mapping("s", "/s/*")?;
        war.store(Path::new("out"))?;

        assert_eq!(read("out/WEB-INF/lib/a.jar")?, vec![1, 2, 3]);
        assert_eq!(read_to_string("out/index.jsp")?, "<html/>");
        let stored = read_to_string("out/WEB-INF/web.xml")?;
        assert!(stored.contains("<url-pattern>/s/*</url-pattern>"));

        Ok(())
    }
}
