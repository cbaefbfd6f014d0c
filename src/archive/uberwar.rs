// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Uberwar assembly.
//!
//! An __uberwar__ is a single WAR assembled from several donor WARs. WARs
//! are processed strictly in the order given. The first WAR is
//! authoritative: its `web.xml` is the base that every later WAR's
//! `web.xml` gets merged into. Plain resources are expanded in the same
//! order, so a later WAR's copy of a file replaces an earlier one unless a
//! [`ResourceMerge`] processor says otherwise.

use super::{
    check_resource_path, write_descriptors, write_resource, Archive, ArchiveError, DirArchive, Result, WarArchive,
};
use crate::{
    config::MergeDefinition,
    merge::WebXmlMerger,
    webapp::{io, Schemas, WebXml},
};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs::{copy, read_dir, remove_file},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, instrument};

/// File-level merge processor.
///
/// Decides what lands at a resource path that several WARs provide.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceMerge {
    /// Join every copy in WAR order.
    #[default]
    Concat,

    /// Keep the copy of the earliest WAR.
    First,

    /// Keep the copy of the latest WAR.
    Last,

    /// Treat every copy as `web.xml` and merge them.
    WebXml,
}

impl ResourceMerge {
    /// Combine `items`, ordered by WAR, found at resource `path`.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Parse`] if a copy is not a valid `web.xml`.
    /// - Return [`ArchiveError::Merge`] if the `web.xml` merge fails.
    /// - Return [`ArchiveError::Write`] if the merged `web.xml` cannot be
    ///   serialized.
    pub fn combine(
        &self,
        path: &str,
        items: Vec<Vec<u8>>,
        schemas: &Arc<Schemas>,
        merger: &WebXmlMerger,
    ) -> Result<Vec<u8>> {
        match self {
            Self::Concat => Ok(items.concat()),
            Self::First => Ok(items.into_iter().next().unwrap_or_default()),
            Self::Last => Ok(items.into_iter().last().unwrap_or_default()),
            Self::WebXml => {
                let mut documents = items.iter().map(|bytes| {
                    io::parse_web_xml(bytes.as_slice(), schemas).map_err(|source| {
                        ArchiveError::Parse {
                            path: path.into(),
                            source,
                        }
                    })
                });

                let Some(first) = documents.next() else {
                    return Ok(Vec::new());
                };
                let mut merged = first?;
                for donor in documents {
                    merger.merge(&mut merged, &donor?)?;
                }

                io::descriptor_to_string(&merged)
                    .map(String::into_bytes)
                    .map_err(|source| ArchiveError::Write {
                        path: path.into(),
                        source,
                    })
            }
        }
    }
}

/// WAR assembled by merging several WARs in order.
#[derive(Debug)]
pub struct MergedWarArchive<A>
where
    A: Archive,
{
    wars: Vec<WarArchive<A>>,
    schemas: Arc<Schemas>,
    merger: WebXmlMerger,
    jars: Vec<PathBuf>,
    strip_jars: bool,
    processors: Vec<(String, ResourceMerge)>,
    merged: Option<WebXml>,
}

impl<A> MergedWarArchive<A>
where
    A: Archive,
{
    /// Construct new merged archive over `wars`.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::NoWars`] if `wars` is empty.
    pub fn new(wars: Vec<WarArchive<A>>, schemas: Arc<Schemas>, merger: WebXmlMerger) -> Result<Self> {
        if wars.is_empty() {
            return Err(ArchiveError::NoWars);
        }

        Ok(Self {
            wars,
            schemas,
            merger,
            jars: Vec::new(),
            strip_jars: false,
            processors: Vec::new(),
            merged: None,
        })
    }

    /// Copy extra JAR at `path` into `WEB-INF/lib` on assembly.
    pub fn with_jar(mut self, path: impl Into<PathBuf>) -> Self {
        self.jars.push(path.into());
        self
    }

    /// Drop the JARs bundled by the WARs themselves on assembly.
    ///
    /// Extra JARs are still copied.
    pub fn with_stripped_jars(mut self, strip: bool) -> Self {
        self.strip_jars = strip;
        self
    }

    /// Combine resource `path` with `processor` on assembly.
    ///
    /// Processors run in the order they were added.
    pub fn with_processor(mut self, path: impl Into<String>, processor: ResourceMerge) -> Self {
        self.processors.push((path.into(), processor));
        self
    }

    pub fn wars(&self) -> &[WarArchive<A>] {
        &self.wars
    }

    /// Merged web application descriptor.
    ///
    /// Computed on first call and cached afterwards.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Parse`] if any WAR holds a malformed
    ///   descriptor.
    /// - Return [`ArchiveError::Merge`] if merging fails.
    pub fn web_xml(&mut self) -> Result<&WebXml> {
        let merged = match self.merged.take() {
            Some(merged) => merged,
            None => merge_wars(&mut self.wars, &self.merger)?,
        };

        Ok(self.merged.insert(merged))
    }

    /// Assemble uberwar as exploded directory `dir`.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::Io`] if resources or JARs cannot be copied.
    /// - Return [`ArchiveError::Parse`] if any descriptor is malformed.
    /// - Return [`ArchiveError::Merge`] if merging fails.
    /// - Return [`ArchiveError::Write`] if descriptors cannot be serialized.
    /// - Return [`ArchiveError::InvalidPath`] if a processor path climbs out
    ///   of `dir`.
    #[instrument(skip(self, dir), level = "debug")]
    pub fn assemble(&mut self, dir: &Path) -> Result<()> {
        let merged = self.web_xml()?.clone();

        for war in &self.wars {
            info!("expanding {}", war.name());
            war.expand_to_path(dir)?;
        }

        let lib = dir.join("WEB-INF").join("lib");
        if self.strip_jars {
            strip_jars(&lib)?;
        }
        copy_jars(&lib, &self.jars)?;

        write_descriptors(&merged, dir)?;

        for (path, processor) in &self.processors {
            check_resource_path(path)?;
            let mut items = Vec::new();
            for war in &self.wars {
                if let Some(bytes) = war.resource(path)? {
                    items.push(bytes);
                }
            }

            if items.is_empty() {
                debug!("no WAR provides {path}, skipping {processor:?}");
                continue;
            }

            debug!("combining {} copies of {path} with {processor:?}", items.len());
            let bytes = processor.combine(path, items, &self.schemas, &self.merger)?;
            write_resource(dir, path, &bytes)?;
        }

        info!("assembled uberwar from {} WARs", self.wars.len());
        Ok(())
    }
}

impl MergedWarArchive<DirArchive> {
    /// Construct merged archive laid out by `definition`.
    ///
    /// Relative paths in `definition` are resolved against `base`, normally
    /// the directory holding the definition file.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::MissingWar`] if a listed WAR does not exist.
    /// - Return [`ArchiveError::NoWars`] if no WAR is listed.
    /// - Return [`ArchiveError::Config`] if a strategy cannot be resolved.
    pub fn from_definition(definition: &MergeDefinition, base: &Path, schemas: Arc<Schemas>) -> Result<Self> {
        let wars = definition
            .wars
            .iter()
            .map(|war| {
                let archive = DirArchive::open(base.join(&war.path))?;
                Ok(WarArchive::new(war.path.display().to_string(), archive, schemas.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let merger = definition.merger(base)?;
        let mut archive =
            Self::new(wars, schemas, merger)?.with_stripped_jars(definition.settings.strip_jars);
        for jar in &definition.settings.jars {
            archive = archive.with_jar(base.join(jar));
        }
        for rule in &definition.merges {
            archive = archive.with_processor(rule.path.clone(), rule.strategy);
        }

        Ok(archive)
    }
}

impl<A> Archive for MergedWarArchive<A>
where
    A: Archive,
{
    /// First copy of `path` in WAR order.
    fn resource(&self, path: &str) -> Result<Option<Vec<u8>>> {
        for war in &self.wars {
            if let Some(bytes) = war.resource(path)? {
                return Ok(Some(bytes));
            }
        }

        Ok(None)
    }

    fn resources(&self, prefix: &str) -> Result<Vec<String>> {
        let mut paths = BTreeSet::new();
        for war in &self.wars {
            paths.extend(war.resources(prefix)?);
        }

        Ok(paths.into_iter().collect())
    }

    fn contains_class(&self, name: &str) -> Result<bool> {
        for war in &self.wars {
            if war.contains_class(name)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn expand_to_path(&self, dir: &Path) -> Result<()> {
        for war in &self.wars {
            war.expand_to_path(dir)?;
        }

        Ok(())
    }
}

fn merge_wars<A>(wars: &mut [WarArchive<A>], merger: &WebXmlMerger) -> Result<WebXml>
where
    A: Archive,
{
    let Some((first, rest)) = wars.split_first_mut() else {
        return Err(ArchiveError::NoWars);
    };

    let mut merged = first.web_xml()?.clone();
    for war in rest {
        info!("merging web.xml of {} into {}", war.name(), first.name());
        merger.merge(&mut merged, war.web_xml()?)?;
    }

    Ok(merged)
}

fn strip_jars(lib: &Path) -> Result<()> {
    if !lib.is_dir() {
        return Ok(());
    }

    let entries = read_dir(lib).map_err(|source| ArchiveError::Io {
        path: lib.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let path = entry
            .map_err(|source| ArchiveError::Io {
                path: lib.to_path_buf(),
                source,
            })?
            .path();
        let is_jar = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"));
        if path.is_file() && is_jar {
            debug!("stripping {:?}", path.display());
            remove_file(&path).map_err(|source| ArchiveError::Io { path, source })?;
        }
    }

    Ok(())
}

fn copy_jars(lib: &Path, jars: &[PathBuf]) -> Result<()> {
    if jars.is_empty() {
        return Ok(());
    }

    mkdirp::mkdirp(lib).map_err(|source| ArchiveError::Io {
        path: lib.to_path_buf(),
        source,
    })?;
    for jar in jars {
        let Some(file_name) = jar.file_name() else {
            continue;
        };
        copy(jar, lib.join(file_name)).map_err(|source| ArchiveError::Io {
            path: jar.clone(),
            source,
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{archive::MemoryArchive, merge::MergeStrategy, webapp::WebXmlVersion};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;
    use std::fs::{read, read_to_string, write};

    const FIRST: &str = indoc! {r#"
        <web-app xmlns="http://java.sun.com/xml/ns/javaee" version="2.5">
            <context-param>
                <param-name>mode</param-name>
                <param-value>first</param-value>
            </context-param>
            <servlet>
                <servlet-name>a</servlet-name>
                <servlet-class>org.example.A</servlet-class>
            </servlet>
        </web-app>
    "#};

    const SECOND: &str = indoc! {r#"
        <web-app xmlns="http://java.sun.com/xml/ns/javaee" version="2.5">
            <context-param>
                <param-name>mode</param-name>
                <param-value>second</param-value>
            </context-param>
            <servlet>
                <servlet-name>b</servlet-name>
                <servlet-class>org.example.B</servlet-class>
            </servlet>
        </web-app>
    "#};

    fn wars(schemas: &Arc<Schemas>) -> Vec<WarArchive<MemoryArchive>> {
        let first = MemoryArchive::new()
            .with_entry("WEB-INF/web.xml", FIRST)
            .with_entry("WEB-INF/lib/a.jar", "a")
            .with_entry("app.properties", "a=1\n")
            .with_entry("index.jsp", "first");
        let second = MemoryArchive::new()
            .with_entry("WEB-INF/web.xml", SECOND)
            .with_entry("WEB-INF/lib/b.jar", "b")
            .with_entry("app.properties", "b=2\n")
            .with_entry("index.jsp", "second");

        vec![
            WarArchive::new("first", first, schemas.clone()),
            WarArchive::new("second", second, schemas.clone()),
        ]
    }

    #[test_case(ResourceMerge::Concat, "a=1\nb=2\n"; "concat")]
    #[test_case(ResourceMerge::First, "a=1\n"; "first")]
    #[test_case(ResourceMerge::Last, "b=2\n"; "last")]
    #[test]
    fn plain_processors_combine_in_war_order(processor: ResourceMerge, expect: &str) -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let items = vec![b"a=1\n".to_vec(), b"b=2\n".to_vec()];
        let result = processor.combine("app.properties", items, &schemas, &WebXmlMerger::new())?;
        pretty_assertions::assert_eq!(String::from_utf8(result)?, expect);

        Ok(())
    }

    #[test]
    fn web_xml_processor_merges_documents() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let items = vec![FIRST.as_bytes().to_vec(), SECOND.as_bytes().to_vec()];
        let result = ResourceMerge::WebXml.combine("x.xml", items, &schemas, &WebXmlMerger::new())?;
        let merged = io::parse_web_xml(result.as_slice(), &schemas)?;

        assert_eq!(merged.servlet_names(), vec!["a", "b"]);

        Ok(())
    }

    #[test]
    fn merged_archive_requires_wars() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let result = MergedWarArchive::<MemoryArchive>::new(Vec::new(), schemas, WebXmlMerger::new());
        assert!(matches!(result, Err(ArchiveError::NoWars)));

        Ok(())
    }

    #[test]
    fn first_war_is_authoritative() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut archive = MergedWarArchive::new(wars(&schemas), schemas, WebXmlMerger::new())?;
        let web_xml = archive.web_xml()?;

        assert_eq!(web_xml.version(), WebXmlVersion::V2_5);
        assert_eq!(web_xml.servlet_names(), vec!["a", "b"]);
        let mode = web_xml.context_param("mode").and_then(|param| param.value());
        assert_eq!(mode.as_deref(), Some("first"));

        Ok(())
    }

    #[test]
    fn overwrite_strategy_lets_donor_win() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let merger = WebXmlMerger::new().with_context_param_strategy(MergeStrategy::Overwrite);
        let mut archive = MergedWarArchive::new(wars(&schemas), schemas, merger)?;
        let mode = archive.web_xml()?.context_param("mode").and_then(|param| param.value());

        assert_eq!(mode.as_deref(), Some("second"));

        Ok(())
    }

    #[test]
    fn resources_come_from_first_war_providing_them() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let archive = MergedWarArchive::new(wars(&schemas), schemas, WebXmlMerger::new())?;

        assert_eq!(archive.resource("index.jsp")?, Some(b"first".to_vec()));
        assert_eq!(
            archive.resources("WEB-INF/lib")?,
            vec!["WEB-INF/lib/a.jar", "WEB-INF/lib/b.jar"]
        );

        Ok(())
    }

    #[sealed_test]
    fn assemble_expands_merges_and_processes() -> anyhow::Result<()> {
        write("extra.jar", "extra")?;
        let schemas = Arc::new(Schemas::new()?);
        let mut archive = MergedWarArchive::new(wars(&schemas), schemas.clone(), WebXmlMerger::new())?
            .with_jar("extra.jar")
            .with_processor("app.properties", ResourceMerge::Concat);
        archive.assemble(Path::new("out"))?;

        assert_eq!(read_to_string("out/index.jsp")?, "second");
        assert_eq!(read_to_string("out/app.properties")?, "a=1\nb=2\n");
        assert_eq!(read("out/WEB-INF/lib/a.jar")?, b"a".to_vec());
        assert_eq!(read("out/WEB-INF/lib/extra.jar")?, b"extra".to_vec());

        let web_xml = io::parse_web_xml(read("out/WEB-INF/web.xml")?.as_slice(), &schemas)?;
        assert_eq!(web_xml.servlet_names(), vec!["a", "b"]);

        Ok(())
    }

    #[sealed_test]
    fn assemble_rejects_processor_path_outside_output() -> anyhow::Result<()> {
        let schemas = Arc::new(Schemas::new()?);
        let mut archive = MergedWarArchive::new(wars(&schemas), schemas, WebXmlMerger::new())?
            .with_processor("../app.properties", ResourceMerge::Concat);
        let result = archive.assemble(Path::new("out"));

        assert!(matches!(result, Err(ArchiveError::InvalidPath { .. })));
        assert!(!Path::new("app.properties").exists());

        Ok(())
    }

    #[sealed_test]
    fn assemble_can_strip_bundled_jars() -> anyhow::Result<()> {
        write("extra.jar", "extra")?;
        let schemas = Arc::new(Schemas::new()?);
        let mut archive = MergedWarArchive::new(wars(&schemas), schemas, WebXmlMerger::new())?
            .with_stripped_jars(true)
            .with_jar("extra.jar");
        archive.assemble(Path::new("out"))?;

        assert!(!Path::new("out/WEB-INF/lib/a.jar").exists());
        assert!(!Path::new("out/WEB-INF/lib/b.jar").exists());
        assert!(Path::new("out/WEB-INF/lib/extra.jar").exists());

        Ok(())
    }
}
