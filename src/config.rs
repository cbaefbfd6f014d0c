// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the merge definition file that drives uberwar
//! assembly, to simplify the process of serialization and deserialization.
//! Reading the definition file is left to the caller to figure out.

use crate::{
    archive::ResourceMerge,
    merge::{self, MergeStrategy, WebXmlMerger},
    xml::XmlError,
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Merge definition layout.
///
/// # General Layout
///
/// A merge definition is composed of four parts: settings, WARs, `web.xml`
/// strategies, and file-level merge rules. The settings section says where
/// the uberwar goes and which extra JARs it gets. WARs are listed in merge
/// order, the first one being authoritative. The `webxml` section selects
/// collision strategies for context params and listeners. Merge rules name
/// resource paths that several WARs provide and how to combine them.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct MergeDefinition {
    /// Settings for the assembly.
    #[serde(default)]
    pub settings: MergeSettings,

    /// WARs to merge in order.
    #[serde(rename = "war", default)]
    pub wars: Vec<WarSource>,

    /// Strategies of the `web.xml` merge.
    #[serde(default)]
    pub webxml: WebXmlSettings,

    /// File-level merge rules, applied in order.
    #[serde(rename = "merge", default)]
    pub merges: Vec<ResourceRule>,
}

impl MergeDefinition {
    /// Build the `web.xml` merger this definition asks for.
    ///
    /// Node merge template files are resolved against `base`.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::MissingTemplate`] if a node merge strategy
    ///   names no template.
    /// - Return [`ConfigError::TemplateFile`] if a template file cannot be
    ///   read.
    /// - Return [`ConfigError::Template`] if a template is malformed.
    pub fn merger(&self, base: &Path) -> Result<WebXmlMerger> {
        let mut merger = WebXmlMerger::new();
        if let Some(strategy) = &self.webxml.context_param {
            merger = merger.with_context_param_strategy(strategy.resolve(base)?);
        }
        if let Some(strategy) = &self.webxml.listener {
            merger = merger.with_listener_strategy(strategy.resolve(base)?);
        }

        Ok(merger)
    }
}

impl FromStr for MergeDefinition {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut definition: MergeDefinition =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        if let Some(output) = definition.settings.output.as_mut() {
            *output = expand(output)?;
        }
        for jar in &mut definition.settings.jars {
            *jar = expand(jar)?;
        }
        for war in &mut definition.wars {
            war.path = expand(&war.path)?;
        }
        for strategy in [&mut definition.webxml.context_param, &mut definition.webxml.listener]
            .into_iter()
            .flatten()
        {
            strategy.expand_paths()?;
        }

        Ok(definition)
    }
}

impl Display for MergeDefinition {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Assembly settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MergeSettings {
    /// Directory to assemble the uberwar into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Extra JARs to copy into `WEB-INF/lib`.
    #[serde(default)]
    pub jars: Vec<PathBuf>,

    /// Drop the JARs bundled by the WARs themselves.
    #[serde(default)]
    pub strip_jars: bool,
}

/// WAR listing entry.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct WarSource {
    /// Exploded WAR directory.
    pub path: PathBuf,
}

/// Strategy selection of the `web.xml` merge.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WebXmlSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_param: Option<StrategyConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener: Option<StrategyConfig>,
}

/// Collision strategy as written in a merge definition.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum StrategyConfig {
    #[default]
    Preserve,
    Overwrite,
    Ignore,
    ChooseByName {
        #[serde(default)]
        default: Box<StrategyConfig>,

        #[serde(default)]
        choices: Vec<StrategyChoice>,
    },
    NodeMerge {
        /// Inline template.
        #[serde(skip_serializing_if = "Option::is_none")]
        template: Option<String>,

        /// Template file, relative to the definition file.
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<PathBuf>,
    },
}

impl StrategyConfig {
    /// Turn configured strategy into a [`MergeStrategy`].
    ///
    /// An inline template wins over a template file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::MissingTemplate`] if a node merge strategy
    ///   names no template.
    /// - Return [`ConfigError::TemplateFile`] if a template file cannot be
    ///   read.
    /// - Return [`ConfigError::Template`] if a template is malformed.
    pub fn resolve(&self, base: &Path) -> Result<MergeStrategy> {
        match self {
            Self::Preserve => Ok(MergeStrategy::Preserve),
            Self::Overwrite => Ok(MergeStrategy::Overwrite),
            Self::Ignore => Ok(MergeStrategy::Ignore),
            Self::ChooseByName { default, choices } => {
                let mut choose = merge::ChooseByName::new(default.resolve(base)?);
                for choice in choices {
                    choose = choose.with_choice(choice.name.clone(), choice.strategy.resolve(base)?);
                }

                Ok(MergeStrategy::ChooseByName(choose))
            }
            Self::NodeMerge { template, file } => {
                let text = match (template, file) {
                    (Some(template), _) => template.clone(),
                    (None, Some(file)) => {
                        let path = base.join(file);
                        read_to_string(&path)
                            .map_err(|source| ConfigError::TemplateFile { path, source })?
                    }
                    (None, None) => return Err(ConfigError::MissingTemplate),
                };

                merge::NodeMerge::parse(&text)
                    .map(MergeStrategy::NodeMerge)
                    .map_err(ConfigError::Template)
            }
        }
    }

    fn expand_paths(&mut self) -> Result<()> {
        match self {
            Self::ChooseByName { default, choices } => {
                default.expand_paths()?;
                for choice in choices {
                    choice.strategy.expand_paths()?;
                }
            }
            Self::NodeMerge { file: Some(file), .. } => *file = expand(file)?,
            _ => {}
        }

        Ok(())
    }
}

/// Strategy chosen for one identifier.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct StrategyChoice {
    /// Identifier of colliding elements, e.g. a listener class.
    pub name: String,

    pub strategy: StrategyConfig,
}

/// File-level merge rule.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ResourceRule {
    /// Resource path inside the WARs, e.g. `WEB-INF/classes/app.properties`.
    pub path: String,

    #[serde(default)]
    pub strategy: ResourceMerge,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Node merge strategy without template.
    #[error("node merge strategy needs either template or file")]
    MissingTemplate,

    /// Node merge template file could not be read.
    #[error("failed to read node merge template {:?}", path.display())]
    TemplateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Node merge template is not well formed.
    #[error("malformed node merge template")]
    Template(#[source] XmlError),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
