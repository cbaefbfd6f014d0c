// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Descriptor merge engine.
//!
//! Merging always mutates an authoritative "left" descriptor in place with
//! the elements of a donor "right" descriptor. Elements are matched through
//! the identifier expressions of their tags, and collisions are resolved by
//! a [`MergeStrategy`].
//!
//! # Strategies
//!
//! - [`MergeStrategy::Preserve`]: left wins, right is dropped.
//! - [`MergeStrategy::Overwrite`]: right replaces left.
//! - [`MergeStrategy::Ignore`]: both are dropped.
//! - [`MergeStrategy::ChooseByName`]: pick one of the above per identifier.
//! - [`MergeStrategy::NodeMerge`]: build a new element from a template
//!   that pulls text out of both sides.

pub mod webxml;

pub use webxml::WebXmlMerger;

use crate::{
    descriptor::{Descriptor, DescriptorError},
    xml::{self, Element, Node, XmlError},
};

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// Policy for resolving a collision between two elements of the same
/// identity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum MergeStrategy {
    #[default]
    Preserve,
    Overwrite,
    Ignore,
    ChooseByName(ChooseByName),
    NodeMerge(NodeMerge),
}

impl MergeStrategy {
    /// Concrete strategy that applies to the element identified by `name`.
    pub fn resolve(&self, name: &str) -> &MergeStrategy {
        match self {
            Self::ChooseByName(choose) => choose.strategy_for(name).resolve(name),
            strategy => strategy,
        }
    }
}

/// Strategy dispatch on the identifier of colliding elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChooseByName {
    default: Box<MergeStrategy>,
    choices: BTreeMap<String, MergeStrategy>,
}

impl ChooseByName {
    /// Construct dispatcher falling back to `default`.
    pub fn new(default: MergeStrategy) -> Self {
        Self {
            default: Box::new(default),
            choices: BTreeMap::new(),
        }
    }

    /// Use `strategy` for elements identified by `name`.
    pub fn with_choice(mut self, name: impl Into<String>, strategy: MergeStrategy) -> Self {
        self.choices.insert(name.into(), strategy);
        self
    }

    pub fn strategy_for(&self, name: &str) -> &MergeStrategy {
        self.choices.get(name).unwrap_or(&self.default)
    }
}

/// Template driven structural merge.
///
/// Text and attribute values of the template may hold `$left:path` and
/// `$right:path` tokens. A token ends at a space, comma, or tab, and is
/// replaced by the text of the `/` separated child path below the left or
/// right element. Missing paths become empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMerge {
    template: Element,
}

impl NodeMerge {
    pub fn new(template: Element) -> Self {
        Self { template }
    }

    /// Construct from the XML text of a template document.
    ///
    /// # Errors
    ///
    /// - Return [`XmlError`] if `template` is not well formed.
    pub fn parse(template: &str) -> Result<Self, XmlError> {
        let document = xml::reader::parse_str(template)?;
        Ok(Self::new(document.root().clone()))
    }

    pub fn template(&self) -> &Element {
        &self.template
    }

    /// Build merged element out of `left` and `right`.
    ///
    /// # Errors
    ///
    /// - Return [`MergeError::TemplateToken`] if a token names no path.
    pub fn apply(&self, left: &Element, right: &Element) -> Result<Element> {
        let mut merged = self.template.clone();
        fill_template(&mut merged, left, right)?;
        Ok(merged)
    }
}

fn fill_template(element: &mut Element, left: &Element, right: &Element) -> Result<()> {
    let attributes = element.attributes().to_vec();
    for attr in attributes {
        element.set_attribute(attr.name, substitute(&attr.value, left, right)?);
    }

    for node in element.children_mut() {
        match node {
            Node::Text(text) | Node::CData(text) => *text = substitute(text, left, right)?,
            Node::Element(child) => fill_template(child, left, right)?,
            _ => {}
        }
    }

    Ok(())
}

fn substitute(text: &str, left: &Element, right: &Element) -> Result<String> {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('$') {
        output.push_str(&rest[..start]);
        let token = &rest[start..];
        let (side, after) = if let Some(after) = token.strip_prefix("$left:") {
            (left, after)
        } else if let Some(after) = token.strip_prefix("$right:") {
            (right, after)
        } else {
            output.push('$');
            rest = &token[1..];
            continue;
        };

        let end = after.find([' ', ',', '\t']).unwrap_or(after.len());
        let path = &after[..end];
        if path.is_empty() {
            return Err(MergeError::TemplateToken(token[..token.len() - after.len()].into()));
        }
        if let Some(found) = side.find_path(path) {
            output.push_str(found.text().trim());
        }
        rest = &after[end..];
    }
    output.push_str(rest);

    Ok(output)
}

/// Merge every instance of identified tag `name` from `right` into `left`.
///
/// Right elements without a counterpart are inserted. Collisions are
/// resolved by `strategy`, resolved per identifier value. Tags unknown to
/// either side are skipped. Returns how many elements were added or
/// reconciled.
///
/// # Errors
///
/// - Return [`MergeError::TemplateToken`] if a node merge template is bad.
#[instrument(skip(left, right, strategy), level = "debug")]
pub fn merge_identified<L, R>(left: &mut L, right: &R, name: &str, strategy: &MergeStrategy) -> Result<usize>
where
    L: Descriptor + ?Sized,
    R: Descriptor + ?Sized,
{
    let Some(right_tag) = right.schema().tag(name).cloned() else {
        return Ok(0);
    };
    if left.schema().tag(name).is_none() {
        debug!("skip {name}, not supported by {}", left.schema());
        return Ok(0);
    }

    let mut count = 0;
    for element in right.tags(name) {
        let Some(identifier) = right_tag.identifier_of(element) else {
            left.insert_element(element.clone())?;
            count += 1;
            continue;
        };

        let Some(index) = left.position_by_identifier(name, &identifier)? else {
            left.insert_element(element.clone())?;
            count += 1;
            continue;
        };

        if resolve_collision(left, index, element, strategy.resolve(&identifier))? {
            count += 1;
        }
    }

    debug!("merged {count} {name} elements");
    Ok(count)
}

/// Copy every instance of tag `name` from `right` into `left` verbatim.
///
/// # Errors
///
/// - Return [`MergeError::Descriptor`] if an element cannot be inserted.
pub fn merge_additive<L, R>(left: &mut L, right: &R, name: &str) -> Result<usize>
where
    L: Descriptor + ?Sized,
    R: Descriptor + ?Sized,
{
    if left.schema().tag(name).is_none() {
        return Ok(0);
    }

    let mut count = 0;
    for element in right.tags(name) {
        left.insert_element(element.clone())?;
        count += 1;
    }

    Ok(count)
}

// INVARIANT: Strategy must already be resolved past ChooseByName.
fn resolve_collision<L>(left: &mut L, index: usize, right: &Element, strategy: &MergeStrategy) -> Result<bool>
where
    L: Descriptor + ?Sized,
{
    match strategy {
        MergeStrategy::Preserve | MergeStrategy::ChooseByName(_) => Ok(false),
        MergeStrategy::Overwrite => {
            left.replace_at(index, right.clone());
            Ok(true)
        }
        MergeStrategy::Ignore => {
            left.document_mut().root_mut().remove(index);
            Ok(true)
        }
        MergeStrategy::NodeMerge(node_merge) => {
            let merged = match left.root().children().get(index).and_then(Node::as_element) {
                Some(current) => node_merge.apply(current, right)?,
                None => return Ok(false),
            };
            left.replace_at(index, merged);
            Ok(true)
        }
    }
}

/// Merge driven by the tag table of a descriptor type.
///
/// Every tag of the right descriptor is merged into the left one:
///
/// - Identified tags allowing multiple instances go through
///   [`merge_identified`] with the strategy set for the tag.
/// - Other tags allowing multiple instances are copied additively.
/// - Single instance tags apply the tag's strategy to the first element.
///
/// Tags without an explicit strategy use the default, which starts out as
/// [`MergeStrategy::Overwrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMerger {
    default: MergeStrategy,
    strategies: HashMap<String, MergeStrategy>,
}

impl Default for TagMerger {
    fn default() -> Self {
        Self {
            default: MergeStrategy::Overwrite,
            strategies: HashMap::new(),
        }
    }
}

impl TagMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, strategy: MergeStrategy) -> Self {
        self.default = strategy;
        self
    }

    /// Use `strategy` for tag `name`.
    pub fn with_strategy(mut self, name: impl Into<String>, strategy: MergeStrategy) -> Self {
        self.strategies.insert(name.into(), strategy);
        self
    }

    pub fn strategy_for(&self, name: &str) -> &MergeStrategy {
        self.strategies.get(name).unwrap_or(&self.default)
    }

    /// Merge `right` into `left`.
    ///
    /// # Errors
    ///
    /// - Return [`MergeError`] if any tag fails to merge.
    #[instrument(skip(self, left, right), level = "debug")]
    pub fn merge<L, R>(&self, left: &mut L, right: &R) -> Result<usize>
    where
        L: Descriptor + ?Sized,
        R: Descriptor + ?Sized,
    {
        let tags = right
            .schema()
            .tags()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        let mut count = 0;
        for tag in tags {
            let name = tag.name();
            if left.schema().tag(name).is_none() || right.tags(name).is_empty() {
                continue;
            }

            count += match (tag.is_multiple_allowed(), tag.identifier()) {
                (true, Some(_)) => merge_identified(left, right, name, self.strategy_for(name))?,
                (true, None) => merge_additive(left, right, name)?,
                (false, _) => self.merge_single(left, right, name)?,
            };
        }

        debug!("merged {count} elements of {}", right.file_name());
        Ok(count)
    }

    fn merge_single<L, R>(&self, left: &mut L, right: &R, name: &str) -> Result<usize>
    where
        L: Descriptor + ?Sized,
        R: Descriptor + ?Sized,
    {
        let Some(element) = right.tags(name).first().map(|element| (*element).clone()) else {
            return Ok(0);
        };

        match left.root().position(name) {
            Some(index) => {
                let strategy = self.strategy_for(name).resolve(name);
                resolve_collision(left, index, &element, strategy).map(usize::from)
            }
            None => {
                left.insert_element(element)?;
                Ok(1)
            }
        }
    }
}

/// Merge error types.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Node merge template token names no child path.
    #[error("node merge token {0:?} names no path")]
    TemplateToken(String),

    /// Merge step failed, leaving earlier steps applied.
    #[error("merge failed while merging {step}")]
    Failure {
        step: &'static str,
        #[source]
        source: Box<MergeError>,
    },
}

/// Friendly result alias :3
pub type Result<T, E = MergeError> = std::result::Result<T, E>;
