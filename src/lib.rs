// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deployment descriptor model and uberwar assembly.
//!
//! Uberwar reads the `web.xml` deployment descriptors of Java web
//! applications, along with the vendor descriptors that ride next to them,
//! into typed documents that can be queried, mutated, and merged. Several
//! WARs can be merged into a single __uberwar__, the first WAR acting as the
//! authoritative side of every merge.
//!
//! # Layout
//!
//! - [`xml`]: owned XML tree with a round-tripping reader and writer.
//! - [`descriptor`]: tag registry and grammar shared by every dialect.
//! - [`webapp`]: `web.xml` model, versions, and vendor descriptors.
//! - [`merge`]: merge strategies and the `web.xml` merge pipeline.
//! - [`archive`]: WAR containers and uberwar assembly.
//! - [`config`]: TOML merge definition.

pub mod archive;
pub mod config;
pub mod descriptor;
pub mod merge;
pub mod webapp;
pub mod xml;
