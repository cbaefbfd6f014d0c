// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use uberwar::{
    archive::MergedWarArchive,
    config::MergeDefinition,
    merge::{MergeStrategy, WebXmlMerger},
    webapp::{
        io::{descriptor_to_string, parse_web_xml, write_descriptor},
        Schemas, WebXml,
    },
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::{
    fs::{read_to_string, File},
    io::BufReader,
    path::{Path, PathBuf},
    process::exit,
    sync::Arc,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  uberwar [options] <uberwar-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Assemble(opts) => run_assemble(opts),
            Command::Merge(opts) => run_merge(opts),
            Command::Inspect(opts) => run_inspect(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Assemble uberwar laid out by merge definition file.
    #[command(override_usage = "uberwar assemble [options] <definition>")]
    Assemble(AssembleOptions),

    /// Merge donor web.xml files into authoritative web.xml.
    #[command(override_usage = "uberwar merge [options] <authoritative> <donor>...")]
    Merge(MergeOptions),

    /// Show summary of web.xml file.
    #[command(override_usage = "uberwar inspect [options] <web_xml>")]
    Inspect(InspectOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AssembleOptions {
    /// Path to merge definition file.
    #[arg(required = true, value_name = "definition")]
    pub definition: PathBuf,

    /// Directory to assemble into instead of the one in the definition.
    #[arg(short, long, value_name = "path")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct MergeOptions {
    /// Authoritative web.xml that wins collisions by default.
    #[arg(required = true, value_name = "authoritative")]
    pub authoritative: PathBuf,

    /// Donor web.xml files, merged in order.
    #[arg(required = true, value_name = "donor")]
    pub donors: Vec<PathBuf>,

    /// Write merged web.xml to file instead of standard output.
    #[arg(short, long, value_name = "path")]
    pub output: Option<PathBuf>,

    /// Collision strategy for context params.
    #[arg(long, value_enum, default_value_t = StrategyArg::Preserve)]
    pub context_params: StrategyArg,

    /// Collision strategy for listeners.
    #[arg(long, value_enum, default_value_t = StrategyArg::Preserve)]
    pub listeners: StrategyArg,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InspectOptions {
    /// Path to web.xml file.
    #[arg(required = true, value_name = "web_xml")]
    pub web_xml: PathBuf,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum StrategyArg {
    Preserve,
    Overwrite,
    Ignore,
}

impl From<StrategyArg> for MergeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Preserve => MergeStrategy::Preserve,
            StrategyArg::Overwrite => MergeStrategy::Overwrite,
            StrategyArg::Ignore => MergeStrategy::Ignore,
        }
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_assemble(opts: AssembleOptions) -> Result<()> {
    let definition: MergeDefinition = read_to_string(&opts.definition)
        .with_context(|| format!("failed to read {:?}", opts.definition.display()))?
        .parse()?;
    let base = opts.definition.parent().unwrap_or(Path::new("."));

    let output = opts
        .output
        .or_else(|| definition.settings.output.clone().map(|path| base.join(path)))
        .ok_or_else(|| anyhow!("no output directory given by definition or --output"))?;

    let schemas = Arc::new(Schemas::new()?);
    let mut archive = MergedWarArchive::from_definition(&definition, base, schemas)?;
    archive.assemble(&output)?;
    info!("uberwar assembled at {:?}", output.display());

    Ok(())
}

fn run_merge(opts: MergeOptions) -> Result<()> {
    let schemas = Arc::new(Schemas::new()?);
    let merger = WebXmlMerger::new()
        .with_context_param_strategy(opts.context_params.into())
        .with_listener_strategy(opts.listeners.into());

    let mut merged = load_web_xml(&opts.authoritative, &schemas)?;
    for donor in &opts.donors {
        info!("merging {:?}", donor.display());
        let donor = load_web_xml(donor, &schemas)?;
        merger.merge(&mut merged, &donor)?;
    }

    match opts.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {:?}", path.display()))?;
            write_descriptor(&merged, file)?;
        }
        None => print!("{}", descriptor_to_string(&merged)?),
    }

    Ok(())
}

fn run_inspect(opts: InspectOptions) -> Result<()> {
    let schemas = Arc::new(Schemas::new()?);
    let web_xml = load_web_xml(&opts.web_xml, &schemas)?;

    println!("version: {}", web_xml.version());
    for name in web_xml.context_param_names() {
        println!("context-param: {name}");
    }
    for name in web_xml.filter_names() {
        println!("filter: {name} {:?}", web_xml.filter_mapping_patterns(&name));
    }
    for name in web_xml.servlet_names() {
        println!("servlet: {name} {:?}", web_xml.servlet_mapping_patterns(&name));
    }
    for class in web_xml.listener_classes() {
        println!("listener: {class}");
    }
    for role in web_xml.security_role_names() {
        println!("security-role: {role}");
    }
    if let Some(auth_method) = web_xml.login_config_auth_method() {
        println!("login-config: {auth_method}");
    }

    Ok(())
}

fn load_web_xml(path: &Path, schemas: &Arc<Schemas>) -> Result<WebXml> {
    let file = File::open(path).with_context(|| format!("failed to open {:?}", path.display()))?;
    parse_web_xml(BufReader::new(file), schemas)
        .with_context(|| format!("failed to parse {:?}", path.display()))
}
