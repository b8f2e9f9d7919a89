// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use convention_resolver::{
    apply_resolution,
    path::{find_policy_file, read_policy_file},
    CatalogApplier, PolicyDefinition,
};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::{env::current_dir, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  convres [options] <command> [unit]...",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to policy file instead of searching for conventions.toml.
    #[arg(short, long, global = true, value_name = "path")]
    pub policy: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let policy_path = match self.policy {
            Some(path) => path,
            None => find_policy_file(current_dir()?)?,
        };
        info!("using policy file {:?}", policy_path.display());
        let definition = read_policy_file(&policy_path)?;

        match self.command {
            Command::Resolve(opts) => run_resolve(&definition, opts),
            Command::Summary => run_summary(&definition),
            Command::Apply(opts) => run_apply(&definition, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Show which conventions each unit gets.
    #[command(override_usage = "convres resolve [options] [unit]...")]
    Resolve(UnitOptions),

    /// Show overview of policy.
    #[command(override_usage = "convres summary [options]")]
    Summary,

    /// Apply conventions to each unit using the catalog of the policy file.
    #[command(override_usage = "convres apply [options] [unit]...")]
    Apply(UnitOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct UnitOptions {
    /// Units to resolve, defaults to the units of the workspace table.
    #[arg(value_name = "unit")]
    pub units: Vec<String>,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
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

fn run_resolve(definition: &PolicyDefinition, opts: UnitOptions) -> Result<()> {
    let policy = definition.to_policy()?;
    let units = definition.select_units(opts.units)?;
    for (unit, decision) in policy.resolve(units) {
        println!("{unit}: {decision}");
    }

    Ok(())
}

fn run_summary(definition: &PolicyDefinition) -> Result<()> {
    let policy = definition.to_policy()?;
    print!("{}", policy.summarize());

    Ok(())
}

fn run_apply(definition: &PolicyDefinition, opts: UnitOptions) -> Result<()> {
    let policy = definition.to_policy()?;
    let catalog = definition.applicable_catalog()?;

    let units = definition.select_units(opts.units)?;
    let resolution = policy.resolve(units);
    let mut applier = CatalogApplier::new(&catalog);
    let report = apply_resolution(&resolution, &mut applier);

    for (unit, conventions) in applier.plan() {
        let names = conventions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("{unit}: {names}");
    }
    print!("{}", policy.summarize());

    if !report.is_success() {
        bail!("failed to apply conventions to {} unit(s)", report.failures.len());
    }

    Ok(())
}
